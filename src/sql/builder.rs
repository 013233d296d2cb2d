//! Builds parameterized SELECT, INSERT, UPDATE, DELETE from entity metadata.

use crate::error::AppError;
use crate::model::EntityDef;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Quote identifier for PostgreSQL (safe: only from entity metadata).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }

    /// Push a value and return its placeholder cast to the column type.
    fn placeholder(&mut self, v: Value, pg_type: &str) -> String {
        let n = self.push_param(v);
        format!("${}::{}", n, pg_type)
    }
}

/// Equality predicates identifying the rows an update touches.
///
/// Keys iterate in sorted order so the same request always produces the same
/// statement. Empty strings and nulls mean "not a predicate" and are dropped
/// on insertion.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Predicates(BTreeMap<String, Value>);

impl Predicates {
    pub fn new() -> Self {
        Predicates(BTreeMap::new())
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        let unset = match &value {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        };
        if !unset {
            self.0.insert(field.into(), value);
        }
    }

    /// Builder form of [`Predicates::insert`] for optional key fields.
    pub fn with<V: Into<Value>>(mut self, field: &str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.insert(field, v.into());
        }
        self
    }

    #[cfg(test)]
    fn from_snapshot(snapshot: &Map<String, Value>) -> Self {
        let mut p = Predicates::new();
        for (k, v) in snapshot {
            p.insert(k.clone(), v.clone());
        }
        p
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

/// SELECT list: numeric as col::text so prices keep their exact decimal form.
fn select_column_list(entity: &EntityDef) -> String {
    entity
        .columns
        .iter()
        .map(|c| {
            let q = quoted(c.name);
            if c.pg_type == "numeric" {
                format!("{}::text AS {}", q, q)
            } else {
                q
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// SELECT every row, ordered by primary key.
pub fn select_all(entity: &EntityDef) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {} ORDER BY {}",
        select_column_list(entity),
        quoted(entity.table_name),
        quoted(entity.pk)
    );
    q
}

/// SELECT rows where one known column equals a value.
pub fn select_where(entity: &EntityDef, field: &str, value: Value) -> Result<QueryBuf, AppError> {
    let column = entity.require_column(field)?;
    let mut q = QueryBuf::new();
    let ph = q.placeholder(value, column.pg_type);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {} ORDER BY {}",
        select_column_list(entity),
        quoted(entity.table_name),
        quoted(column.name),
        ph,
        quoted(entity.pk)
    );
    Ok(q)
}

/// INSERT the supplied fields. Columns with a DB default that the body omits
/// are left to the default; other omitted columns are inserted as NULL.
/// Keys that are not columns of the entity are rejected.
pub fn insert(entity: &EntityDef, body: &Map<String, Value>) -> Result<QueryBuf, AppError> {
    for key in body.keys() {
        entity.require_column(key)?;
    }
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in entity.columns {
        let val = body.get(c.name).cloned();
        if val.is_none() && c.has_default {
            continue;
        }
        placeholders.push(q.placeholder(val.unwrap_or(Value::Null), c.pg_type));
        cols.push(quoted(c.name));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        quoted(entity.table_name),
        cols.join(", "),
        placeholders.join(", "),
        select_column_list(entity)
    );
    Ok(q)
}

/// UPDATE from parallel field/value lists, restricted by equality predicates.
///
/// Assignments bind first ($1..$n, in list order), predicates after them in
/// key order. Both lists and predicate keys must name columns of the entity.
pub fn update(
    entity: &EntityDef,
    set_fields: &[String],
    set_values: &[Value],
    predicates: &Predicates,
) -> Result<QueryBuf, AppError> {
    if set_fields.len() != set_values.len() {
        return Err(AppError::ShapeMismatch {
            fields: set_fields.len(),
            values: set_values.len(),
        });
    }
    if set_fields.is_empty() {
        return Err(AppError::Validation("update needs at least one field to set".into()));
    }
    if predicates.is_empty() {
        return Err(AppError::Validation(
            "update needs at least one non-empty identifier".into(),
        ));
    }
    let mut q = QueryBuf::new();
    let mut sets = Vec::with_capacity(set_fields.len());
    for (field, value) in set_fields.iter().zip(set_values) {
        let c = entity.require_column(field)?;
        let rhs = q.placeholder(value.clone(), c.pg_type);
        sets.push(format!("{} = {}", quoted(c.name), rhs));
    }
    let mut wheres = Vec::with_capacity(predicates.len());
    for (field, value) in predicates.iter() {
        let c = entity.require_column(field)?;
        let rhs = q.placeholder(value.clone(), c.pg_type);
        wheres.push(format!("{} = {}", quoted(c.name), rhs));
    }
    q.sql = format!(
        "UPDATE {} SET {} WHERE {}",
        quoted(entity.table_name),
        sets.join(", "),
        wheres.join(" AND ")
    );
    Ok(q)
}

/// DELETE rows where one known column equals a value.
pub fn delete_where(entity: &EntityDef, field: &str, value: Value) -> Result<QueryBuf, AppError> {
    let column = entity.require_column(field)?;
    let mut q = QueryBuf::new();
    let ph = q.placeholder(value, column.pg_type);
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {}",
        quoted(entity.table_name),
        quoted(column.name),
        ph
    );
    Ok(q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnDef, EntityKind, Operation, PkType};
    use serde_json::json;

    static SCRATCH: EntityDef = EntityDef {
        table_name: "scratch",
        pk: "id",
        pk_type: PkType::Int,
        columns: &[
            ColumnDef { name: "id", pg_type: "int4", has_default: true },
            ColumnDef { name: "a", pg_type: "text", has_default: false },
            ColumnDef { name: "b", pg_type: "text", has_default: false },
            ColumnDef { name: "x", pg_type: "text", has_default: false },
        ],
        operations: &[Operation::Update],
    };

    fn fields(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_predicates_are_omitted() {
        let snapshot = json!({"id": "7", "x": ""});
        let preds = Predicates::from_snapshot(snapshot.as_object().unwrap());
        let q = update(&SCRATCH, &fields(&["a", "b"]), &[json!("1"), json!("2")], &preds).unwrap();
        assert_eq!(
            q.sql,
            r#"UPDATE "scratch" SET "a" = $1::text, "b" = $2::text WHERE "id" = $3::int4"#
        );
        assert_eq!(q.params, vec![json!("1"), json!("2"), json!("7")]);
    }

    #[test]
    fn length_mismatch_is_shape_mismatch() {
        let preds = Predicates::new().with("id", Some(7));
        let err = update(&SCRATCH, &fields(&["a", "b"]), &[json!("1")], &preds).unwrap_err();
        assert!(matches!(err, AppError::ShapeMismatch { fields: 2, values: 1 }));
    }

    #[test]
    fn predicates_emit_in_sorted_order() {
        let preds = Predicates::new()
            .with("x", Some("q"))
            .with("b", Some("p"))
            .with("id", Some(3));
        let q = update(&SCRATCH, &fields(&["a"]), &[json!("v")], &preds).unwrap();
        assert!(q.sql.ends_with(r#"WHERE "b" = $2::text AND "id" = $3::int4 AND "x" = $4::text"#));
        assert_eq!(q.params, vec![json!("v"), json!("p"), json!(3), json!("q")]);
    }

    #[test]
    fn values_never_reach_the_statement_text() {
        let preds = Predicates::new().with("id", Some("1' OR '1'='1"));
        let q = update(&SCRATCH, &fields(&["a"]), &[json!("'; drop table scratch; --")], &preds).unwrap();
        assert!(!q.sql.contains("drop table"));
        assert!(!q.sql.contains("OR '1'"));
    }

    #[test]
    fn update_without_identifiers_is_refused() {
        let preds = Predicates::new().with::<&str>("id", None).with("x", Some(""));
        let err = update(&SCRATCH, &fields(&["a"]), &[json!("1")], &preds).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn unknown_set_field_is_rejected() {
        let preds = Predicates::new().with("id", Some(1));
        let err = update(&SCRATCH, &fields(&["nope"]), &[json!("1")], &preds).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn insert_skips_defaulted_pk_and_casts_columns() {
        let body = json!({"shoppingorderid": "4", "pricingid": "price_solo", "qty": 1});
        let q = insert(EntityKind::ShoppingCart.def(), body.as_object().unwrap()).unwrap();
        assert!(q.sql.starts_with(
            r#"INSERT INTO "shopping_cart" ("shoppingorderid", "pricingid", "qty") VALUES ($1::int4, $2::text, $3::int4)"#
        ));
        assert_eq!(q.params, vec![json!("4"), json!("price_solo"), json!(1)]);
    }

    #[test]
    fn insert_rejects_unknown_keys() {
        let body = json!({"shoppingcartid": "1", "colour": "red"});
        assert!(insert(EntityKind::ShoppingCart.def(), body.as_object().unwrap()).is_err());
    }

    #[test]
    fn select_where_casts_and_orders_by_pk() {
        let q = select_where(EntityKind::Purchase.def(), "salesorderid", json!("12")).unwrap();
        assert_eq!(
            q.sql,
            r#"SELECT "purchaseid", "salesorderid", "qty", "productname", "description", "price"::text AS "price" FROM "purchase" WHERE "salesorderid" = $1::int4 ORDER BY "purchaseid""#
        );
    }

    #[test]
    fn delete_where_rejects_unknown_field() {
        assert!(delete_where(EntityKind::CartParticipant.def(), "1=1 --", json!("1")).is_err());
        let q = delete_where(EntityKind::CartParticipant.def(), "shoppingcartid", json!(9)).unwrap();
        assert_eq!(q.sql, r#"DELETE FROM "cart_participant" WHERE "shoppingcartid" = $1::int4"#);
    }
}
