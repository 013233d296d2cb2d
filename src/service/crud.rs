//! Generic entity repository execution against PostgreSQL.

use crate::error::AppError;
use crate::model::EntityDef;
use crate::sql::{delete_where, insert, select_all, select_where, update, PgBindValue, Predicates, QueryBuf};
use serde_json::{Map, Value};
use sqlx::PgPool;

pub struct CrudService;

impl CrudService {
    /// All rows of the entity, ordered by primary key.
    pub async fn list(pool: &PgPool, entity: &EntityDef) -> Result<Vec<Value>, AppError> {
        let q = select_all(entity);
        Self::query_many(pool, &q).await
    }

    /// Rows where `field` equals `value`. The field must be a column of the entity.
    pub async fn read_where(
        pool: &PgPool,
        entity: &EntityDef,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Value>, AppError> {
        let q = select_where(entity, field, value.clone())?;
        Self::query_many(pool, &q).await
    }

    /// Insert one row; body may include or omit a generated PK. Returns created row.
    pub async fn create(
        pool: &PgPool,
        entity: &EntityDef,
        body: &Map<String, Value>,
    ) -> Result<Value, AppError> {
        let q = insert(entity, body)?;
        Self::execute_returning_one(pool, &q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    /// Update the rows matched by `predicates`. Returns the number of rows changed;
    /// matching nothing is `NotFound`.
    pub async fn update(
        pool: &PgPool,
        entity: &EntityDef,
        set_fields: &[String],
        set_values: &[Value],
        predicates: &Predicates,
    ) -> Result<u64, AppError> {
        let q = update(entity, set_fields, set_values, predicates)?;
        let affected = Self::execute(pool, &q).await?;
        if affected == 0 {
            return Err(AppError::NotFound(format!(
                "no {} row matches the identifiers",
                entity.table_name
            )));
        }
        Ok(affected)
    }

    /// Delete rows where `field` equals `value`. Returns the number of rows removed.
    pub async fn delete_where(
        pool: &PgPool,
        entity: &EntityDef,
        field: &str,
        value: &Value,
    ) -> Result<u64, AppError> {
        let q = delete_where(entity, field, value.clone())?;
        Self::execute(pool, &q).await
    }

    async fn query_many(pool: &PgPool, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let rows = query.fetch_all(pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn execute_returning_one(pool: &PgPool, q: &QueryBuf) -> Result<Option<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let row = query.fetch_optional(pool).await?;
        Ok(row.map(|r| row_to_json(&r)))
    }

    async fn execute(pool: &PgPool, q: &QueryBuf) -> Result<u64, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let done = query.execute(pool).await?;
        Ok(done.rows_affected())
    }
}

pub(crate) fn row_to_json(row: &sqlx::postgres::PgRow) -> Value {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        let v = cell_to_value(row, name);
        map.insert(name.to_string(), v);
    }
    Value::Object(map)
}

fn cell_to_value(row: &sqlx::postgres::PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<serde_json::Value>, _>(name) {
        return j;
    }
    Value::Null
}
