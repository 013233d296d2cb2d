//! Sparse row identifiers for updates. Each field is explicitly optional:
//! `None` (absent, null or empty string) is "not part of the match", anything
//! else becomes an equality predicate.

use crate::error::AppError;
use crate::model::EntityKind;
use crate::sql::Predicates;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Integer id that may arrive as a number or as numeric text.
fn opt_id<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("id out of range: {}", n))),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("id must be an integer, got '{}'", s))),
        other => Err(D::Error::custom(format!("id must be an integer, got {}", other))),
    }
}

fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.is_empty()))
}

pub trait RowKey: DeserializeOwned {
    fn predicates(&self) -> Predicates;
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShoppingOrderKey {
    #[serde(default, deserialize_with = "opt_id")]
    pub shoppingorderid: Option<i32>,
    #[serde(default, deserialize_with = "opt_text")]
    pub orderdate: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub sessionid: Option<String>,
}

impl RowKey for ShoppingOrderKey {
    fn predicates(&self) -> Predicates {
        Predicates::new()
            .with("shoppingorderid", self.shoppingorderid)
            .with("orderdate", self.orderdate.clone())
            .with("sessionid", self.sessionid.clone())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShoppingCartKey {
    #[serde(default, deserialize_with = "opt_id")]
    pub shoppingcartid: Option<i32>,
    #[serde(default, deserialize_with = "opt_id")]
    pub shoppingorderid: Option<i32>,
    #[serde(default, deserialize_with = "opt_text")]
    pub pricingid: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub qty: Option<i32>,
}

impl RowKey for ShoppingCartKey {
    fn predicates(&self) -> Predicates {
        Predicates::new()
            .with("shoppingcartid", self.shoppingcartid)
            .with("shoppingorderid", self.shoppingorderid)
            .with("pricingid", self.pricingid.clone())
            .with("qty", self.qty)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CartParticipantKey {
    #[serde(default, deserialize_with = "opt_id")]
    pub cartparticipantid: Option<i32>,
    #[serde(default, deserialize_with = "opt_id")]
    pub shoppingcartid: Option<i32>,
    #[serde(default, deserialize_with = "opt_text")]
    pub name: Option<String>,
}

impl RowKey for CartParticipantKey {
    fn predicates(&self) -> Predicates {
        Predicates::new()
            .with("cartparticipantid", self.cartparticipantid)
            .with("shoppingcartid", self.shoppingcartid)
            .with("name", self.name.clone())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CartParticipantOptionKey {
    #[serde(default, alias = "cartparticipantoptionid", deserialize_with = "opt_id")]
    pub cartparticipantoptionsid: Option<i32>,
    #[serde(default, deserialize_with = "opt_id")]
    pub cartparticipantid: Option<i32>,
    #[serde(default, deserialize_with = "opt_id")]
    pub optionitemsid: Option<i32>,
}

impl RowKey for CartParticipantOptionKey {
    fn predicates(&self) -> Predicates {
        Predicates::new()
            .with("cartparticipantoptionsid", self.cartparticipantoptionsid)
            .with("cartparticipantid", self.cartparticipantid)
            .with("optionitemsid", self.optionitemsid)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SalesOrderKey {
    #[serde(default, deserialize_with = "opt_id")]
    pub salesorderid: Option<i32>,
    #[serde(default, deserialize_with = "opt_text")]
    pub orderdate: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub customerid: Option<i32>,
    #[serde(default, deserialize_with = "opt_text")]
    pub paymentid: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub invoiceno: Option<String>,
}

impl RowKey for SalesOrderKey {
    fn predicates(&self) -> Predicates {
        Predicates::new()
            .with("salesorderid", self.salesorderid)
            .with("orderdate", self.orderdate.clone())
            .with("customerid", self.customerid)
            .with("paymentid", self.paymentid.clone())
            .with("invoiceno", self.invoiceno.clone())
    }
}

fn decode<K: RowKey>(identifiers: Value) -> Result<Predicates, AppError> {
    let key: K = serde_json::from_value(identifiers)
        .map_err(|e| AppError::BadRequest(format!("identifiers: {}", e)))?;
    Ok(key.predicates())
}

/// Decode an identifier snapshot for `kind` into update predicates.
pub fn key_predicates(kind: EntityKind, identifiers: Value) -> Result<Predicates, AppError> {
    match kind {
        EntityKind::ShoppingOrder => decode::<ShoppingOrderKey>(identifiers),
        EntityKind::ShoppingCart => decode::<ShoppingCartKey>(identifiers),
        EntityKind::CartParticipant => decode::<CartParticipantKey>(identifiers),
        EntityKind::CartParticipantOption => decode::<CartParticipantOptionKey>(identifiers),
        EntityKind::SalesOrder => decode::<SalesOrderKey>(identifiers),
        EntityKind::Organization
        | EntityKind::Event
        | EntityKind::PaymentProvider
        | EntityKind::Product
        | EntityKind::Pricing
        | EntityKind::PackageCategory
        | EntityKind::Package
        | EntityKind::CategoryOption
        | EntityKind::OptionItem
        | EntityKind::Customer
        | EntityKind::Purchase
        | EntityKind::Participant
        | EntityKind::ParticipantOption => Err(AppError::BadRequest(format!(
            "update not allowed for {}",
            kind.table_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_strings_are_unset() {
        let p = key_predicates(
            EntityKind::ShoppingCart,
            json!({"shoppingcartid": "12", "shoppingorderid": "", "pricingid": "", "qty": ""}),
        )
        .unwrap();
        assert_eq!(p.len(), 1);
        let (k, v) = p.iter().next().unwrap();
        assert_eq!(k, "shoppingcartid");
        assert_eq!(v, &json!(12));
    }

    #[test]
    fn numbers_and_numeric_text_both_decode() {
        let from_text = key_predicates(EntityKind::CartParticipant, json!({"cartparticipantid": "5"})).unwrap();
        let from_num = key_predicates(EntityKind::CartParticipant, json!({"cartparticipantid": 5})).unwrap();
        assert_eq!(from_text, from_num);
    }

    #[test]
    fn non_numeric_id_is_a_bad_request() {
        let err = key_predicates(EntityKind::ShoppingOrder, json!({"shoppingorderid": "abc"})).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn unknown_identifier_field_is_rejected() {
        let err = key_predicates(EntityKind::SalesOrder, json!({"salesorderid": 1, "total": "9"})).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn read_only_kinds_refuse_updates() {
        assert!(key_predicates(EntityKind::Purchase, json!({"purchaseid": 1})).is_err());
    }

    #[test]
    fn legacy_option_id_spelling_is_accepted() {
        let p = key_predicates(
            EntityKind::CartParticipantOption,
            json!({"cartparticipantoptionid": "3", "cartparticipantid": "", "optionitemsid": ""}),
        )
        .unwrap();
        assert_eq!(p, Predicates::new().with("cartparticipantoptionsid", Some(3)));
    }
}
