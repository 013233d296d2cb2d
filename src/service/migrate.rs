//! Order migration: copies one ephemeral shopping order into the permanent
//! sales records and removes the ephemeral rows, in one transaction.

use crate::error::{AppError, StageExt};
use crate::model::command::scalar_id;
use crate::service::validation::{FieldRule, Format, RequestValidator};
use serde::Deserialize;
use serde_json::{Map, Value};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Invoice number recorded until invoicing assigns a real one.
pub const INVOICE_PLACEHOLDER: &str = "none";

const RULES: &[FieldRule] = &[
    FieldRule::required("shoppingorderid"),
    FieldRule::required("name").max_length(200),
    FieldRule::optional("email").format(Format::Email).max_length(254).advisory(),
    FieldRule::optional("phone").format(Format::Phone).max_length(40).advisory(),
    FieldRule::optional("paymentid").max_length(200),
];

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CustomerProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

/// The `migrate_data` create body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MigrateRequest {
    pub shopping_order_id: i32,
    pub payment_id: Option<String>,
    pub profile: CustomerProfile,
}

impl MigrateRequest {
    pub fn from_body(body: &Map<String, Value>) -> Result<Self, AppError> {
        RequestValidator::validate(body, RULES)?;
        let shopping_order_id = scalar_id(
            body.get("shoppingorderid").unwrap_or(&Value::Null),
            "shoppingorderid",
        )?;
        let profile: CustomerProfile = serde_json::from_value(Value::Object(body.clone()))
            .map_err(|e| AppError::BadRequest(format!("migrate_data: {}", e)))?;
        let payment_id = body
            .get("paymentid")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);
        Ok(MigrateRequest {
            shopping_order_id,
            payment_id,
            profile: CustomerProfile {
                name: profile.name.trim().to_string(),
                email: profile.email.trim().to_string(),
                phone: profile.phone.trim().to_string(),
            },
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MigrationReceipt {
    pub customer_id: i32,
    pub sales_order_id: i32,
    pub purchases: u64,
    pub participants: u64,
    pub participant_options: u64,
}

pub struct MigrationPipeline;

impl MigrationPipeline {
    /// Move the order into customer, salesorder, purchase, participant and
    /// participant_option, then delete its ephemeral rows. Any failing stage
    /// rolls the whole migration back.
    pub async fn migrate(
        pool: &PgPool,
        organization_id: Uuid,
        shopping_order_id: i32,
        profile: &CustomerProfile,
        payment_id: Option<&str>,
    ) -> Result<MigrationReceipt, AppError> {
        let mut tx = pool.begin().await?;
        let receipt = run(&mut *tx, organization_id, shopping_order_id, profile, payment_id).await?;
        tx.commit().await?;
        tracing::info!(
            shopping_order_id,
            customer_id = receipt.customer_id,
            purchases = receipt.purchases,
            participants = receipt.participants,
            participant_options = receipt.participant_options,
            "order migrated"
        );
        Ok(receipt)
    }
}

async fn run(
    conn: &mut PgConnection,
    organization_id: Uuid,
    order_id: i32,
    profile: &CustomerProfile,
    payment_id: Option<&str>,
) -> Result<MigrationReceipt, AppError> {
    // Concurrent migrations of the same order queue here; the loser then
    // finds no row.
    tracing::debug!(order_id, "lock shopping_order");
    let locked: Option<i32> = sqlx::query_scalar(
        "SELECT shoppingorderid FROM shopping_order WHERE shoppingorderid = $1 FOR UPDATE",
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await
    .stage("select shopping_order")?;
    if locked.is_none() {
        return Err(AppError::NotFound(format!("shopping_order {}", order_id)));
    }

    tracing::debug!(order_id, %organization_id, "insert customer");
    let customer_id: i32 = sqlx::query_scalar(
        "INSERT INTO customer (organizationid, name, email, phone) VALUES ($1, $2, $3, $4) \
         RETURNING customerid",
    )
    .bind(organization_id)
    .bind(&profile.name)
    .bind(&profile.email)
    .bind(&profile.phone)
    .fetch_one(&mut *conn)
    .await
    .stage("customer")?;

    tracing::debug!(order_id, customer_id, "insert salesorder");
    sqlx::query(
        "INSERT INTO salesorder (salesorderid, customerid, orderdate, paymentid, invoiceno) \
         SELECT so.shoppingorderid, $1, so.orderdate, $2, $3 \
         FROM shopping_order so WHERE so.shoppingorderid = $4",
    )
    .bind(customer_id)
    .bind(payment_id)
    .bind(INVOICE_PLACEHOLDER)
    .bind(order_id)
    .execute(&mut *conn)
    .await
    .stage("salesorder")?;

    tracing::debug!(order_id, "insert purchase");
    let purchases = sqlx::query(
        "INSERT INTO purchase (purchaseid, salesorderid, qty, productname, description, price) \
         SELECT sc.shoppingcartid, sc.shoppingorderid, sc.qty, pr.description, pr.description, p.price \
         FROM shopping_cart sc \
         JOIN pricing p ON p.pricingid = sc.pricingid \
         JOIN product pr ON pr.productid = p.productid \
         WHERE sc.shoppingorderid = $1",
    )
    .bind(order_id)
    .execute(&mut *conn)
    .await
    .stage("purchase")?
    .rows_affected();

    let carts: i64 = sqlx::query_scalar("SELECT count(*) FROM shopping_cart WHERE shoppingorderid = $1")
        .bind(order_id)
        .fetch_one(&mut *conn)
        .await
        .stage("purchase")?;
    if purchases != carts as u64 {
        return Err(AppError::Validation(format!(
            "shopping_order {}: {} of {} carts have a priced product",
            order_id, purchases, carts
        )));
    }

    tracing::debug!(order_id, "insert participant");
    let participants = sqlx::query(
        "INSERT INTO participant (participantid, purchaseid, name) \
         SELECT cp.cartparticipantid, sc.shoppingcartid, cp.name \
         FROM cart_participant cp \
         JOIN shopping_cart sc ON sc.shoppingcartid = cp.shoppingcartid \
         WHERE sc.shoppingorderid = $1",
    )
    .bind(order_id)
    .execute(&mut *conn)
    .await
    .stage("participant")?
    .rows_affected();

    tracing::debug!(order_id, "insert participant_option");
    let participant_options = sqlx::query(
        "INSERT INTO participant_option (participantoptionsid, participantid, optionitemsid) \
         SELECT cpo.cartparticipantoptionsid, cpo.cartparticipantid, cpo.optionitemsid \
         FROM cart_participant_option cpo \
         JOIN cart_participant cp ON cp.cartparticipantid = cpo.cartparticipantid \
         JOIN shopping_cart sc ON sc.shoppingcartid = cp.shoppingcartid \
         WHERE sc.shoppingorderid = $1",
    )
    .bind(order_id)
    .execute(&mut *conn)
    .await
    .stage("participant_option")?
    .rows_affected();

    delete_ephemeral(conn, order_id).await?;

    Ok(MigrationReceipt {
        customer_id,
        sales_order_id: order_id,
        purchases,
        participants,
        participant_options,
    })
}

/// Remove the order's options, participants, carts and the order itself.
async fn delete_ephemeral(conn: &mut PgConnection, order_id: i32) -> Result<(), AppError> {
    const STEPS: [(&str, &str); 4] = [
        (
            "deleting cart_participant_option",
            "DELETE FROM cart_participant_option WHERE cartparticipantid IN \
             (SELECT cp.cartparticipantid FROM cart_participant cp \
              JOIN shopping_cart sc ON sc.shoppingcartid = cp.shoppingcartid \
              WHERE sc.shoppingorderid = $1)",
        ),
        (
            "deleting cart_participant",
            "DELETE FROM cart_participant WHERE shoppingcartid IN \
             (SELECT shoppingcartid FROM shopping_cart WHERE shoppingorderid = $1)",
        ),
        (
            "deleting shopping_cart",
            "DELETE FROM shopping_cart WHERE shoppingorderid = $1",
        ),
        (
            "deleting orderid",
            "DELETE FROM shopping_order WHERE shoppingorderid = $1",
        ),
    ];
    for (stage, sql) in STEPS {
        tracing::debug!(order_id, stage, "delete");
        sqlx::query(sql)
            .bind(order_id)
            .execute(&mut *conn)
            .await
            .stage(stage)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn request_accepts_text_or_numeric_order_id() {
        let req = MigrateRequest::from_body(&body(json!({
            "shoppingorderid": "17",
            "paymentid": "pay_1",
            "name": " Pat Doe ",
            "email": "pat@example.com",
            "phone": "555-010-2030"
        })))
        .unwrap();
        assert_eq!(req.shopping_order_id, 17);
        assert_eq!(req.payment_id.as_deref(), Some("pay_1"));
        assert_eq!(req.profile.name, "Pat Doe");

        let req = MigrateRequest::from_body(&body(json!({"shoppingorderid": 17, "name": "Pat"}))).unwrap();
        assert_eq!(req.shopping_order_id, 17);
        assert_eq!(req.payment_id, None);
        assert_eq!(req.profile.email, "");
    }

    #[test]
    fn request_rejects_missing_order_and_bad_id() {
        let err = MigrateRequest::from_body(&body(json!({"name": "Pat"}))).unwrap_err();
        assert_eq!(err.to_string(), "validation: shoppingorderid is required");
        let err = MigrateRequest::from_body(&body(json!({"shoppingorderid": "x1", "name": "Pat"}))).unwrap_err();
        assert_eq!(err.code(), "validation_error");
    }

    #[test]
    fn loose_contact_details_are_kept() {
        let req = MigrateRequest::from_body(&body(json!({
            "shoppingorderid": 1, "name": "Pat", "email": "pat at home", "phone": "n/a"
        })))
        .unwrap();
        assert_eq!(req.profile.email, "pat at home");
        assert_eq!(req.profile.phone, "n/a");

        let err = MigrateRequest::from_body(&body(json!({
            "shoppingorderid": 1, "name": "Pat", "phone": "9".repeat(41)
        })))
        .unwrap_err();
        assert_eq!(err.code(), "validation_error");
    }
}
