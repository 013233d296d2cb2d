//! Cart assembly: turns one registration form into an ephemeral shopping
//! order, a cart line and its participants with their selected options.

use crate::error::{AppError, StageExt};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use sqlx::{PgConnection, PgPool};

/// Every registration buys exactly one package.
const CART_QTY: i32 = 1;

/// Option item ids that name a dexterity choice.
const DEXTERITY_CODES: std::ops::RangeInclusive<i32> = 6..=7;

/// Option codes arrive as text or as bare numbers.
fn code_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Golfer {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "shirtsize", default, deserialize_with = "code_text")]
    pub shirt_size: Option<String>,
    #[serde(default, deserialize_with = "code_text")]
    pub dexterity: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Registration {
    #[serde(rename = "orderdate", default)]
    pub order_date: String,
    #[serde(rename = "sessionid", default)]
    pub session_id: String,
    #[serde(rename = "pricingid", default)]
    pub pricing_id: String,
    #[serde(rename = "golferinfo", default)]
    pub golfers: Vec<Golfer>,
}

/// One participant row to write, with its option item ids already parsed.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedParticipant {
    pub name: String,
    pub shirt_size: i32,
    pub dexterity: Option<i32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssemblyReceipt {
    pub shopping_order_id: i32,
    pub shopping_cart_id: i32,
    pub participant_ids: Vec<i32>,
    /// The session already had an order and the cart was added to it.
    pub reused_order: bool,
}

/// Parse an order date: RFC 3339, a naive date-time (taken as UTC) or a bare date.
pub fn parse_order_date(raw: &str) -> Result<DateTime<Utc>, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::Validation("orderdate is required".into()));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(dt.and_utc());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(dt) = d.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }
    Err(AppError::Validation(format!("orderdate is not a date: '{}'", raw)))
}

/// Dexterity option for a golfer. Absent codes and integers outside the
/// dexterity range yield `None`; non-integer codes are an error.
pub fn parse_dexterity(code: Option<&str>) -> Result<Option<i32>, AppError> {
    let Some(code) = code else {
        return Ok(None);
    };
    let n: i32 = code.parse().map_err(|_| AppError::InvalidOptionCode {
        field: "dexterity",
        code: code.to_string(),
    })?;
    // 6 and 7 are the seeded LEFT/RIGHT-HANDED items; other ids are dropped
    // without error. TODO: resolve dexterity ids through category_option.name
    // once option items stop being seeded with fixed ids.
    if DEXTERITY_CODES.contains(&n) {
        Ok(Some(n))
    } else {
        tracing::warn!(code = n, "dexterity code out of range, ignored");
        Ok(None)
    }
}

/// Validate the golfer list into the rows to write. Nothing is written when
/// this fails.
pub fn plan_participants(golfers: &[Golfer]) -> Result<Vec<PlannedParticipant>, AppError> {
    if !matches!(golfers.len(), 1 | 2 | 4) {
        return Err(AppError::InvalidParticipantCount(golfers.len()));
    }
    golfers
        .iter()
        .map(|g| {
            let raw = g.shirt_size.as_deref().unwrap_or_default();
            let shirt_size = raw.parse().map_err(|_| AppError::InvalidOptionCode {
                field: "shirtsize",
                code: raw.to_string(),
            })?;
            Ok(PlannedParticipant {
                name: g.name.clone(),
                shirt_size,
                dexterity: parse_dexterity(g.dexterity.as_deref())?,
            })
        })
        .collect()
}

pub struct CartAssembly;

impl CartAssembly {
    /// Lookup-or-create the session's order, add one cart line and attach the
    /// participants in input order. Statements run on one connection without a
    /// surrounding transaction; a mid-way store failure leaves the rows
    /// written so far.
    pub async fn assemble(pool: &PgPool, reg: &Registration) -> Result<AssemblyReceipt, AppError> {
        let session_id = reg.session_id.trim();
        if session_id.is_empty() {
            return Err(AppError::Validation("sessionid is required".into()));
        }
        let pricing_id = reg.pricing_id.trim();
        if pricing_id.is_empty() {
            return Err(AppError::Validation("pricingid is required".into()));
        }
        let order_date = parse_order_date(&reg.order_date)?;
        let planned = plan_participants(&reg.golfers)?;

        let mut conn = pool.acquire().await?;
        let (shopping_order_id, reused_order) =
            order_for_session(&mut conn, session_id, order_date).await?;

        tracing::debug!(shopping_order_id, pricing_id, "insert shopping_cart");
        let shopping_cart_id: i32 = sqlx::query_scalar(
            "INSERT INTO shopping_cart (shoppingorderid, pricingid, qty) \
             VALUES ($1, $2, $3) RETURNING shoppingcartid",
        )
        .bind(shopping_order_id)
        .bind(pricing_id)
        .bind(CART_QTY)
        .fetch_one(&mut *conn)
        .await
        .stage("shopping_cart")?;

        let mut participant_ids = Vec::with_capacity(planned.len());
        for p in &planned {
            let id = add_participant(&mut conn, shopping_cart_id, p).await?;
            participant_ids.push(id);
        }

        tracing::info!(
            session_id,
            shopping_order_id,
            shopping_cart_id,
            participants = participant_ids.len(),
            reused_order,
            "cart assembled"
        );
        Ok(AssemblyReceipt {
            shopping_order_id,
            shopping_cart_id,
            participant_ids,
            reused_order,
        })
    }
}

/// Existing order id for the session, or a newly created one. The insert
/// tolerates a concurrent creator through the `sessionid` unique constraint.
async fn order_for_session(
    conn: &mut PgConnection,
    session_id: &str,
    order_date: DateTime<Utc>,
) -> Result<(i32, bool), AppError> {
    const SELECT: &str = "SELECT shoppingorderid FROM shopping_order WHERE sessionid = $1";

    tracing::debug!(session_id, "select shopping_order");
    let existing: Option<i32> = sqlx::query_scalar(SELECT)
        .bind(session_id)
        .fetch_optional(&mut *conn)
        .await
        .stage("select shopping_order")?;
    if let Some(id) = existing {
        return Ok((id, true));
    }

    tracing::debug!(session_id, %order_date, "insert shopping_order");
    let created: Option<i32> = sqlx::query_scalar(
        "INSERT INTO shopping_order (orderdate, sessionid) VALUES ($1, $2) \
         ON CONFLICT (sessionid) DO NOTHING RETURNING shoppingorderid",
    )
    .bind(order_date)
    .bind(session_id)
    .fetch_optional(&mut *conn)
    .await
    .stage("shopping_order")?;
    match created {
        Some(id) => Ok((id, false)),
        None => {
            let id: i32 = sqlx::query_scalar(SELECT)
                .bind(session_id)
                .fetch_one(&mut *conn)
                .await
                .stage("select shopping_order")?;
            Ok((id, true))
        }
    }
}

async fn add_participant(
    conn: &mut PgConnection,
    shopping_cart_id: i32,
    p: &PlannedParticipant,
) -> Result<i32, AppError> {
    const INSERT_OPTION: &str =
        "INSERT INTO cart_participant_option (cartparticipantid, optionitemsid) VALUES ($1, $2)";

    tracing::debug!(shopping_cart_id, name = %p.name, "insert cart_participant");
    let id: i32 = sqlx::query_scalar(
        "INSERT INTO cart_participant (shoppingcartid, name) VALUES ($1, $2) RETURNING cartparticipantid",
    )
    .bind(shopping_cart_id)
    .bind(&p.name)
    .fetch_one(&mut *conn)
    .await
    .stage("cart_participant")?;

    sqlx::query(INSERT_OPTION)
        .bind(id)
        .bind(p.shirt_size)
        .execute(&mut *conn)
        .await
        .stage("cart_participant_option: shirtsize")?;

    if let Some(dexterity) = p.dexterity {
        sqlx::query(INSERT_OPTION)
            .bind(id)
            .bind(dexterity)
            .execute(&mut *conn)
            .await
            .stage("cart_participant_option: dexterity")?;
    }
    Ok(id)
}
