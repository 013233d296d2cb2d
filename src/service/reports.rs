//! Read models over the sales records: dashboard totals, registration and
//! option summaries, and the per-session order view.

use crate::error::AppError;
use crate::service::crud::row_to_json;
use serde_json::Value;
use sqlx::PgPool;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportKind {
    OrderData,
    DashboardSummary,
    RegistrationSummary,
    RegistrationBreakdown,
    ShirtSummary,
    ClubSummary,
    RegistrationDetail,
}

impl FromStr for ReportKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "order_data" => Ok(ReportKind::OrderData),
            "dashboard_summary" => Ok(ReportKind::DashboardSummary),
            "registration_summary" => Ok(ReportKind::RegistrationSummary),
            "registration_breakdown" => Ok(ReportKind::RegistrationBreakdown),
            "shirt_summary" => Ok(ReportKind::ShirtSummary),
            "club_summary" => Ok(ReportKind::ClubSummary),
            "registration_detail" => Ok(ReportKind::RegistrationDetail),
            other => Err(AppError::BadRequest(format!("unknown report: {}", other))),
        }
    }
}

impl ReportKind {
    /// Summaries produce exactly one row and are returned as a single object.
    pub fn is_summary(self) -> bool {
        matches!(
            self,
            ReportKind::DashboardSummary
                | ReportKind::RegistrationSummary
                | ReportKind::RegistrationBreakdown
                | ReportKind::ShirtSummary
                | ReportKind::ClubSummary
        )
    }

    fn sql(self) -> &'static str {
        match self {
            ReportKind::OrderData => ORDER_DATA,
            ReportKind::DashboardSummary => DASHBOARD_SUMMARY,
            ReportKind::RegistrationSummary => REGISTRATION_SUMMARY,
            ReportKind::RegistrationBreakdown => REGISTRATION_BREAKDOWN,
            ReportKind::ShirtSummary => SHIRT_SUMMARY,
            ReportKind::ClubSummary => CLUB_SUMMARY,
            ReportKind::RegistrationDetail => REGISTRATION_DETAIL,
        }
    }
}

const ORDER_DATA: &str = "\
SELECT o.sessionid, o.orderdate, o.shoppingorderid::text AS shoppingorderid, c.pricingid, \
       c.shoppingcartid::text AS shoppingcartid, c.qty::text AS qty, \
       p.cartparticipantid::text AS participantid, p.name AS participantname, \
       oi.name AS optionname, co.name AS category \
FROM shopping_order o \
JOIN shopping_cart c ON c.shoppingorderid = o.shoppingorderid \
JOIN cart_participant p ON p.shoppingcartid = c.shoppingcartid \
JOIN cart_participant_option po ON po.cartparticipantid = p.cartparticipantid \
JOIN option_item oi ON oi.optionitemsid = po.optionitemsid \
JOIN category_option co ON co.categoryoptionsid = oi.categoryoptionsid \
WHERE o.sessionid = $1 \
ORDER BY c.shoppingcartid, p.cartparticipantid, po.cartparticipantoptionsid";

// Participants are counted once each; money is summed once per purchase.
const DASHBOARD_SUMMARY: &str = "\
SELECT (SELECT count(*) FROM participant pa JOIN purchase pu ON pu.purchaseid = pa.purchaseid) AS participants, \
       (SELECT COALESCE(sum(price), 0)::text FROM purchase) AS collected";

const REGISTRATION_SUMMARY: &str = "\
SELECT COALESCE(sum(CASE WHEN pu.productname = 'Solo Registration' THEN pu.qty ELSE 0 END), 0) AS soloregistration, \
       COALESCE(sum(CASE WHEN pu.productname = 'Twosome Registration' THEN pu.qty ELSE 0 END), 0) AS twosomeregistration, \
       COALESCE(sum(CASE WHEN pu.productname = 'Foursome Registration' THEN pu.qty ELSE 0 END), 0) AS foursomeregistration \
FROM participant pa \
JOIN purchase pu ON pu.purchaseid = pa.purchaseid";

// foursomecollected repeats the solo amount, matching the figures the
// dashboard has always shown. TODO: switch it to 'Foursome Registration'
// together with the dashboard client.
const REGISTRATION_BREAKDOWN: &str = "\
WITH q AS ( \
    SELECT COALESCE(sum(CASE WHEN pu.productname = 'Solo Registration' THEN pu.qty ELSE 0 END), 0) AS solo, \
           COALESCE(sum(CASE WHEN pu.productname = 'Twosome Registration' THEN pu.qty ELSE 0 END), 0) AS twosome, \
           COALESCE(sum(CASE WHEN pu.productname = 'Foursome Registration' THEN pu.qty ELSE 0 END), 0) AS foursome \
    FROM participant pa JOIN purchase pu ON pu.purchaseid = pa.purchaseid), \
c AS ( \
    SELECT COALESCE(sum(price) FILTER (WHERE productname = 'Solo Registration'), 0) AS solo, \
           COALESCE(sum(price) FILTER (WHERE productname = 'Twosome Registration'), 0) AS twosome \
    FROM purchase) \
SELECT q.solo AS soloregistration, c.solo::text AS solocollected, \
       q.twosome AS twosomeregistration, c.twosome::text AS twosomecollected, \
       q.foursome AS foursomeregistration, c.solo::text AS foursomecollected \
FROM q, c";

const SHIRT_SUMMARY: &str = "\
SELECT count(*) FILTER (WHERE oi.name = 'SMALL') AS small, \
       count(*) FILTER (WHERE oi.name = 'MEDIUM') AS medium, \
       count(*) FILTER (WHERE oi.name = 'LARGE') AS large, \
       count(*) FILTER (WHERE oi.name = 'X-LARGE') AS xlarge, \
       count(*) FILTER (WHERE oi.name = '2X-LARGE') AS xxlarge \
FROM participant_option po \
JOIN option_item oi ON oi.optionitemsid = po.optionitemsid";

const CLUB_SUMMARY: &str = "\
SELECT count(*) FILTER (WHERE oi.name = 'LEFT-HANDED') AS lefthanded, \
       count(*) FILTER (WHERE oi.name = 'RIGHT-HANDED') AS righthanded \
FROM participant_option po \
JOIN option_item oi ON oi.optionitemsid = po.optionitemsid";

// Member, shirt and club lists are newline-joined per sales order and split
// back into arrays by `split_lists`.
const REGISTRATION_DETAIL: &str = "\
WITH picks AS ( \
    SELECT pu.salesorderid, p.name AS member, co.name AS category, oi.name AS item \
    FROM participant p \
    JOIN purchase pu ON pu.purchaseid = p.purchaseid \
    JOIN participant_option po ON po.participantid = p.participantid \
    JOIN option_item oi ON oi.optionitemsid = po.optionitemsid \
    JOIN category_option co ON co.categoryoptionsid = oi.categoryoptionsid), \
shirts AS ( \
    SELECT salesorderid, string_agg(member, chr(10) ORDER BY member) AS members, \
           string_agg(item, chr(10) ORDER BY member) AS shirt \
    FROM picks WHERE category = 'T-Shirt' GROUP BY salesorderid), \
clubs AS ( \
    SELECT salesorderid, string_agg(item, chr(10) ORDER BY member) AS club \
    FROM picks WHERE category = 'Dexterity' GROUP BY salesorderid) \
SELECT c.name, c.phone, t.members, t.shirt, COALESCE(t1.club, '') AS club \
FROM customer c \
JOIN salesorder s ON s.customerid = c.customerid \
JOIN shirts t ON t.salesorderid = s.salesorderid \
LEFT JOIN clubs t1 ON t1.salesorderid = s.salesorderid \
ORDER BY c.name, s.salesorderid";

const LIST_COLUMNS: [&str; 3] = ["members", "shirt", "club"];

/// Result of a report: one summary object or a list of rows.
#[derive(Debug, PartialEq)]
pub enum ReportOutput {
    Summary(Value),
    Rows(Vec<Value>),
}

pub struct Reports;

impl Reports {
    /// Run a report. `order_data` takes the session id as its argument; the
    /// others ignore it.
    pub async fn run(pool: &PgPool, kind: ReportKind, arg: &Value) -> Result<ReportOutput, AppError> {
        let sql = kind.sql();
        tracing::debug!(report = ?kind, "report");
        let mut query = sqlx::query(sql);
        if kind == ReportKind::OrderData {
            let session_id = match arg {
                Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
                _ => return Err(AppError::Validation("order_data needs a session id value".into())),
            };
            query = query.bind(session_id);
        }
        let rows = query.fetch_all(pool).await?;
        let mut rows: Vec<Value> = rows.iter().map(row_to_json).collect();
        if kind == ReportKind::RegistrationDetail {
            rows.iter_mut().for_each(split_lists);
        }
        if kind.is_summary() {
            let row = rows
                .into_iter()
                .next()
                .ok_or(AppError::Db(sqlx::Error::RowNotFound))?;
            return Ok(ReportOutput::Summary(row));
        }
        Ok(ReportOutput::Rows(rows))
    }
}

/// Turn newline-joined list columns into JSON arrays. An empty string becomes
/// an empty array.
fn split_lists(row: &mut Value) {
    let Some(obj) = row.as_object_mut() else {
        return;
    };
    for col in LIST_COLUMNS {
        let items: Vec<Value> = match obj.get(col) {
            Some(Value::String(s)) => s
                .split('\n')
                .filter(|item| !item.is_empty())
                .map(|item| Value::String(item.to_string()))
                .collect(),
            _ => continue,
        };
        obj.insert(col.to_string(), Value::Array(items));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn report_names_parse() {
        assert_eq!("Shirt_Summary".parse::<ReportKind>().unwrap(), ReportKind::ShirtSummary);
        assert_eq!("order_data".parse::<ReportKind>().unwrap(), ReportKind::OrderData);
        assert!("customer".parse::<ReportKind>().is_err());
    }

    #[test]
    fn only_aggregates_are_summaries() {
        assert!(ReportKind::DashboardSummary.is_summary());
        assert!(ReportKind::ClubSummary.is_summary());
        assert!(!ReportKind::OrderData.is_summary());
        assert!(!ReportKind::RegistrationDetail.is_summary());
    }

    #[test]
    fn breakdown_reports_solo_amount_as_foursome_collected() {
        assert!(REGISTRATION_BREAKDOWN.contains("c.solo::text AS foursomecollected"));
    }

    #[test]
    fn list_columns_split_into_arrays() {
        let mut row = json!({
            "name": "Pat",
            "phone": "555",
            "members": "Ann\nBob",
            "shirt": "LARGE\nSMALL",
            "club": ""
        });
        split_lists(&mut row);
        assert_eq!(row["members"], json!(["Ann", "Bob"]));
        assert_eq!(row["shirt"], json!(["LARGE", "SMALL"]));
        assert_eq!(row["club"], json!([]));
        assert_eq!(row["name"], "Pat");
    }
}
