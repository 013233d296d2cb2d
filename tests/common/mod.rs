//! Shared setup for database-backed tests. They run only when `DATABASE_URL`
//! points at a disposable PostgreSQL database.

#![allow(dead_code)]

use eventreg_sdk::ensure_tables;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::OnceCell;
use uuid::Uuid;

static SCHEMA: OnceCell<()> = OnceCell::const_new();

pub const SOLO_PRICING: &str = "it_price_solo";
pub const TWOSOME_PRICING: &str = "it_price_twosome";
pub const SHIRT_LARGE: i32 = 3;
pub const RIGHT_HANDED: i32 = 7;

/// Pool on the test database with the tables and reference rows in place,
/// or `None` when no database is configured.
pub async fn pool() -> Option<PgPool> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.is_empty() => url,
        _ => {
            eprintln!("DATABASE_URL not set; skipping database test");
            return None;
        }
    };
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("connect to DATABASE_URL");
    SCHEMA
        .get_or_init(|| async {
            ensure_tables(&pool).await.expect("create tables");
            seed(&pool).await;
        })
        .await;
    Some(pool)
}

/// Option items 1..=5 are shirt sizes and 6, 7 the dexterity choices.
async fn seed(pool: &PgPool) {
    let statements = [
        "INSERT INTO category_option (categoryoptionsid, name) VALUES (1, 'T-Shirt'), (2, 'Dexterity') \
         ON CONFLICT DO NOTHING",
        "INSERT INTO option_item (optionitemsid, categoryoptionsid, name) VALUES \
         (1, 1, 'SMALL'), (2, 1, 'MEDIUM'), (3, 1, 'LARGE'), (4, 1, 'X-LARGE'), (5, 1, '2X-LARGE'), \
         (6, 2, 'LEFT-HANDED'), (7, 2, 'RIGHT-HANDED') ON CONFLICT DO NOTHING",
        "SELECT setval(pg_get_serial_sequence('category_option', 'categoryoptionsid'), \
         GREATEST((SELECT max(categoryoptionsid) FROM category_option), 1))",
        "SELECT setval(pg_get_serial_sequence('option_item', 'optionitemsid'), \
         GREATEST((SELECT max(optionitemsid) FROM option_item), 1))",
        "INSERT INTO product (productid, description) VALUES \
         ('it_solo', 'Solo Registration'), ('it_twosome', 'Twosome Registration') ON CONFLICT DO NOTHING",
        "INSERT INTO pricing (pricingid, productid, price) VALUES \
         ('it_price_solo', 'it_solo', 125.00), ('it_price_twosome', 'it_twosome', 240.00) ON CONFLICT DO NOTHING",
    ];
    for sql in statements {
        sqlx::query(sql).execute(pool).await.expect("seed reference data");
    }
}

pub fn session_id() -> String {
    format!("it-{}", Uuid::new_v4())
}

pub fn registration(session_id: &str, pricing_id: &str, golfers: Value) -> Value {
    json!({
        "orderdate": "2024-05-01T09:00:00Z",
        "sessionid": session_id,
        "pricingid": pricing_id,
        "golferinfo": golfers
    })
}

pub async fn count(pool: &PgPool, sql: &str, id: i32) -> i64 {
    sqlx::query_scalar(sql)
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("count query")
}
