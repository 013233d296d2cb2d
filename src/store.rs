//! Table DDL for an empty database. Every statement is idempotent
//! (`IF NOT EXISTS`), so this runs safely at each start.

use crate::error::AppError;
use sqlx::PgPool;

/// Parents before children so foreign keys resolve.
const TABLES: &[(&str, &str)] = &[
    (
        "organization",
        r#"
        CREATE TABLE IF NOT EXISTS organization (
            organizationid UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name TEXT NOT NULL,
            address TEXT,
            city TEXT,
            state TEXT,
            postcode TEXT,
            isactive BOOLEAN NOT NULL DEFAULT TRUE
        )
        "#,
    ),
    (
        "event",
        r#"
        CREATE TABLE IF NOT EXISTS event (
            eventid SERIAL PRIMARY KEY,
            organizationid UUID REFERENCES organization (organizationid),
            name TEXT NOT NULL,
            location TEXT,
            capacity INTEGER,
            startson TIMESTAMPTZ,
            endson TIMESTAMPTZ
        )
        "#,
    ),
    (
        "payment_provider",
        r#"
        CREATE TABLE IF NOT EXISTS payment_provider (
            paymentproviderid UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name TEXT NOT NULL
        )
        "#,
    ),
    (
        "product",
        r#"
        CREATE TABLE IF NOT EXISTS product (
            productid TEXT PRIMARY KEY,
            paymentproviderid UUID REFERENCES payment_provider (paymentproviderid),
            description TEXT NOT NULL
        )
        "#,
    ),
    (
        "pricing",
        r#"
        CREATE TABLE IF NOT EXISTS pricing (
            pricingid TEXT PRIMARY KEY,
            productid TEXT NOT NULL REFERENCES product (productid),
            price NUMERIC(12, 2) NOT NULL
        )
        "#,
    ),
    (
        "package_category",
        r#"
        CREATE TABLE IF NOT EXISTS package_category (
            packagecategoryid SERIAL PRIMARY KEY,
            name TEXT NOT NULL
        )
        "#,
    ),
    (
        "package",
        r#"
        CREATE TABLE IF NOT EXISTS package (
            packageid SERIAL PRIMARY KEY,
            eventid INTEGER REFERENCES event (eventid),
            productid TEXT REFERENCES product (productid),
            packagecategoryid INTEGER REFERENCES package_category (packagecategoryid),
            name TEXT NOT NULL,
            description TEXT
        )
        "#,
    ),
    (
        "category_option",
        r#"
        CREATE TABLE IF NOT EXISTS category_option (
            categoryoptionsid SERIAL PRIMARY KEY,
            packagecategoryid INTEGER REFERENCES package_category (packagecategoryid),
            name TEXT NOT NULL
        )
        "#,
    ),
    (
        "option_item",
        r#"
        CREATE TABLE IF NOT EXISTS option_item (
            optionitemsid SERIAL PRIMARY KEY,
            categoryoptionsid INTEGER NOT NULL REFERENCES category_option (categoryoptionsid),
            name TEXT NOT NULL
        )
        "#,
    ),
    (
        "shopping_order",
        r#"
        CREATE TABLE IF NOT EXISTS shopping_order (
            shoppingorderid SERIAL PRIMARY KEY,
            orderdate TIMESTAMPTZ NOT NULL,
            sessionid TEXT NOT NULL UNIQUE
        )
        "#,
    ),
    (
        "shopping_cart",
        r#"
        CREATE TABLE IF NOT EXISTS shopping_cart (
            shoppingcartid SERIAL PRIMARY KEY,
            shoppingorderid INTEGER NOT NULL REFERENCES shopping_order (shoppingorderid),
            pricingid TEXT NOT NULL REFERENCES pricing (pricingid),
            qty INTEGER NOT NULL DEFAULT 1
        )
        "#,
    ),
    (
        "cart_participant",
        r#"
        CREATE TABLE IF NOT EXISTS cart_participant (
            cartparticipantid SERIAL PRIMARY KEY,
            shoppingcartid INTEGER NOT NULL REFERENCES shopping_cart (shoppingcartid),
            name TEXT NOT NULL
        )
        "#,
    ),
    (
        "cart_participant_option",
        r#"
        CREATE TABLE IF NOT EXISTS cart_participant_option (
            cartparticipantoptionsid SERIAL PRIMARY KEY,
            cartparticipantid INTEGER NOT NULL REFERENCES cart_participant (cartparticipantid),
            optionitemsid INTEGER NOT NULL REFERENCES option_item (optionitemsid)
        )
        "#,
    ),
    (
        "customer",
        r#"
        CREATE TABLE IF NOT EXISTS customer (
            customerid SERIAL PRIMARY KEY,
            organizationid UUID NOT NULL,
            name TEXT NOT NULL,
            email TEXT,
            phone TEXT
        )
        "#,
    ),
    (
        "salesorder",
        r#"
        CREATE TABLE IF NOT EXISTS salesorder (
            salesorderid INTEGER PRIMARY KEY,
            customerid INTEGER NOT NULL REFERENCES customer (customerid),
            orderdate TIMESTAMPTZ NOT NULL,
            paymentid TEXT,
            invoiceno TEXT
        )
        "#,
    ),
    (
        "purchase",
        r#"
        CREATE TABLE IF NOT EXISTS purchase (
            purchaseid INTEGER PRIMARY KEY,
            salesorderid INTEGER NOT NULL REFERENCES salesorder (salesorderid),
            qty INTEGER NOT NULL,
            productname TEXT NOT NULL,
            description TEXT,
            price NUMERIC(12, 2) NOT NULL
        )
        "#,
    ),
    (
        "participant",
        r#"
        CREATE TABLE IF NOT EXISTS participant (
            participantid INTEGER PRIMARY KEY,
            purchaseid INTEGER NOT NULL REFERENCES purchase (purchaseid),
            name TEXT NOT NULL
        )
        "#,
    ),
    (
        "participant_option",
        r#"
        CREATE TABLE IF NOT EXISTS participant_option (
            participantoptionsid INTEGER PRIMARY KEY,
            participantid INTEGER NOT NULL REFERENCES participant (participantid),
            optionitemsid INTEGER NOT NULL REFERENCES option_item (optionitemsid)
        )
        "#,
    ),
];

/// Create every table the entity kinds name, if missing.
pub async fn ensure_tables(pool: &PgPool) -> Result<(), AppError> {
    for (table, ddl) in TABLES {
        tracing::debug!(table, "ensure table");
        sqlx::query(ddl).execute(pool).await?;
    }
    tracing::info!(tables = TABLES.len(), "schema ready");
    Ok(())
}
