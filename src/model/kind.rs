//! Entity kinds and their table metadata. Every statement the generic
//! repository builds takes identifiers from here, never from the request.

use crate::error::AppError;
use std::str::FromStr;

/// Primary key type for parsing ids that arrive as text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PkType {
    Uuid,
    Int,
    Text,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

#[derive(Clone, Copy, Debug)]
pub struct ColumnDef {
    pub name: &'static str,
    /// PostgreSQL type used to cast bound parameters (e.g. `$1::int4`).
    pub pg_type: &'static str,
    /// Whether the column has a DB default (serial, gen_random_uuid()).
    pub has_default: bool,
}

const fn col(name: &'static str, pg_type: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        pg_type,
        has_default: false,
    }
}

const fn generated(name: &'static str, pg_type: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        pg_type,
        has_default: true,
    }
}

#[derive(Debug)]
pub struct EntityDef {
    pub table_name: &'static str,
    pub pk: &'static str,
    pub pk_type: PkType,
    pub columns: &'static [ColumnDef],
    pub operations: &'static [Operation],
}

impl EntityDef {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a column named by a caller; unknown names are rejected.
    pub fn require_column(&self, name: &str) -> Result<&ColumnDef, AppError> {
        self.column(name).ok_or_else(|| {
            AppError::BadRequest(format!("unknown column '{}' for {}", name, self.table_name))
        })
    }

    pub fn allows(&self, op: Operation) -> bool {
        self.operations.contains(&op)
    }

    /// True when the store generates the primary key on insert.
    pub fn generated_pk(&self) -> bool {
        self.column(self.pk).map(|c| c.has_default).unwrap_or(false)
    }
}

use Operation::{Create, Delete, Read, Update};

static ORGANIZATION: EntityDef = EntityDef {
    table_name: "organization",
    pk: "organizationid",
    pk_type: PkType::Uuid,
    columns: &[
        generated("organizationid", "uuid"),
        col("name", "text"),
        col("address", "text"),
        col("city", "text"),
        col("state", "text"),
        col("postcode", "text"),
        col("isactive", "bool"),
    ],
    operations: &[Create, Read],
};

static EVENT: EntityDef = EntityDef {
    table_name: "event",
    pk: "eventid",
    pk_type: PkType::Int,
    columns: &[
        generated("eventid", "int4"),
        col("organizationid", "uuid"),
        col("name", "text"),
        col("location", "text"),
        col("capacity", "int4"),
        col("startson", "timestamptz"),
        col("endson", "timestamptz"),
    ],
    operations: &[Create, Read],
};

static PAYMENT_PROVIDER: EntityDef = EntityDef {
    table_name: "payment_provider",
    pk: "paymentproviderid",
    pk_type: PkType::Uuid,
    columns: &[generated("paymentproviderid", "uuid"), col("name", "text")],
    operations: &[Create, Read],
};

static PRODUCT: EntityDef = EntityDef {
    table_name: "product",
    pk: "productid",
    pk_type: PkType::Text,
    columns: &[
        col("productid", "text"),
        col("paymentproviderid", "uuid"),
        col("description", "text"),
    ],
    operations: &[Create, Read],
};

static PRICING: EntityDef = EntityDef {
    table_name: "pricing",
    pk: "pricingid",
    pk_type: PkType::Text,
    columns: &[
        col("pricingid", "text"),
        col("productid", "text"),
        col("price", "numeric"),
    ],
    operations: &[Create, Read],
};

static PACKAGE_CATEGORY: EntityDef = EntityDef {
    table_name: "package_category",
    pk: "packagecategoryid",
    pk_type: PkType::Int,
    columns: &[generated("packagecategoryid", "int4"), col("name", "text")],
    operations: &[Create, Read],
};

static PACKAGE: EntityDef = EntityDef {
    table_name: "package",
    pk: "packageid",
    pk_type: PkType::Int,
    columns: &[
        generated("packageid", "int4"),
        col("eventid", "int4"),
        col("productid", "text"),
        col("packagecategoryid", "int4"),
        col("name", "text"),
        col("description", "text"),
    ],
    operations: &[Create, Read],
};

static CATEGORY_OPTION: EntityDef = EntityDef {
    table_name: "category_option",
    pk: "categoryoptionsid",
    pk_type: PkType::Int,
    columns: &[
        generated("categoryoptionsid", "int4"),
        col("packagecategoryid", "int4"),
        col("name", "text"),
    ],
    operations: &[Create, Read],
};

static OPTION_ITEM: EntityDef = EntityDef {
    table_name: "option_item",
    pk: "optionitemsid",
    pk_type: PkType::Int,
    columns: &[
        generated("optionitemsid", "int4"),
        col("categoryoptionsid", "int4"),
        col("name", "text"),
    ],
    operations: &[Create, Read],
};

static SHOPPING_ORDER: EntityDef = EntityDef {
    table_name: "shopping_order",
    pk: "shoppingorderid",
    pk_type: PkType::Int,
    columns: &[
        generated("shoppingorderid", "int4"),
        col("orderdate", "timestamptz"),
        col("sessionid", "text"),
    ],
    operations: &[Create, Read, Update, Delete],
};

static SHOPPING_CART: EntityDef = EntityDef {
    table_name: "shopping_cart",
    pk: "shoppingcartid",
    pk_type: PkType::Int,
    columns: &[
        generated("shoppingcartid", "int4"),
        col("shoppingorderid", "int4"),
        col("pricingid", "text"),
        col("qty", "int4"),
    ],
    // Deletes go through cart teardown so dependent rows go first.
    operations: &[Create, Read, Update],
};

static CART_PARTICIPANT: EntityDef = EntityDef {
    table_name: "cart_participant",
    pk: "cartparticipantid",
    pk_type: PkType::Int,
    columns: &[
        generated("cartparticipantid", "int4"),
        col("shoppingcartid", "int4"),
        col("name", "text"),
    ],
    operations: &[Create, Read, Update, Delete],
};

static CART_PARTICIPANT_OPTION: EntityDef = EntityDef {
    table_name: "cart_participant_option",
    pk: "cartparticipantoptionsid",
    pk_type: PkType::Int,
    columns: &[
        generated("cartparticipantoptionsid", "int4"),
        col("cartparticipantid", "int4"),
        col("optionitemsid", "int4"),
    ],
    operations: &[Create, Read, Update, Delete],
};

static CUSTOMER: EntityDef = EntityDef {
    table_name: "customer",
    pk: "customerid",
    pk_type: PkType::Int,
    columns: &[
        generated("customerid", "int4"),
        col("organizationid", "uuid"),
        col("name", "text"),
        col("email", "text"),
        col("phone", "text"),
    ],
    operations: &[Read],
};

static SALES_ORDER: EntityDef = EntityDef {
    table_name: "salesorder",
    pk: "salesorderid",
    pk_type: PkType::Int,
    columns: &[
        col("salesorderid", "int4"),
        col("orderdate", "timestamptz"),
        col("customerid", "int4"),
        col("paymentid", "text"),
        col("invoiceno", "text"),
    ],
    operations: &[Create, Read, Update],
};

static PURCHASE: EntityDef = EntityDef {
    table_name: "purchase",
    pk: "purchaseid",
    pk_type: PkType::Int,
    columns: &[
        col("purchaseid", "int4"),
        col("salesorderid", "int4"),
        col("qty", "int4"),
        col("productname", "text"),
        col("description", "text"),
        col("price", "numeric"),
    ],
    operations: &[Read],
};

static PARTICIPANT: EntityDef = EntityDef {
    table_name: "participant",
    pk: "participantid",
    pk_type: PkType::Int,
    columns: &[
        col("participantid", "int4"),
        col("purchaseid", "int4"),
        col("name", "text"),
    ],
    operations: &[Read],
};

static PARTICIPANT_OPTION: EntityDef = EntityDef {
    table_name: "participant_option",
    pk: "participantoptionsid",
    pk_type: PkType::Int,
    columns: &[
        col("participantoptionsid", "int4"),
        col("participantid", "int4"),
        col("optionitemsid", "int4"),
    ],
    operations: &[Read],
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Organization,
    Event,
    PaymentProvider,
    Product,
    Pricing,
    PackageCategory,
    Package,
    CategoryOption,
    OptionItem,
    ShoppingOrder,
    ShoppingCart,
    CartParticipant,
    CartParticipantOption,
    Customer,
    SalesOrder,
    Purchase,
    Participant,
    ParticipantOption,
}

impl EntityKind {
    pub const ALL: [EntityKind; 18] = [
        EntityKind::Organization,
        EntityKind::Event,
        EntityKind::PaymentProvider,
        EntityKind::Product,
        EntityKind::Pricing,
        EntityKind::PackageCategory,
        EntityKind::Package,
        EntityKind::CategoryOption,
        EntityKind::OptionItem,
        EntityKind::ShoppingOrder,
        EntityKind::ShoppingCart,
        EntityKind::CartParticipant,
        EntityKind::CartParticipantOption,
        EntityKind::Customer,
        EntityKind::SalesOrder,
        EntityKind::Purchase,
        EntityKind::Participant,
        EntityKind::ParticipantOption,
    ];

    pub fn def(self) -> &'static EntityDef {
        match self {
            EntityKind::Organization => &ORGANIZATION,
            EntityKind::Event => &EVENT,
            EntityKind::PaymentProvider => &PAYMENT_PROVIDER,
            EntityKind::Product => &PRODUCT,
            EntityKind::Pricing => &PRICING,
            EntityKind::PackageCategory => &PACKAGE_CATEGORY,
            EntityKind::Package => &PACKAGE,
            EntityKind::CategoryOption => &CATEGORY_OPTION,
            EntityKind::OptionItem => &OPTION_ITEM,
            EntityKind::ShoppingOrder => &SHOPPING_ORDER,
            EntityKind::ShoppingCart => &SHOPPING_CART,
            EntityKind::CartParticipant => &CART_PARTICIPANT,
            EntityKind::CartParticipantOption => &CART_PARTICIPANT_OPTION,
            EntityKind::Customer => &CUSTOMER,
            EntityKind::SalesOrder => &SALES_ORDER,
            EntityKind::Purchase => &PURCHASE,
            EntityKind::Participant => &PARTICIPANT,
            EntityKind::ParticipantOption => &PARTICIPANT_OPTION,
        }
    }

    pub fn table_name(self) -> &'static str {
        self.def().table_name
    }
}

impl FromStr for EntityKind {
    type Err = AppError;

    /// Table names, case-insensitive. Plural and legacy spellings used by
    /// existing callers are accepted as aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim().to_lowercase().as_str() {
            "organization" => EntityKind::Organization,
            "event" => EntityKind::Event,
            "payment_provider" => EntityKind::PaymentProvider,
            "product" => EntityKind::Product,
            "pricing" => EntityKind::Pricing,
            "package_category" => EntityKind::PackageCategory,
            "package" => EntityKind::Package,
            "category_option" | "category_options" => EntityKind::CategoryOption,
            "option_item" | "option_items" => EntityKind::OptionItem,
            "shopping_order" => EntityKind::ShoppingOrder,
            "shopping_cart" => EntityKind::ShoppingCart,
            "cart_participant" => EntityKind::CartParticipant,
            "cart_participant_option" => EntityKind::CartParticipantOption,
            "customer" => EntityKind::Customer,
            "salesorder" | "order" => EntityKind::SalesOrder,
            "purchase" => EntityKind::Purchase,
            "participant" => EntityKind::Participant,
            "participant_option" | "participant_options" => EntityKind::ParticipantOption,
            other => return Err(AppError::BadRequest(format!("unknown table: {}", other))),
        };
        Ok(kind)
    }
}
