//! The single command payload every invocation carries, and the enumerated
//! targets it dispatches to.

use crate::error::AppError;
use crate::model::EntityKind;
use crate::service::reports::ReportKind;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    ReadAll,
    Update,
    Delete,
}

impl FromStr for Action {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "create" => Ok(Action::Create),
            "read" => Ok(Action::Read),
            "readall" => Ok(Action::ReadAll),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            other => Err(AppError::BadRequest(format!("unknown action: {}", other))),
        }
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// What a command's `table` selects: a plain entity, or one of the
/// composite operations and read models layered over the entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    Entity(EntityKind),
    /// Cart assembly from a registration form.
    Registration,
    /// Ephemeral order → permanent sales records.
    MigrateData,
    /// Batch cart teardown.
    ShoppingCarts,
    Report(ReportKind),
}

impl FromStr for Target {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        match name.as_str() {
            "registration" => return Ok(Target::Registration),
            "migrate_data" => return Ok(Target::MigrateData),
            "shopping_carts" => return Ok(Target::ShoppingCarts),
            _ => {}
        }
        if let Ok(report) = name.parse::<ReportKind>() {
            return Ok(Target::Report(report));
        }
        name.parse::<EntityKind>()
            .map(Target::Entity)
            .map_err(|_| AppError::BadRequest(format!("unknown table: {}", name)))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReadArgs {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateArgs {
    #[serde(default)]
    pub identifiers: Value,
    #[serde(default)]
    pub setfields: Vec<String>,
    #[serde(default)]
    pub setvalues: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteArgs {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub values: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct Command {
    pub action: Action,
    pub table: String,
    #[serde(default)]
    pub create: Value,
    #[serde(default)]
    pub read: ReadArgs,
    #[serde(default)]
    pub update: UpdateArgs,
    #[serde(default)]
    pub delete: DeleteArgs,
}

impl Command {
    pub fn target(&self) -> Result<Target, AppError> {
        self.table.parse()
    }
}

/// Text form of a scalar argument (`"12"` and `12` both give `12`).
pub fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Integer id from a scalar argument.
pub fn scalar_id(v: &Value, what: &str) -> Result<i32, AppError> {
    let text = scalar_text(v).ok_or_else(|| AppError::Validation(format!("{} is required", what)))?;
    text.parse()
        .map_err(|_| AppError::Validation(format!("{} must be an integer, got '{}'", what, text)))
}
