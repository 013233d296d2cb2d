//! The command handler: decodes the single command payload and dispatches on
//! (action, target).

use crate::error::AppError;
use crate::model::command::{scalar_id, scalar_text, Command};
use crate::model::{key_predicates, Action, EntityDef, EntityKind, Operation, PkType, Target};
use crate::response::{success_id, success_many, success_one, success_token};
use crate::service::{
    CartAssembly, CartTeardown, CrudService, MigrateRequest, MigrationPipeline, Registration,
    ReportOutput, Reports,
};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};

/// POST body is read and parsed here rather than by the `Json` extractor so
/// oversized and malformed payloads still get the error envelope.
pub async fn execute(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, AppError> {
    let body = body
        .map_err(|e| AppError::BadRequest(format!("unreadable command body: {}", e.body_text())))?;
    let cmd: Command = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("invalid command: {}", e)))?;
    let target = cmd.target()?;
    tracing::debug!(action = ?cmd.action, ?target, "command");

    match (cmd.action, target) {
        (Action::Create, Target::Registration) => {
            let reg: Registration = serde_json::from_value(cmd.create)
                .map_err(|e| AppError::BadRequest(format!("registration: {}", e)))?;
            CartAssembly::assemble(&state.pool, &reg).await?;
            Ok(success_token().into_response())
        }
        (Action::Create, Target::MigrateData) => {
            let req = MigrateRequest::from_body(&object(cmd.create)?)?;
            MigrationPipeline::migrate(
                &state.pool,
                state.default_organization_id,
                req.shopping_order_id,
                &req.profile,
                req.payment_id.as_deref(),
            )
            .await?;
            Ok(success_token().into_response())
        }
        (Action::Delete, Target::ShoppingCarts) => {
            if cmd.delete.values.is_empty() {
                return Err(AppError::Validation("values must list at least one shoppingcartid".into()));
            }
            let ids = cmd
                .delete
                .values
                .iter()
                .map(|v| scalar_id(v, "shoppingcartid"))
                .collect::<Result<Vec<_>, _>>()?;
            CartTeardown::teardown_many(&state.pool, &ids).await?;
            Ok(success_token().into_response())
        }
        (Action::Delete, Target::Entity(EntityKind::ShoppingCart)) => {
            let id = scalar_id(&cmd.delete.value, "shoppingcartid")?;
            CartTeardown::teardown(&state.pool, id).await?;
            Ok(success_token().into_response())
        }
        (Action::Read | Action::ReadAll, Target::Report(kind)) => {
            match Reports::run(&state.pool, kind, &cmd.read.value).await? {
                ReportOutput::Summary(row) => Ok(success_one(row).into_response()),
                ReportOutput::Rows(rows) => Ok(success_many(rows).into_response()),
            }
        }
        (action, Target::Entity(kind)) => entity_command(&state, kind, action, cmd).await,
        (action, _) => Err(AppError::BadRequest(format!(
            "{:?} is not supported for {}",
            action, cmd.table
        ))),
    }
}

async fn entity_command(
    state: &AppState,
    kind: EntityKind,
    action: Action,
    cmd: Command,
) -> Result<Response, AppError> {
    let def = kind.def();
    let op = match action {
        Action::Create => Operation::Create,
        Action::Read | Action::ReadAll => Operation::Read,
        Action::Update => Operation::Update,
        Action::Delete => Operation::Delete,
    };
    if !def.allows(op) {
        return Err(AppError::BadRequest(format!(
            "{:?} not allowed for {}",
            action, def.table_name
        )));
    }

    match action {
        Action::Create => {
            let body = object(cmd.create)?;
            let row = CrudService::create(&state.pool, def, &body).await?;
            if def.generated_pk() {
                let id = row.get(def.pk).and_then(scalar_text).ok_or_else(|| {
                    AppError::NotFound(format!("{} returned no {}", def.table_name, def.pk))
                })?;
                Ok(success_id(id).into_response())
            } else {
                Ok(success_token().into_response())
            }
        }
        Action::ReadAll => {
            let rows = CrudService::list(&state.pool, def).await?;
            Ok(success_many(rows).into_response())
        }
        Action::Read => {
            let field = required_field(&cmd.read.field)?;
            check_key_value(def, field, &cmd.read.value)?;
            let rows = CrudService::read_where(&state.pool, def, field, &cmd.read.value).await?;
            Ok(success_many(rows).into_response())
        }
        Action::Update => {
            let predicates = key_predicates(kind, cmd.update.identifiers)?;
            CrudService::update(
                &state.pool,
                def,
                &cmd.update.setfields,
                &cmd.update.setvalues,
                &predicates,
            )
            .await?;
            Ok(success_token().into_response())
        }
        Action::Delete => {
            let field = required_field(&cmd.delete.field)?;
            check_key_value(def, field, &cmd.delete.value)?;
            CrudService::delete_where(&state.pool, def, field, &cmd.delete.value).await?;
            Ok(success_token().into_response())
        }
    }
}

fn object(v: Value) -> Result<Map<String, Value>, AppError> {
    match v {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("create must be a JSON object".into())),
    }
}

fn required_field(field: &str) -> Result<&str, AppError> {
    let field = field.trim();
    if field.is_empty() {
        return Err(AppError::Validation("field is required".into()));
    }
    Ok(field)
}

/// Values matched against the primary key must have the key's type.
fn check_key_value(def: &EntityDef, field: &str, value: &Value) -> Result<(), AppError> {
    if field != def.pk {
        return Ok(());
    }
    match def.pk_type {
        PkType::Int => scalar_id(value, field).map(|_| ()),
        PkType::Uuid => {
            let text = scalar_text(value)
                .ok_or_else(|| AppError::Validation(format!("{} is required", field)))?;
            uuid::Uuid::parse_str(&text)
                .map(|_| ())
                .map_err(|_| AppError::Validation(format!("{} must be a uuid, got '{}'", field, text)))
        }
        PkType::Text => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_values_follow_pk_type() {
        let order = EntityKind::ShoppingOrder.def();
        assert!(check_key_value(order, "shoppingorderid", &json!("12")).is_ok());
        assert!(check_key_value(order, "shoppingorderid", &json!("twelve")).is_err());
        assert!(check_key_value(order, "sessionid", &json!("twelve")).is_ok());

        let org = EntityKind::Organization.def();
        assert!(check_key_value(org, "organizationid", &json!("aa9a52a7-ab83-46ff-ab15-b35bd868407f")).is_ok());
        assert!(check_key_value(org, "organizationid", &json!("not-a-uuid")).is_err());

        let product = EntityKind::Product.def();
        assert!(check_key_value(product, "productid", &json!("solo")).is_ok());
    }

    #[test]
    fn blank_field_is_rejected() {
        assert!(matches!(required_field("  "), Err(AppError::Validation(_))));
        assert_eq!(required_field(" sessionid ").unwrap(), "sessionid");
    }
}
