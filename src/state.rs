//! Shared application state for all routes.

use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// Organization that migrated customers are filed under.
    pub default_organization_id: Uuid,
}
