//! Event registration backend: entity CRUD over a single command endpoint,
//! shopping cart assembly and teardown, and migration of finished orders
//! into permanent sales records.

pub mod config;
pub mod error;
pub mod handlers;
pub mod model;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{ServiceSettings, StoreSettings};
pub use error::{AppError, ConfigError};
pub use model::{Command, EntityKind, Target};
pub use response::{success_id, success_many, success_one, success_token, SUCCESS_TOKEN};
pub use routes::{app, command_routes, common_routes_with_ready};
pub use service::{CartAssembly, CartTeardown, CrudService, MigrationPipeline, Reports};
pub use state::AppState;
pub use store::ensure_tables;
