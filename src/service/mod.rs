//! Entity CRUD, the order-lifecycle pipeline and the report read models.

pub mod cart;
mod crud;
pub mod migrate;
pub mod reports;
pub mod teardown;
pub mod validation;

pub use cart::{AssemblyReceipt, CartAssembly, Registration};
pub use crud::CrudService;
pub use migrate::{CustomerProfile, MigrateRequest, MigrationPipeline, MigrationReceipt};
pub use reports::{ReportKind, ReportOutput, Reports};
pub use teardown::{CartTeardown, TeardownReceipt};
pub use validation::RequestValidator;
