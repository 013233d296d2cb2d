//! Entity kinds, update keys and the command payload.

pub mod command;
pub mod keys;
pub mod kind;

pub use command::{Action, Command, Target};
pub use keys::{key_predicates, RowKey};
pub use kind::{ColumnDef, EntityDef, EntityKind, Operation, PkType};
