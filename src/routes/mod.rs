//! Router assembly.

mod command;
mod common;

pub use command::{app, command_routes, MAX_BODY_BYTES};
pub use common::common_routes_with_ready;
