//! HTTP handlers for the command endpoint.

pub mod command;
pub use command::execute;
