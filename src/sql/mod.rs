//! Parameterized SQL: identifiers from entity metadata only, values as bound parameters.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;
