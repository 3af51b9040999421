//! Configuration module for noteworthy
//!
//! Provides types and parsing for `noteworthy.toml` project configuration.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
