//! ClickHouse warehouse for the weekly metrics engine.
//!
//! [`ClickHouseClient`] reads event extracts and publishes metric tables;
//! [`ClickHouseConnector`] opens one client per pipeline run.

pub mod client;
pub mod config;
pub mod health;
pub mod schema;
pub mod sink;
pub mod source;

pub use client::*;
pub use config::*;
pub use health::{check_connection, ensure_connection};
