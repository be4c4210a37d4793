//! Entity pipelines for the weekly metrics engine.
//!
//! Each family turns one extract into one published table:
//! - job offers (platform averages of per-offer performance)
//! - partners (reach, growth and loyalty per platform and country)
//! - users (activity per city)
//!
//! The [`Orchestrator`] runs the enabled families against a warehouse.

pub mod config;
pub mod family;
pub mod job_offers;
pub mod orchestrator;
pub mod partners;
pub mod users;

pub use config::*;
pub use family::*;
pub use orchestrator::*;
