//! Dashboard presentation.
//!
//! Rendering only; every number shown here was computed by `analysis`.

pub mod generator;

pub use generator::{generate_json_report, DashboardRenderer};
