//! Shared building blocks for the session report.
//!
//! Record model and coercion rules, error types, report formatting helpers
//! and command-line settings.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
