//! Data pipeline for the session report.
//!
//! Reads the gzip-compressed activity log line by line, parses each line into
//! a record, aggregates per-user session statistics in a single pass and
//! turns the result into the final report document.

pub mod aggregator;
pub mod analysis;
pub mod parser;
pub mod reader;
pub mod report;

pub use report_core as core;
