//! trainboard-core: Performance aggregation for corporate training reports.
//!
//! This crate turns raw progress, answer, and feedback rows into the metric
//! records, rankings, charts, and report tables that every trainboard
//! surface (dashboards, detail reports, exports) consumes.

pub mod access;
pub mod aggregate;
pub mod charts;
pub mod config;
pub mod engine;
pub mod error;
pub mod filename;
pub mod gateway;
pub mod index;
pub mod metrics;
pub mod model;
pub mod numeric;
pub mod ranking;
pub mod slot;
pub mod table;

pub use error::ReportError;
