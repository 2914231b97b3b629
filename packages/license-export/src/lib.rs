//! Miro license export.
//!
//! Pulls organization members and boards through [`miro_client`], writes
//! them as CSV, and summarises license usage for cost reviews.

pub mod config;
pub mod export;
pub mod report;
pub mod slack;

pub use config::Config;
pub use export::{run_export, write_export, CsvRow, ExportSummary};
pub use report::LicenseReport;
pub use slack::SlackNotifier;
