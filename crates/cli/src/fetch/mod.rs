//! Upstream clients: the Fixer rate and the two ad-network reports.
//!
//! Clients only move bytes. Parsing and normalisation live in
//! `cost-uploader-normalize`.

pub mod common;
pub mod criteo;
pub mod fixer;
pub mod kelkoo;

pub use common::ReportWindow;
pub use criteo::{CriteoClient, CriteoReports};
pub use fixer::FixerClient;
pub use kelkoo::KelkooClient;
