//! `cost-uploader-normalize`: canonical cost row engine.
//!
//! Pure engine crate: receives raw report text from the ad networks, returns
//! canonical rows ready for the sheet. No network, no filesystem.

pub mod aggregate;
pub mod amount;
pub mod criteo;
pub mod error;
pub mod kelkoo;
pub mod merge;
pub mod model;
pub mod taxonomy;

pub use error::NormalizeError;
pub use merge::merge;
pub use model::{Channel, CostRow, Device, Engine, COLUMNS};
pub use taxonomy::MarketMap;
