//! SportMonks nightly database loader
//!
//! Fetches soccer data through `sportmonks-client` and stores it in
//! PostgreSQL: six reference tables replaced wholesale, per-league fixture
//! tables appended daily, wide per-market odds tables and per-fixture
//! lineup tables derived from the same fetch.

pub mod config;
pub mod fixtures;
pub mod odds;
pub mod reference;
pub mod scheduler;
pub mod writer;

pub use config::StoreConfig;
pub use scheduler::NightlyLoader;
pub use writer::{IfExists, PgWriter};
