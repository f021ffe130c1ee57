//! SportMonks Soccer API client
//!
//! Wraps the SportMonks Soccer API v2.0 with one async method per endpoint.
//! Responses come back as parsed JSON with the API's `{"data": ...}`
//! envelopes collapsed and paginated responses merged, or reshaped into a
//! flat [`Table`] for loading into a database.

pub mod client;
pub mod endpoints;
pub mod error;
pub mod response;
pub mod table;

pub use client::SportMonks;
pub use endpoints::FixtureFilters;
pub use error::{Error, Result};
pub use response::{Pagination, PlanInfo};
pub use table::Table;
