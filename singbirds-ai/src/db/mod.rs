//! Database access for the catalog and feature tables
//!
//! Schema lives in `singbirds_common::db`; these modules hold the queries.

pub mod entities;
pub mod feature_rows;
pub mod recordings;

pub use feature_rows::SqliteFeatureStore;
