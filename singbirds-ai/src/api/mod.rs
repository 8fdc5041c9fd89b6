//! HTTP API handlers for singbirds-ai

pub mod catalog;
pub mod embedding;
pub mod health;
pub mod ingestion;
pub mod settings;

pub use catalog::catalog_routes;
pub use embedding::embedding_routes;
pub use health::health_routes;
pub use ingestion::ingestion_routes;
pub use settings::settings_routes;
