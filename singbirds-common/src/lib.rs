//! # singbirds common library
//!
//! Shared code for the singbirds services:
//! - Error type shared across crates
//! - TOML configuration and root folder resolution
//! - SQLite initialization for the catalog and feature tables

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
