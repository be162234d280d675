//! Core types and configuration for the real-estate analytics engine.
//!
//! This crate provides shared types used across all other crates:
//! - The validated transaction record
//! - Analysis configuration
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, MarketConfig, OutlierConfig};
pub use error::{Error, Result};
pub use types::*;
