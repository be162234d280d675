//! Record ingestion and normalization for the analytics engine.
//!
//! This crate handles:
//! - Raw deal deserialization (API field names, mixed id types)
//! - Floor label parsing
//! - Conversion into validated `Transaction` records

pub mod floor;
pub mod normalizer;

pub use floor::parse_floor_label;
pub use normalizer::{parse_deals_json, DealNormalizer, NormalizationStats, RawDeal, RawId};
