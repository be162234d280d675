//! Raw deal normalization.
//!
//! Converts deals as delivered by the geospatial API into validated
//! `Transaction` records. Malformed records are rejected with an error
//! instead of being dropped, so a bad payload never looks like "no data".

use chrono::NaiveDate;
use realty_core::{Error, Result, Transaction};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::floor::parse_floor_label;

/// Deal identifier as sent by the API (numeric or textual).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(u64),
    Text(String),
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawId::Number(n) => write!(f, "{n}"),
            RawId::Text(s) => f.write_str(s),
        }
    }
}

/// One deal as delivered by the API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDeal {
    #[serde(rename = "objectid", alias = "id", default)]
    pub id: Option<RawId>,
    #[serde(rename = "dealAmount", alias = "deal_amount", default)]
    pub deal_amount: Option<f64>,
    #[serde(rename = "dealDate", alias = "deal_date", default)]
    pub deal_date: Option<String>,
    #[serde(rename = "assetArea", alias = "asset_area", default)]
    pub asset_area: Option<f64>,
    #[serde(rename = "assetRoomNum", alias = "rooms", default)]
    pub rooms: Option<f64>,
    /// Textual floor label.
    #[serde(rename = "floorNo", alias = "floor", default)]
    pub floor_label: Option<String>,
    /// Pre-parsed floor, preferred over the label when present.
    #[serde(rename = "floorNumber", alias = "floor_number", default)]
    pub floor_number: Option<i32>,
    #[serde(rename = "propertyTypeDescription", alias = "property_type_description", default)]
    pub property_type_description: Option<String>,
    #[serde(rename = "assetTypeHeb", default)]
    pub asset_type_heb: Option<String>,
}

/// Counters describing the quality of a normalized batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationStats {
    /// Raw deals seen.
    pub total_records: u64,
    /// Deals converted successfully.
    pub accepted_records: u64,
    /// Deals rejected as malformed.
    pub rejected_records: u64,
    /// Accepted deals without a positive amount.
    pub missing_amount: u64,
    /// Accepted deals without a positive area.
    pub missing_area: u64,
    /// Floor labels present but not understood.
    pub unparsed_floors: u64,
}

impl NormalizationStats {
    /// Fraction of accepted deals that carry a usable amount.
    pub fn priced_frac(&self) -> f64 {
        if self.accepted_records > 0 {
            (self.accepted_records - self.missing_amount) as f64 / self.accepted_records as f64
        } else {
            0.0
        }
    }

    /// Reset statistics.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Converts raw deals into transactions and tracks data quality.
#[derive(Debug, Default)]
pub struct DealNormalizer {
    stats: NormalizationStats,
}

impl DealNormalizer {
    /// Create a new normalizer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize a single raw deal.
    pub fn normalize(&mut self, raw: RawDeal) -> Result<Transaction> {
        self.stats.total_records += 1;

        match self.convert(raw) {
            Ok(tx) => {
                self.stats.accepted_records += 1;
                if tx.price().is_none() {
                    self.stats.missing_amount += 1;
                }
                if tx.usable_area().is_none() {
                    self.stats.missing_area += 1;
                }
                Ok(tx)
            }
            Err(err) => {
                self.stats.rejected_records += 1;
                warn!(error = %err, "rejected raw deal");
                Err(err)
            }
        }
    }

    /// Normalize a batch, failing on the first malformed deal.
    pub fn normalize_batch(&mut self, raws: Vec<RawDeal>) -> Result<Vec<Transaction>> {
        raws.into_iter().map(|raw| self.normalize(raw)).collect()
    }

    /// Statistics accumulated so far.
    pub fn stats(&self) -> &NormalizationStats {
        &self.stats
    }

    /// Clear accumulated statistics, e.g. between batches.
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    fn convert(&mut self, raw: RawDeal) -> Result<Transaction> {
        let id = raw
            .id
            .map(|id| id.to_string())
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| Error::data("deal is missing its identifier"))?;

        let date_text = raw
            .deal_date
            .as_deref()
            .ok_or_else(|| Error::data(format!("deal {id} is missing its date")))?;
        let date = parse_deal_date(date_text)
            .ok_or_else(|| Error::data(format!("deal {id} has invalid date '{date_text}'")))?;

        let floor = match (raw.floor_number, raw.floor_label.as_deref()) {
            (Some(floor), _) => Some(floor),
            (None, Some(label)) if !label.trim().is_empty() => {
                let parsed = parse_floor_label(label);
                if parsed.is_none() {
                    self.stats.unparsed_floors += 1;
                }
                parsed
            }
            _ => None,
        };

        let property_type = [raw.property_type_description, raw.asset_type_heb]
            .into_iter()
            .flatten()
            .map(|s| s.trim().to_string())
            .find(|s| !s.is_empty());

        Ok(Transaction {
            id,
            amount: raw.deal_amount,
            date,
            area: raw.asset_area,
            rooms: raw.rooms,
            floor,
            property_type,
        })
    }
}

/// Parse `YYYY-MM-DD`, ignoring any time suffix (`2024-03-01T00:00:00`).
fn parse_deal_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    let day_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(day_part, "%Y-%m-%d").ok()
}

/// Parse a JSON array of raw deals into transactions.
pub fn parse_deals_json(json: &str) -> Result<Vec<Transaction>> {
    let raws: Vec<RawDeal> = serde_json::from_str(json)?;
    DealNormalizer::new().normalize_batch(raws)
}
