//! Purchase lot models
//!
//! A lot is a single receiving event from a supplier. Lot details carry the
//! per-presentation quantities received within it; `quantity_available` is
//! the portion not yet sold or opened into bulk. Lots are audit records and
//! are never deleted.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A purchase lot (receiving event)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lot {
    pub id: Uuid,
    /// Human-readable lot code (e.g., "LOT-2026-0014")
    pub code: String,
    pub supplier_id: Option<Uuid>,
    pub received_date: DateTime<Utc>,
    pub expiry_date: Option<NaiveDate>,
    pub status: LotStatus,
    pub total_cost: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Status of a purchase lot
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LotStatus {
    Received,
    Pending,
    Completed,
}

impl LotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LotStatus::Received => "received",
            LotStatus::Pending => "pending",
            LotStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "received" => Some(LotStatus::Received),
            "pending" => Some(LotStatus::Pending),
            "completed" => Some(LotStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for LotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quantity of one presentation received within a lot
///
/// `quantity_received` is fixed at creation. `quantity_available` only
/// decreases (sales, bulk opening) except for cancellation restores, and
/// stays within `0..=quantity_received`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotDetail {
    pub id: Uuid,
    pub lot_id: Uuid,
    pub presentation_id: Uuid,
    pub quantity_received: Decimal,
    pub quantity_available: Decimal,
    pub unit_cost: Decimal,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}
