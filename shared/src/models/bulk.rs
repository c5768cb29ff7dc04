//! Bulk conversion models
//!
//! Opening a bulk conversion consumes whole packaged units from a lot detail
//! and re-exposes their content as loose stock under a target presentation
//! (e.g., a 20kg feed bag opened and sold by the kilogram).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Packaged units opened into loose sellable stock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkConversion {
    pub id: Uuid,
    pub source_lot_detail_id: Uuid,
    pub target_presentation_id: Uuid,
    /// Number of packaged units opened (not the resulting bulk amount)
    pub converted_quantity: Decimal,
    pub remaining_bulk: Decimal,
    pub conversion_date: DateTime<Utc>,
    pub status: BulkStatus,
}

/// Lifecycle of a bulk conversion
///
/// Stored as uppercase strings for compatibility with the legacy data.
/// `Depleted` is the legacy emptied marker; the commit engine writes
/// `Completed`, cancellation restores either back to `Active`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum BulkStatus {
    Active,
    Completed,
    Depleted,
}

impl BulkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkStatus::Active => "ACTIVE",
            BulkStatus::Completed => "COMPLETED",
            BulkStatus::Depleted => "DEPLETED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(BulkStatus::Active),
            "COMPLETED" => Some(BulkStatus::Completed),
            "DEPLETED" => Some(BulkStatus::Depleted),
            _ => None,
        }
    }

    /// Whether stock can still be drawn from the conversion
    pub fn is_sellable(&self) -> bool {
        matches!(self, BulkStatus::Active)
    }
}

impl std::fmt::Display for BulkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_status_round_trip() {
        for status in [BulkStatus::Active, BulkStatus::Completed, BulkStatus::Depleted] {
            assert_eq!(BulkStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(BulkStatus::from_str("active"), None);
    }

    #[test]
    fn test_only_active_is_sellable() {
        assert!(BulkStatus::Active.is_sellable());
        assert!(!BulkStatus::Completed.is_sellable());
        assert!(!BulkStatus::Depleted.is_sellable());
    }
}
