//! Sale models
//!
//! A sale is one customer transaction with one or more lines. Every line is
//! traceable to the physical stock it was drawn from via [`StockSource`].
//! Sales are retained for audit; cancellation flips the status only.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A customer sale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: Uuid,
    /// Unique, time-derived code (e.g., "VEN-20260827143015-0042")
    pub code: String,
    pub sale_date: DateTime<Utc>,
    pub customer_id: Uuid,
    /// Seller (user) who registered the sale
    pub user_id: Uuid,
    /// Sum of line totals, computed at commit time
    pub total: Decimal,
    pub status: SaleStatus,
    pub notes: Option<String>,
}

/// Status of a sale
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    #[default]
    Completed,
    Cancelled,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Completed => "completed",
            SaleStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(SaleStatus::Completed),
            "cancelled" => Some(SaleStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical source a sale line was drawn from
///
/// Exactly one source per line. Persisted as two nullable foreign keys
/// (`lot_detail_id`, `bulk_conversion_id`) with a CHECK that one is set;
/// in code the sum type makes the "exactly one" invariant unrepresentable
/// to violate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StockSource {
    /// Packaged stock from a lot detail
    Packaged { lot_detail_id: Uuid },
    /// Loose stock from an opened bulk conversion
    Bulk { bulk_conversion_id: Uuid },
}

/// Failure to reconstruct a [`StockSource`] from its column pair
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StockSourceError {
    #[error("sale line references neither a lot detail nor a bulk conversion")]
    Missing,
    #[error("sale line references both a lot detail and a bulk conversion")]
    Ambiguous,
}

impl StockSource {
    /// Rebuild the source from the nullable column pair
    pub fn from_columns(
        lot_detail_id: Option<Uuid>,
        bulk_conversion_id: Option<Uuid>,
    ) -> Result<Self, StockSourceError> {
        match (lot_detail_id, bulk_conversion_id) {
            (Some(id), None) => Ok(StockSource::Packaged { lot_detail_id: id }),
            (None, Some(id)) => Ok(StockSource::Bulk {
                bulk_conversion_id: id,
            }),
            (None, None) => Err(StockSourceError::Missing),
            (Some(_), Some(_)) => Err(StockSourceError::Ambiguous),
        }
    }

    /// Column pair for persistence
    pub fn to_columns(&self) -> (Option<Uuid>, Option<Uuid>) {
        match self {
            StockSource::Packaged { lot_detail_id } => (Some(*lot_detail_id), None),
            StockSource::Bulk { bulk_conversion_id } => (None, Some(*bulk_conversion_id)),
        }
    }

    pub fn lot_detail_id(&self) -> Option<Uuid> {
        self.to_columns().0
    }

    pub fn bulk_conversion_id(&self) -> Option<Uuid> {
        self.to_columns().1
    }
}

/// One line of a sale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleDetail {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub presentation_id: Uuid,
    pub source: StockSource,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// `quantity * unit_price`, fixed at creation
    pub line_total: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_from_columns_exactly_one() {
        let id = Uuid::new_v4();
        assert_eq!(
            StockSource::from_columns(Some(id), None),
            Ok(StockSource::Packaged { lot_detail_id: id })
        );
        assert_eq!(
            StockSource::from_columns(None, Some(id)),
            Ok(StockSource::Bulk {
                bulk_conversion_id: id
            })
        );
        assert_eq!(
            StockSource::from_columns(None, None),
            Err(StockSourceError::Missing)
        );
        assert_eq!(
            StockSource::from_columns(Some(id), Some(id)),
            Err(StockSourceError::Ambiguous)
        );
    }

    #[test]
    fn test_source_column_round_trip() {
        let id = Uuid::new_v4();
        for source in [
            StockSource::Packaged { lot_detail_id: id },
            StockSource::Bulk {
                bulk_conversion_id: id,
            },
        ] {
            let (ld, bc) = source.to_columns();
            assert_eq!(StockSource::from_columns(ld, bc), Ok(source));
        }
    }
}
