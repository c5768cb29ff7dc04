//! Stock reporting
//!
//! Read-only views of available stock: packaged quantities in lot details
//! plus loose quantities in active bulk conversions.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Stock report service
#[derive(Clone)]
pub struct StockReportService {
    db: PgPool,
}

/// Available stock of one presentation, split by where it sits
#[derive(Debug, Serialize)]
pub struct StockReportRow {
    pub presentation_id: Uuid,
    pub presentation_name: String,
    pub packaged_available: Decimal,
    pub bulk_available: Decimal,
    pub total_available: Decimal,
}

impl StockReportService {
    /// Create a new StockReportService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Total sellable quantity of one presentation
    ///
    /// Uncommitted sales hold row locks, not deductions, so this reads the
    /// quantities committed sales have left behind.
    pub async fn available_for(&self, presentation_id: Uuid) -> AppResult<Decimal> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM presentations WHERE id = $1)",
        )
        .bind(presentation_id)
        .fetch_one(&self.db)
        .await?;
        if !exists {
            return Err(AppError::NotFound("Presentation".to_string()));
        }

        let (packaged, bulk) = sqlx::query_as::<_, (Decimal, Decimal)>(
            r#"
            SELECT
                COALESCE((SELECT SUM(quantity_available) FROM lot_details
                          WHERE presentation_id = $1), 0),
                COALESCE((SELECT SUM(remaining_bulk) FROM bulk_conversions
                          WHERE target_presentation_id = $1 AND status = 'ACTIVE'), 0)
            "#,
        )
        .bind(presentation_id)
        .fetch_one(&self.db)
        .await?;

        Ok(packaged + bulk)
    }

    /// Stock report across all active presentations
    pub async fn report(&self) -> AppResult<Vec<StockReportRow>> {
        let rows = sqlx::query_as::<_, (Uuid, String, Decimal, Decimal)>(
            r#"
            SELECT
                p.id,
                p.name,
                COALESCE((SELECT SUM(ld.quantity_available) FROM lot_details ld
                          WHERE ld.presentation_id = p.id), 0) AS packaged,
                COALESCE((SELECT SUM(bc.remaining_bulk) FROM bulk_conversions bc
                          WHERE bc.target_presentation_id = p.id
                            AND bc.status = 'ACTIVE'), 0) AS bulk
            FROM presentations p
            WHERE p.active
            ORDER BY p.name ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(presentation_id, presentation_name, packaged, bulk)| StockReportRow {
                    presentation_id,
                    presentation_name,
                    packaged_available: packaged,
                    bulk_available: bulk,
                    total_available: packaged + bulk,
                },
            )
            .collect())
    }
}
