//! Bulk opening service
//!
//! Opens whole packaged units from a lot detail into loose stock sellable
//! under a different presentation, e.g. 25kg feed bags opened and sold by
//! the kilogram.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::{BulkConversion, BulkStatus};
use shared::types::Pagination;
use shared::validation;

use crate::error::{AppError, AppResult};

/// Bulk conversion service
#[derive(Clone)]
pub struct BulkConversionService {
    db: PgPool,
}

/// Input for opening packaged units into bulk
#[derive(Debug, Deserialize)]
pub struct OpenBulkInput {
    pub source_lot_detail_id: Uuid,
    pub target_presentation_id: Uuid,
    /// Whole packaged units to open
    pub units_to_open: Decimal,
    /// Loose quantity yielded per packaged unit
    pub conversion_factor: Decimal,
}

type ConversionRow = (
    Uuid,
    Uuid,
    Uuid,
    Decimal,
    Decimal,
    DateTime<Utc>,
    String,
);

const CONVERSION_COLUMNS: &str = "id, source_lot_detail_id, target_presentation_id, \
     converted_quantity, remaining_bulk, conversion_date, status";

fn conversion_from_row(row: ConversionRow) -> AppResult<BulkConversion> {
    let status = BulkStatus::from_str(&row.6)
        .ok_or_else(|| anyhow::anyhow!("unknown bulk conversion status in database: {}", row.6))?;
    Ok(BulkConversion {
        id: row.0,
        source_lot_detail_id: row.1,
        target_presentation_id: row.2,
        converted_quantity: row.3,
        remaining_bulk: row.4,
        conversion_date: row.5,
        status,
    })
}

impl BulkConversionService {
    /// Create a new BulkConversionService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Open packaged units into an active bulk conversion
    ///
    /// Decrements the source lot detail by the number of units opened and
    /// records the resulting loose quantity. The source row is locked so a
    /// concurrent sale cannot take the same units.
    pub async fn open_bulk(&self, input: OpenBulkInput) -> AppResult<BulkConversion> {
        if validation::validate_units_to_open(input.units_to_open).is_err() {
            return Err(AppError::Validation {
                field: "units_to_open".to_string(),
                message: "Units to open must be greater than 0".to_string(),
                message_es: "Las unidades a abrir deben ser mayores a 0".to_string(),
            });
        }
        // The source decrement is stored at 3 decimal places; a finer
        // value would round away part of the opened units
        if validation::validate_quantity_scale(input.units_to_open).is_err() {
            return Err(AppError::Validation {
                field: "units_to_open".to_string(),
                message: "Units to open cannot have more than 3 decimal places".to_string(),
                message_es: "Las unidades a abrir no pueden tener más de 3 decimales".to_string(),
            });
        }
        if validation::validate_conversion_factor(input.conversion_factor).is_err() {
            return Err(AppError::Validation {
                field: "conversion_factor".to_string(),
                message: "Conversion factor must be greater than 0".to_string(),
                message_es: "El factor de conversión debe ser mayor a 0".to_string(),
            });
        }
        if validation::validate_quantity_scale(input.conversion_factor).is_err() {
            return Err(AppError::Validation {
                field: "conversion_factor".to_string(),
                message: "Conversion factor cannot have more than 3 decimal places".to_string(),
                message_es: "El factor de conversión no puede tener más de 3 decimales".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;

        let target_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM presentations WHERE id = $1)",
        )
        .bind(input.target_presentation_id)
        .fetch_one(&mut *tx)
        .await?;
        if !target_exists {
            return Err(AppError::NotFound("Presentation".to_string()));
        }

        let row = sqlx::query_as::<_, (Uuid, Decimal)>(
            "SELECT presentation_id, quantity_available FROM lot_details WHERE id = $1 FOR UPDATE",
        )
        .bind(input.source_lot_detail_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Lot detail".to_string()))?;

        let (source_presentation_id, available) = row;
        if available < input.units_to_open {
            return Err(AppError::InsufficientStock {
                presentation_id: source_presentation_id,
                available,
                requested: input.units_to_open,
            });
        }

        // The source loses whole units; the yield lives on the conversion
        sqlx::query(
            "UPDATE lot_details SET quantity_available = quantity_available - $1 WHERE id = $2",
        )
        .bind(input.units_to_open)
        .bind(input.source_lot_detail_id)
        .execute(&mut *tx)
        .await?;

        let bulk_quantity = validation::bulk_quantity(input.units_to_open, input.conversion_factor);

        let conversion_row = sqlx::query_as::<_, ConversionRow>(&format!(
            r#"
            INSERT INTO bulk_conversions (source_lot_detail_id, target_presentation_id,
                                          converted_quantity, remaining_bulk, conversion_date, status)
            VALUES ($1, $2, $3, $4, $5, 'ACTIVE')
            RETURNING {CONVERSION_COLUMNS}
            "#,
        ))
        .bind(input.source_lot_detail_id)
        .bind(input.target_presentation_id)
        .bind(input.units_to_open)
        .bind(bulk_quantity)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let conversion = conversion_from_row(conversion_row)?;
        tracing::info!(
            conversion_id = %conversion.id,
            units = %conversion.converted_quantity,
            yielded = %conversion.remaining_bulk,
            "bulk conversion opened"
        );
        Ok(conversion)
    }

    /// Get a bulk conversion by ID
    pub async fn get_conversion(&self, conversion_id: Uuid) -> AppResult<BulkConversion> {
        let row = sqlx::query_as::<_, ConversionRow>(&format!(
            "SELECT {CONVERSION_COLUMNS} FROM bulk_conversions WHERE id = $1"
        ))
        .bind(conversion_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Bulk conversion".to_string()))?;

        conversion_from_row(row)
    }

    /// List conversions, optionally only the sellable ones or those
    /// feeding one target presentation
    pub async fn list_conversions(
        &self,
        active_only: bool,
        target_presentation_id: Option<Uuid>,
        pagination: Pagination,
    ) -> AppResult<Vec<BulkConversion>> {
        let rows = sqlx::query_as::<_, ConversionRow>(&format!(
            r#"
            SELECT {CONVERSION_COLUMNS}
            FROM bulk_conversions
            WHERE ($1 OR status = 'ACTIVE')
              AND ($2::uuid IS NULL OR target_presentation_id = $2)
            ORDER BY conversion_date DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        ))
        .bind(!active_only)
        .bind(target_presentation_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(conversion_from_row).collect()
    }
}
