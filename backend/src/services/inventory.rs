//! Inventory intake service for purchase lots and their details

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::{Lot, LotDetail, LotStatus};
use shared::types::Pagination;

use crate::error::{AppError, AppResult};

/// Inventory service for receiving stock into lots
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
}

/// Input for creating a lot
#[derive(Debug, Deserialize)]
pub struct CreateLotInput {
    /// Caller-supplied code; generated from the lot sequence when absent
    pub code: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub received_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<NaiveDate>,
    pub status: Option<LotStatus>,
    pub total_cost: Decimal,
    pub notes: Option<String>,
}

/// Input for one lot detail line
#[derive(Debug, Deserialize)]
pub struct CreateLotDetailInput {
    pub presentation_id: Uuid,
    pub quantity_received: Decimal,
    pub unit_cost: Decimal,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

/// A lot together with its detail lines
#[derive(Debug, serde::Serialize)]
pub struct LotWithDetails {
    #[serde(flatten)]
    pub lot: Lot,
    pub details: Vec<LotDetail>,
}

type LotRow = (
    Uuid,
    String,
    Option<Uuid>,
    DateTime<Utc>,
    Option<NaiveDate>,
    String,
    Decimal,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

type LotDetailRow = (
    Uuid,
    Uuid,
    Uuid,
    Decimal,
    Decimal,
    Decimal,
    Option<String>,
    Option<NaiveDate>,
    DateTime<Utc>,
);

const LOT_COLUMNS: &str =
    "id, code, supplier_id, received_date, expiry_date, status, total_cost, notes, created_at, updated_at";

const LOT_DETAIL_COLUMNS: &str = "id, lot_id, presentation_id, quantity_received, \
     quantity_available, unit_cost, batch_number, expiry_date, created_at";

fn lot_from_row(row: LotRow) -> AppResult<Lot> {
    let status = LotStatus::from_str(&row.5)
        .ok_or_else(|| anyhow::anyhow!("unknown lot status in database: {}", row.5))?;
    Ok(Lot {
        id: row.0,
        code: row.1,
        supplier_id: row.2,
        received_date: row.3,
        expiry_date: row.4,
        status,
        total_cost: row.6,
        notes: row.7,
        created_at: row.8,
        updated_at: row.9,
    })
}

fn lot_detail_from_row(row: LotDetailRow) -> LotDetail {
    LotDetail {
        id: row.0,
        lot_id: row.1,
        presentation_id: row.2,
        quantity_received: row.3,
        quantity_available: row.4,
        unit_cost: row.5,
        batch_number: row.6,
        expiry_date: row.7,
        created_at: row.8,
    }
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Generate a unique lot code: LOT-YYYY-NNNN
    async fn generate_lot_code(
        &self,
        tx: &mut sqlx::PgConnection,
    ) -> AppResult<String> {
        let sequence: i64 = sqlx::query_scalar("SELECT nextval('lot_code_seq')")
            .fetch_one(tx)
            .await?;
        Ok(format!("LOT-{}-{:04}", Utc::now().year(), sequence))
    }

    /// Create an empty lot (receiving event); details are added afterwards
    pub async fn create_lot(&self, input: CreateLotInput) -> AppResult<Lot> {
        let mut tx = self.db.begin().await?;
        let lot = self.insert_lot(&mut tx, input).await?;
        tx.commit().await?;

        tracing::info!(lot_id = %lot.id, code = %lot.code, "lot created");
        Ok(lot)
    }

    /// Create a lot and all of its detail lines in one transaction
    pub async fn create_lot_with_details(
        &self,
        lot: CreateLotInput,
        details: Vec<CreateLotDetailInput>,
    ) -> AppResult<LotWithDetails> {
        if details.is_empty() {
            return Err(AppError::Validation {
                field: "details".to_string(),
                message: "A lot must include at least one detail line".to_string(),
                message_es: "El lote debe incluir al menos un detalle".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;
        let lot = self.insert_lot(&mut tx, lot).await?;

        let mut inserted = Vec::with_capacity(details.len());
        for detail in details {
            inserted.push(self.insert_lot_detail(&mut tx, lot.id, detail).await?);
        }
        tx.commit().await?;

        tracing::info!(lot_id = %lot.id, code = %lot.code, lines = inserted.len(), "lot received");
        Ok(LotWithDetails {
            lot,
            details: inserted,
        })
    }

    /// Add a detail line to an existing lot
    pub async fn create_lot_detail(
        &self,
        lot_id: Uuid,
        input: CreateLotDetailInput,
    ) -> AppResult<LotDetail> {
        let mut tx = self.db.begin().await?;

        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM lots WHERE id = $1)")
            .bind(lot_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(AppError::NotFound("Lot".to_string()));
        }

        let detail = self.insert_lot_detail(&mut tx, lot_id, input).await?;
        tx.commit().await?;
        Ok(detail)
    }

    async fn insert_lot(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        input: CreateLotInput,
    ) -> AppResult<Lot> {
        if input.total_cost < Decimal::ZERO {
            return Err(AppError::Validation {
                field: "total_cost".to_string(),
                message: "Total cost cannot be negative".to_string(),
                message_es: "El costo total no puede ser negativo".to_string(),
            });
        }

        let code = match input.code {
            Some(code) => code,
            None => self.generate_lot_code(&mut **tx).await?,
        };
        let received_date = input.received_date.unwrap_or_else(Utc::now);
        let status = input.status.unwrap_or(LotStatus::Received);

        let row = sqlx::query_as::<_, LotRow>(&format!(
            r#"
            INSERT INTO lots (code, supplier_id, received_date, expiry_date, status, total_cost, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {LOT_COLUMNS}
            "#,
        ))
        .bind(&code)
        .bind(input.supplier_id)
        .bind(received_date)
        .bind(input.expiry_date)
        .bind(status.as_str())
        .bind(input.total_cost)
        .bind(&input.notes)
        .fetch_one(&mut **tx)
        .await?;

        lot_from_row(row)
    }

    async fn insert_lot_detail(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        lot_id: Uuid,
        input: CreateLotDetailInput,
    ) -> AppResult<LotDetail> {
        if input.quantity_received <= Decimal::ZERO {
            return Err(AppError::Validation {
                field: "quantity_received".to_string(),
                message: "Received quantity must be greater than 0".to_string(),
                message_es: "La cantidad recibida debe ser mayor a 0".to_string(),
            });
        }
        if input.unit_cost < Decimal::ZERO {
            return Err(AppError::Validation {
                field: "unit_cost".to_string(),
                message: "Unit cost cannot be negative".to_string(),
                message_es: "El costo unitario no puede ser negativo".to_string(),
            });
        }

        let presentation_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM presentations WHERE id = $1)",
        )
        .bind(input.presentation_id)
        .fetch_one(&mut **tx)
        .await?;
        if !presentation_exists {
            return Err(AppError::NotFound("Presentation".to_string()));
        }

        // Available starts equal to received
        let row = sqlx::query_as::<_, LotDetailRow>(&format!(
            r#"
            INSERT INTO lot_details (lot_id, presentation_id, quantity_received,
                                     quantity_available, unit_cost, batch_number, expiry_date)
            VALUES ($1, $2, $3, $3, $4, $5, $6)
            RETURNING {LOT_DETAIL_COLUMNS}
            "#,
        ))
        .bind(lot_id)
        .bind(input.presentation_id)
        .bind(input.quantity_received)
        .bind(input.unit_cost)
        .bind(&input.batch_number)
        .bind(input.expiry_date)
        .fetch_one(&mut **tx)
        .await?;

        Ok(lot_detail_from_row(row))
    }

    /// Get a lot by ID
    pub async fn get_lot(&self, lot_id: Uuid) -> AppResult<Lot> {
        let row = sqlx::query_as::<_, LotRow>(&format!(
            "SELECT {LOT_COLUMNS} FROM lots WHERE id = $1"
        ))
        .bind(lot_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;

        lot_from_row(row)
    }

    /// List lots, newest received first
    pub async fn list_lots(&self, pagination: Pagination) -> AppResult<Vec<Lot>> {
        let rows = sqlx::query_as::<_, LotRow>(&format!(
            r#"
            SELECT {LOT_COLUMNS}
            FROM lots
            ORDER BY received_date DESC, created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        ))
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(lot_from_row).collect()
    }

    /// Get the detail lines of a lot
    pub async fn get_lot_details(&self, lot_id: Uuid) -> AppResult<Vec<LotDetail>> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM lots WHERE id = $1)")
            .bind(lot_id)
            .fetch_one(&self.db)
            .await?;
        if !exists {
            return Err(AppError::NotFound("Lot".to_string()));
        }

        let rows = sqlx::query_as::<_, LotDetailRow>(&format!(
            "SELECT {LOT_DETAIL_COLUMNS} FROM lot_details WHERE lot_id = $1 ORDER BY created_at ASC"
        ))
        .bind(lot_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(lot_detail_from_row).collect())
    }

    /// Lot details holding stock of a presentation, in FIFO order
    ///
    /// This is the read-only variant of the ordering the allocator locks;
    /// useful for inspection and reporting.
    pub async fn lot_details_by_presentation(
        &self,
        presentation_id: Uuid,
        available_only: bool,
    ) -> AppResult<Vec<LotDetail>> {
        let rows = sqlx::query_as::<_, LotDetailRow>(&format!(
            r#"
            SELECT ld.id, ld.lot_id, ld.presentation_id, ld.quantity_received,
                   ld.quantity_available, ld.unit_cost, ld.batch_number, ld.expiry_date, ld.created_at
            FROM lot_details ld
            JOIN lots l ON l.id = ld.lot_id
            WHERE ld.presentation_id = $1
              AND ($2 OR ld.quantity_available > 0)
            ORDER BY l.received_date ASC, ld.created_at ASC, ld.id ASC
            "#,
        ))
        .bind(presentation_id)
        .bind(!available_only)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(lot_detail_from_row).collect())
    }
}
