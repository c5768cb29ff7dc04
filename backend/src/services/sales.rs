//! Sale commit and cancellation engine
//!
//! A sale is committed as one transaction: allocation, stock deductions,
//! the sale row and its lines all land together or not at all. Cancellation
//! reverses a committed sale by restoring every drawn quantity to the lot
//! detail or bulk conversion it came from.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::{Sale, SaleDetail, SaleStatus, StockSource};
use shared::types::Pagination;
use shared::validation;

use crate::error::{AppError, AppResult};
use crate::services::allocation;

/// Sales service for committing and cancelling customer sales
#[derive(Clone)]
pub struct SalesService {
    db: PgPool,
}

/// One requested sale line
#[derive(Debug, Deserialize)]
pub struct SaleItemInput {
    pub presentation_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// Input for creating a sale
#[derive(Debug, Deserialize)]
pub struct CreateSaleInput {
    pub customer_id: Uuid,
    /// Seller registering the sale
    pub user_id: Uuid,
    pub status: Option<SaleStatus>,
    pub notes: Option<String>,
    pub items: Vec<SaleItemInput>,
}

/// A sale together with its lines
#[derive(Debug, Serialize)]
pub struct SaleWithDetails {
    #[serde(flatten)]
    pub sale: Sale,
    pub details: Vec<SaleDetail>,
}

/// Optional filters for listing sales
#[derive(Debug, Default, Deserialize)]
pub struct SaleFilter {
    pub customer_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

type SaleRow = (
    Uuid,
    String,
    DateTime<Utc>,
    Uuid,
    Uuid,
    Decimal,
    String,
    Option<String>,
);

type SaleDetailRow = (
    Uuid,
    Uuid,
    Uuid,
    Option<Uuid>,
    Option<Uuid>,
    Decimal,
    Decimal,
    Decimal,
);

const SALE_COLUMNS: &str = "id, code, sale_date, customer_id, user_id, total, status, notes";

const SALE_DETAIL_COLUMNS: &str =
    "id, sale_id, presentation_id, lot_detail_id, bulk_conversion_id, quantity, unit_price, line_total";

fn sale_from_row(row: SaleRow) -> AppResult<Sale> {
    let status = SaleStatus::from_str(&row.6)
        .ok_or_else(|| anyhow::anyhow!("unknown sale status in database: {}", row.6))?;
    Ok(Sale {
        id: row.0,
        code: row.1,
        sale_date: row.2,
        customer_id: row.3,
        user_id: row.4,
        total: row.5,
        status,
        notes: row.7,
    })
}

fn sale_detail_from_row(row: SaleDetailRow) -> AppResult<SaleDetail> {
    let source = StockSource::from_columns(row.3, row.4).map_err(anyhow::Error::from)?;
    Ok(SaleDetail {
        id: row.0,
        sale_id: row.1,
        presentation_id: row.2,
        source,
        quantity: row.5,
        unit_price: row.6,
        line_total: row.7,
    })
}

impl SalesService {
    /// Create a new SalesService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Generate a unique sale code: VEN-<timestamp>-<sequence>
    ///
    /// The timestamp alone collides under concurrent same-second sales, so
    /// a database sequence disambiguates; the UNIQUE constraint on
    /// `sales.code` is the final backstop.
    async fn generate_sale_code(&self, tx: &mut sqlx::PgConnection) -> AppResult<String> {
        let sequence: i64 = sqlx::query_scalar("SELECT nextval('sale_code_seq')")
            .fetch_one(tx)
            .await?;
        Ok(format!(
            "VEN-{}-{:04}",
            Utc::now().format("%Y%m%d%H%M%S"),
            sequence
        ))
    }

    fn validate_items(items: &[SaleItemInput]) -> AppResult<()> {
        if items.is_empty() {
            return Err(AppError::Validation {
                field: "items".to_string(),
                message: "A sale must include at least one item".to_string(),
                message_es: "La venta debe incluir al menos un artículo".to_string(),
            });
        }
        for item in items {
            if validation::validate_positive_quantity(item.quantity).is_err() {
                return Err(AppError::Validation {
                    field: "quantity".to_string(),
                    message: "Quantity must be greater than 0".to_string(),
                    message_es: "La cantidad debe ser mayor a 0".to_string(),
                });
            }
            // Finer than the stored scale would let the deduction round
            // away while the sale line still records a movement
            if validation::validate_quantity_scale(item.quantity).is_err() {
                return Err(AppError::Validation {
                    field: "quantity".to_string(),
                    message: "Quantity cannot have more than 3 decimal places".to_string(),
                    message_es: "La cantidad no puede tener más de 3 decimales".to_string(),
                });
            }
            if validation::validate_positive_price(item.unit_price).is_err() {
                return Err(AppError::Validation {
                    field: "unit_price".to_string(),
                    message: "Unit price must be greater than 0".to_string(),
                    message_es: "El precio unitario debe ser mayor a 0".to_string(),
                });
            }
            if validation::validate_price_scale(item.unit_price).is_err() {
                return Err(AppError::Validation {
                    field: "unit_price".to_string(),
                    message: "Unit price cannot have more than 2 decimal places".to_string(),
                    message_es: "El precio unitario no puede tener más de 2 decimales".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Commit a multi-line sale
    ///
    /// All lines are allocated and applied inside one transaction; if any
    /// line cannot be satisfied the whole sale is rolled back and no row or
    /// stock change survives.
    pub async fn create_sale(&self, input: CreateSaleInput) -> AppResult<SaleWithDetails> {
        Self::validate_items(&input.items)?;

        let mut tx = self.db.begin().await?;

        let customer_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM customers WHERE id = $1)")
                .bind(input.customer_id)
                .fetch_one(&mut *tx)
                .await?;
        if !customer_exists {
            return Err(AppError::NotFound("Customer".to_string()));
        }

        let seller_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(input.user_id)
                .fetch_one(&mut *tx)
                .await?;
        if !seller_exists {
            return Err(AppError::NotFound("Seller".to_string()));
        }

        let code = self.generate_sale_code(&mut tx).await?;
        let status = input.status.unwrap_or_default();

        let sale_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO sales (code, sale_date, customer_id, user_id, total, status, notes)
            VALUES ($1, $2, $3, $4, 0, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&code)
        .bind(Utc::now())
        .bind(input.customer_id)
        .bind(input.user_id)
        .bind(status.as_str())
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        let mut details = Vec::new();
        let mut total = Decimal::ZERO;

        for item in &input.items {
            // Allocation and deduction share this transaction and lock
            // scope; a concurrent sale cannot take the same units.
            let plan = allocation::allocate(&mut tx, item.presentation_id, item.quantity).await?;

            for draw in &plan.draws {
                self.apply_deduction(&mut tx, draw).await?;

                let line_total = validation::line_total(draw.quantity, item.unit_price);
                let (lot_detail_id, bulk_conversion_id) = draw.source.to_columns();

                let row = sqlx::query_as::<_, SaleDetailRow>(&format!(
                    r#"
                    INSERT INTO sale_details (sale_id, presentation_id, lot_detail_id,
                                              bulk_conversion_id, quantity, unit_price, line_total)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    RETURNING {SALE_DETAIL_COLUMNS}
                    "#,
                ))
                .bind(sale_id)
                .bind(item.presentation_id)
                .bind(lot_detail_id)
                .bind(bulk_conversion_id)
                .bind(draw.quantity)
                .bind(item.unit_price)
                .bind(line_total)
                .fetch_one(&mut *tx)
                .await?;

                // Sum what the column actually holds, not the pre-insert
                // value, so the total stays the sum of the stored lines
                let detail = sale_detail_from_row(row)?;
                total += detail.line_total;
                details.push(detail);
            }
        }

        let sale_row = sqlx::query_as::<_, SaleRow>(&format!(
            "UPDATE sales SET total = $1 WHERE id = $2 RETURNING {SALE_COLUMNS}"
        ))
        .bind(total)
        .bind(sale_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let sale = sale_from_row(sale_row)?;
        tracing::info!(sale_id = %sale.id, code = %sale.code, total = %sale.total, "sale committed");
        Ok(SaleWithDetails { sale, details })
    }

    async fn apply_deduction(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        draw: &allocation::Draw,
    ) -> AppResult<()> {
        match draw.source {
            StockSource::Packaged { lot_detail_id } => {
                sqlx::query(
                    "UPDATE lot_details SET quantity_available = quantity_available - $1 WHERE id = $2",
                )
                .bind(draw.quantity)
                .bind(lot_detail_id)
                .execute(&mut **tx)
                .await?;
            }
            StockSource::Bulk { bulk_conversion_id } => {
                // Mark the conversion finished the moment it empties
                sqlx::query(
                    r#"
                    UPDATE bulk_conversions
                    SET remaining_bulk = remaining_bulk - $1,
                        status = CASE WHEN remaining_bulk - $1 <= 0 THEN 'COMPLETED' ELSE status END
                    WHERE id = $2
                    "#,
                )
                .bind(draw.quantity)
                .bind(bulk_conversion_id)
                .execute(&mut **tx)
                .await?;
            }
        }
        Ok(())
    }

    /// Cancel a committed sale, restoring all drawn stock
    ///
    /// Rejected with `InvalidState` when the sale is already cancelled so a
    /// repeated call can never restore stock twice. The sale and its lines
    /// are kept for audit.
    pub async fn cancel_sale(&self, sale_id: Uuid) -> AppResult<Sale> {
        let mut tx = self.db.begin().await?;

        let sale_row = sqlx::query_as::<_, SaleRow>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = $1 FOR UPDATE"
        ))
        .bind(sale_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        let sale = sale_from_row(sale_row)?;
        if sale.status == SaleStatus::Cancelled {
            return Err(AppError::InvalidState(
                "Sale is already cancelled".to_string(),
            ));
        }

        let detail_rows = sqlx::query_as::<_, SaleDetailRow>(&format!(
            "SELECT {SALE_DETAIL_COLUMNS} FROM sale_details WHERE sale_id = $1"
        ))
        .bind(sale_id)
        .fetch_all(&mut *tx)
        .await?;

        for row in detail_rows {
            let detail = sale_detail_from_row(row)?;
            self.restore_stock(&mut tx, &detail).await?;
        }

        let cancelled_row = sqlx::query_as::<_, SaleRow>(&format!(
            "UPDATE sales SET status = 'cancelled' WHERE id = $1 RETURNING {SALE_COLUMNS}"
        ))
        .bind(sale_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let cancelled = sale_from_row(cancelled_row)?;
        tracing::info!(sale_id = %cancelled.id, code = %cancelled.code, "sale cancelled");
        Ok(cancelled)
    }

    async fn restore_stock(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        detail: &SaleDetail,
    ) -> AppResult<()> {
        match detail.source {
            StockSource::Packaged { lot_detail_id } => {
                let (available, received) = sqlx::query_as::<_, (Decimal, Decimal)>(
                    "SELECT quantity_available, quantity_received FROM lot_details WHERE id = $1 FOR UPDATE",
                )
                .bind(lot_detail_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or_else(|| anyhow::anyhow!("sale line references missing lot detail {lot_detail_id}"))?;

                // A restore past quantity_received means the books were
                // already wrong; surface it instead of clamping.
                if validation::validate_restore_within_received(available, detail.quantity, received)
                    .is_err()
                {
                    return Err(AppError::InvalidState(format!(
                        "Restoring {} to lot detail {} would exceed the received quantity {}",
                        detail.quantity, lot_detail_id, received
                    )));
                }

                sqlx::query(
                    "UPDATE lot_details SET quantity_available = quantity_available + $1 WHERE id = $2",
                )
                .bind(detail.quantity)
                .bind(lot_detail_id)
                .execute(&mut **tx)
                .await?;
            }
            StockSource::Bulk { bulk_conversion_id } => {
                // An emptied conversion becomes sellable again
                let updated = sqlx::query(
                    r#"
                    UPDATE bulk_conversions
                    SET remaining_bulk = remaining_bulk + $1, status = 'ACTIVE'
                    WHERE id = $2
                    "#,
                )
                .bind(detail.quantity)
                .bind(bulk_conversion_id)
                .execute(&mut **tx)
                .await?;
                if updated.rows_affected() == 0 {
                    return Err(anyhow::anyhow!(
                        "sale line references missing bulk conversion {bulk_conversion_id}"
                    )
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Get a sale with its lines
    pub async fn get_sale(&self, sale_id: Uuid) -> AppResult<SaleWithDetails> {
        let row = sqlx::query_as::<_, SaleRow>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = $1"
        ))
        .bind(sale_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        let sale = sale_from_row(row)?;
        let details = self.get_sale_details(sale_id).await?;
        Ok(SaleWithDetails { sale, details })
    }

    /// Get a sale by its code
    pub async fn get_sale_by_code(&self, code: &str) -> AppResult<SaleWithDetails> {
        let row = sqlx::query_as::<_, SaleRow>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        let sale = sale_from_row(row)?;
        let details = self.get_sale_details(sale.id).await?;
        Ok(SaleWithDetails { sale, details })
    }

    /// Lines of a sale
    pub async fn get_sale_details(&self, sale_id: Uuid) -> AppResult<Vec<SaleDetail>> {
        let rows = sqlx::query_as::<_, SaleDetailRow>(&format!(
            "SELECT {SALE_DETAIL_COLUMNS} FROM sale_details WHERE sale_id = $1 ORDER BY id ASC"
        ))
        .bind(sale_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(sale_detail_from_row).collect()
    }

    /// List sales, newest first, with optional filters
    pub async fn list_sales(
        &self,
        filter: SaleFilter,
        pagination: Pagination,
    ) -> AppResult<Vec<Sale>> {
        let rows = sqlx::query_as::<_, SaleRow>(&format!(
            r#"
            SELECT {SALE_COLUMNS}
            FROM sales
            WHERE ($1::uuid IS NULL OR customer_id = $1)
              AND ($2::uuid IS NULL OR user_id = $2)
              AND ($3::timestamptz IS NULL OR sale_date >= $3)
              AND ($4::timestamptz IS NULL OR sale_date <= $4)
            ORDER BY sale_date DESC
            LIMIT $5 OFFSET $6
            "#,
        ))
        .bind(filter.customer_id)
        .bind(filter.user_id)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(sale_from_row).collect()
    }
}
