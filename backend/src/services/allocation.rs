//! Stock allocation for sales
//!
//! Decides which physical stock a requested quantity is drawn from:
//! packaged lot details first, FIFO by the owning lot's received date, then
//! active bulk conversions, oldest opened first. The allocator only plans;
//! applying the deductions is the sale commit's job, inside the same
//! transaction, so no second sale can allocate the same units between the
//! read and the write.

use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use shared::models::StockSource;

use crate::error::{AppError, AppResult};

/// A lockable stock row and its available quantity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockCandidate {
    pub id: Uuid,
    pub available: Decimal,
}

impl StockCandidate {
    pub fn new(id: Uuid, available: Decimal) -> Self {
        Self { id, available }
    }
}

/// One planned deduction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draw {
    pub source: StockSource,
    pub quantity: Decimal,
}

/// Ordered deduction plan for one requested quantity
#[derive(Debug, Clone)]
pub struct AllocationPlan {
    pub presentation_id: Uuid,
    pub requested: Decimal,
    pub draws: Vec<Draw>,
}

impl AllocationPlan {
    /// Sum of the planned draws; equals `requested` for any plan the
    /// allocator returns
    pub fn total(&self) -> Decimal {
        self.draws.iter().map(|d| d.quantity).sum()
    }
}

/// Plan draws against already-ordered candidates
///
/// `packaged` must be in FIFO order and `bulk` in conversion-date order;
/// packaged stock is always exhausted before bulk stock is touched. Returns
/// the draw list, or the total available quantity when it cannot cover
/// `requested`.
pub fn plan_draws(
    packaged: &[StockCandidate],
    bulk: &[StockCandidate],
    requested: Decimal,
) -> Result<Vec<Draw>, Decimal> {
    let available: Decimal = packaged
        .iter()
        .chain(bulk.iter())
        .map(|c| c.available)
        .sum();
    if available < requested {
        return Err(available);
    }

    let mut draws = Vec::new();
    let mut remaining = requested;

    for candidate in packaged {
        if remaining <= Decimal::ZERO {
            break;
        }
        if candidate.available <= Decimal::ZERO {
            continue;
        }
        let take = candidate.available.min(remaining);
        draws.push(Draw {
            source: StockSource::Packaged {
                lot_detail_id: candidate.id,
            },
            quantity: take,
        });
        remaining -= take;
    }

    for candidate in bulk {
        if remaining <= Decimal::ZERO {
            break;
        }
        if candidate.available <= Decimal::ZERO {
            continue;
        }
        let take = candidate.available.min(remaining);
        draws.push(Draw {
            source: StockSource::Bulk {
                bulk_conversion_id: candidate.id,
            },
            quantity: take,
        });
        remaining -= take;
    }

    Ok(draws)
}

/// Compute and lock an allocation plan inside the caller's transaction
///
/// Selects the candidate rows with `FOR UPDATE` so concurrent sales for the
/// same presentation serialize on them. Does not mutate any row.
pub async fn allocate(
    tx: &mut PgConnection,
    presentation_id: Uuid,
    quantity: Decimal,
) -> AppResult<AllocationPlan> {
    if quantity <= Decimal::ZERO {
        return Err(AppError::Validation {
            field: "quantity".to_string(),
            message: "Quantity must be greater than 0".to_string(),
            message_es: "La cantidad debe ser mayor a 0".to_string(),
        });
    }

    // Packaged stock, oldest received lot first
    let packaged: Vec<StockCandidate> = sqlx::query_as::<_, (Uuid, Decimal)>(
        r#"
        SELECT ld.id, ld.quantity_available
        FROM lot_details ld
        JOIN lots l ON l.id = ld.lot_id
        WHERE ld.presentation_id = $1 AND ld.quantity_available > 0
        ORDER BY l.received_date ASC, ld.created_at ASC, ld.id ASC
        FOR UPDATE OF ld
        "#,
    )
    .bind(presentation_id)
    .fetch_all(&mut *tx)
    .await?
    .into_iter()
    .map(|(id, available)| StockCandidate::new(id, available))
    .collect();

    // Loose stock from active conversions, oldest opened first
    let bulk: Vec<StockCandidate> = sqlx::query_as::<_, (Uuid, Decimal)>(
        r#"
        SELECT id, remaining_bulk
        FROM bulk_conversions
        WHERE target_presentation_id = $1 AND status = 'ACTIVE' AND remaining_bulk > 0
        ORDER BY conversion_date ASC, id ASC
        FOR UPDATE
        "#,
    )
    .bind(presentation_id)
    .fetch_all(&mut *tx)
    .await?
    .into_iter()
    .map(|(id, available)| StockCandidate::new(id, available))
    .collect();

    let draws = plan_draws(&packaged, &bulk, quantity).map_err(|available| {
        AppError::InsufficientStock {
            presentation_id,
            available,
            requested: quantity,
        }
    })?;

    Ok(AllocationPlan {
        presentation_id,
        requested: quantity,
        draws,
    })
}
