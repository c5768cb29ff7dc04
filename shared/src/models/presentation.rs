//! Product presentation models
//!
//! A presentation is the sellable unit of a product (e.g., "20kg bag",
//! "per kg loose"). Catalog management lives outside this system; the
//! engine only references presentations by id and reads them for reports.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A sellable unit/packaging variant of a product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Presentation {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    /// Unit of measure ("bag", "kg", "unit")
    pub unit: String,
    /// Current list price per unit
    pub price: Decimal,
    pub sku: Option<String>,
    pub active: bool,
}
