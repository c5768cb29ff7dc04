//! Business logic services for the AgroStock platform

pub mod allocation;
pub mod bulk;
pub mod inventory;
pub mod sales;
pub mod stock;

pub use bulk::BulkConversionService;
pub use inventory::InventoryService;
pub use sales::SalesService;
pub use stock::StockReportService;
