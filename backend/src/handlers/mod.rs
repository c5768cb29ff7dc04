//! HTTP handlers for the AgroStock backend

pub mod bulk;
pub mod health;
pub mod inventory;
pub mod sales;
pub mod stock;

pub use bulk::*;
pub use health::*;
pub use inventory::*;
pub use sales::*;
pub use stock::*;
