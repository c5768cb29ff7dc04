//! Domain models for the AgroStock platform

pub mod bulk;
pub mod lot;
pub mod presentation;
pub mod sale;

pub use bulk::*;
pub use lot::*;
pub use presentation::*;
pub use sale::*;
