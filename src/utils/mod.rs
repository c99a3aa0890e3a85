//! Utility modules

pub mod amount;
pub mod memory_storage;

pub use amount::{parse_decimal, to_minor_units};
pub use memory_storage::{MemoryLedger, MemoryStorage};
