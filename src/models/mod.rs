//! Data structures for the application.
//!
//! Includes structs for:
//! - Deserializing pollution API responses (auth + paginated listings).
//! - Domain types flowing through the aggregation pipeline.
//! - The cached `Report` envelope served to presentation layers.

mod pollution;

pub use pollution::*;
