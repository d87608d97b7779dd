//! Shared data structures for poultry batch monitoring
//!
//! - `records`: farm records fetched from the record repository
//! - `series`: chart-ready buckets, curves and summary statistics

mod records;
mod series;

pub use records::*;
pub use series::*;
