pub mod aggregate;
pub mod error;
pub mod result_cache;
pub mod units;
