pub mod cds_request;
pub mod date_range;
pub mod download;
pub mod error;
