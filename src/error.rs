use crate::grid::error::GridError;
use crate::regions::error::RegionError;
use crate::request::error::{DateRangeError, DownloadError};
use crate::weather_data::error::AggregationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReanalysisError {
    #[error(transparent)]
    Region(#[from] RegionError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error(transparent)]
    DateRange(#[from] DateRangeError),

    #[error(transparent)]
    Download(#[from] DownloadError),
}
