use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),

    #[error("Row {0} of the daily table has no date")]
    MissingDate(usize),
}
