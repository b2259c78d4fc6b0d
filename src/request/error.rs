use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed error returned by a [`Retriever`](crate::Retriever) implementation.
pub type RetrievalError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum DateRangeError {
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDateFormat(String),

    #[error("Date {date} is too recent, the latest available date is {latest}")]
    DateTooRecent { date: NaiveDate, latest: NaiveDate },

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Date(#[from] DateRangeError),

    #[error("Could not determine a default data directory")]
    DataDirResolution,

    #[error("Failed to create data directory '{0}'")]
    DataDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Retrieval of '{file}' failed")]
    Retrieval {
        file: PathBuf,
        #[source]
        source: RetrievalError,
    },

    #[error("Retrieval reported success but '{0}' was not written")]
    MissingOutput(PathBuf),
}
