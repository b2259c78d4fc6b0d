use crate::types::region_record::RegionRecord;
use crate::weather_data::aggregate::{records, DATE_COLUMN, GEOCODE_COLUMN};
use crate::weather_data::error::AggregationError;
use polars::prelude::*;

/// The daily table of one region for one source file.
///
/// Columns are `date` followed by the `_min`, `_med` and `_max` statistics of every
/// measure the file provided, one row per calendar day in ascending order.
#[derive(Debug, Clone)]
pub struct RegionTable {
    geocode: u32,
    frame: DataFrame,
}

impl RegionTable {
    pub fn new(geocode: u32, frame: DataFrame) -> Self {
        Self { geocode, frame }
    }

    pub fn geocode(&self) -> u32 {
        self.geocode
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Number of days covered.
    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// The table as typed rows.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError`] if the frame lacks a `date` column of type Date.
    pub fn records(&self) -> Result<Vec<RegionRecord>, AggregationError> {
        records(&self.frame, self.geocode)
    }

    /// The table with a `geocodigo` column inserted right after `date`.
    pub fn with_geocode_column(&self) -> LazyFrame {
        let mut exprs = vec![
            col(DATE_COLUMN),
            lit(self.geocode).alias(GEOCODE_COLUMN),
        ];
        exprs.extend(
            self.frame
                .get_column_names()
                .into_iter()
                .filter(|name| name.as_str() != DATE_COLUMN)
                .map(|name| col(name.as_str())),
        );
        self.frame.clone().lazy().select(exprs)
    }
}

impl PartialEq for RegionTable {
    fn eq(&self, other: &Self) -> bool {
        self.geocode == other.geocode && self.frame.equals_missing(&other.frame)
    }
}
