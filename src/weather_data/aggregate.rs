//! Reduction of converted sub-daily series into daily min / mean / max tables.

use crate::types::region_record::RegionRecord;
use crate::types::variable::Measure;
use crate::weather_data::error::AggregationError;
use crate::weather_data::units::ConvertedSeries;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::collections::BTreeSet;

pub const DATE_COLUMN: &str = "date";
pub const TIME_COLUMN: &str = "time";
pub const GEOCODE_COLUMN: &str = "geocodigo";

/// Groups `series` by UTC calendar day and computes `<measure>_min`, `<measure>_med`
/// (arithmetic mean) and `<measure>_max` for every present measure.
///
/// Days are whatever the timestamps cover: a file that starts mid-day yields a
/// partial first day, summarized from the samples it has. Rows are sorted by date
/// and columns follow [`Measure`] order after `date`.
///
/// # Errors
///
/// Returns [`AggregationError::DataFrameProcessing`] if the grouping fails.
pub fn aggregate_daily(series: &ConvertedSeries) -> Result<DataFrame, AggregationError> {
    let dates: Vec<NaiveDate> = series.times().iter().map(NaiveDateTime::date).collect();

    let mut columns = vec![Column::new(DATE_COLUMN.into(), dates.as_slice())];
    let mut aggs = Vec::new();
    for (measure, values) in series.iter() {
        let name = measure.column_name();
        columns.push(Column::new(name.into(), values));
        let [min, med, max] = measure.daily_columns();
        aggs.push(col(name).min().alias(min));
        aggs.push(col(name).mean().alias(med));
        aggs.push(col(name).max().alias(max));
    }

    if aggs.is_empty() {
        let days: Vec<NaiveDate> = dates.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        return Ok(DataFrame::new(vec![Column::new(DATE_COLUMN.into(), days)])?);
    }

    let frame = DataFrame::new(columns)?
        .lazy()
        .group_by_stable([col(DATE_COLUMN)])
        .agg(aggs)
        .sort([DATE_COLUMN], SortMultipleOptions::default())
        .collect()?;
    Ok(frame)
}

/// The converted series as a table, one row per source timestamp.
pub fn sub_daily_frame(series: &ConvertedSeries) -> Result<DataFrame, AggregationError> {
    let mut columns = vec![Column::new(TIME_COLUMN.into(), series.times())];
    for (measure, values) in series.iter() {
        columns.push(Column::new(measure.column_name().into(), values));
    }
    Ok(DataFrame::new(columns)?)
}

/// Reads a daily table back into typed rows. Statistics missing from `frame`
/// come out as `None`.
pub fn records(frame: &DataFrame, geocode: u32) -> Result<Vec<RegionRecord>, AggregationError> {
    let dates = frame.column(DATE_COLUMN)?.date()?;
    // 1970-01-01
    let epoch = NaiveDate::default();

    let stat = |name: &str, row: usize| -> Option<f64> {
        frame
            .column(name)
            .ok()
            .and_then(|c| c.f64().ok())
            .and_then(|ca| ca.get(row))
    };
    let stats = |measure: Measure, row: usize| -> [Option<f64>; 3] {
        measure.daily_columns().map(|name| stat(&name, row))
    };

    (0..frame.height())
        .map(|row| -> Result<RegionRecord, AggregationError> {
            let days = dates.get(row).ok_or(AggregationError::MissingDate(row))?;
            let [temp_min, temp_med, temp_max] = stats(Measure::Temp, row);
            let [precip_min, precip_med, precip_max] = stats(Measure::Precip, row);
            let [pressao_min, pressao_med, pressao_max] = stats(Measure::Pressao, row);
            let [umid_min, umid_med, umid_max] = stats(Measure::Umid, row);
            Ok(RegionRecord {
                date: epoch + Duration::days(days as i64),
                geocode,
                temp_min,
                temp_med,
                temp_max,
                precip_min,
                precip_med,
                precip_max,
                pressao_min,
                pressao_med,
                pressao_max,
                umid_min,
                umid_med,
                umid_max,
            })
        })
        .collect()
}
