//! In-memory representation of a reanalysis file: a regular
//! time × latitude × longitude grid holding the raw ERA5 variables.

use crate::grid::error::GridError;
use crate::types::variable::RawVariable;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use std::collections::BTreeMap;

/// Native horizontal resolution of ERA5 single-level fields, in degrees.
pub const NATIVE_RESOLUTION_DEG: f64 = 0.25;

/// A loaded grid. Immutable once built.
///
/// Every variable is stored flat in `[time][latitude][longitude]` order and holds
/// exactly `times × latitudes × longitudes` values; missing values are `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct GriddedDataset {
    times: Vec<NaiveDateTime>,
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    variables: BTreeMap<RawVariable, Vec<f64>>,
}

impl GriddedDataset {
    pub fn new(
        times: Vec<NaiveDateTime>,
        latitudes: Vec<f64>,
        longitudes: Vec<f64>,
        variables: BTreeMap<RawVariable, Vec<f64>>,
    ) -> Result<Self, GridError> {
        if latitudes.is_empty() {
            return Err(GridError::EmptyAxis("latitude"));
        }
        if longitudes.is_empty() {
            return Err(GridError::EmptyAxis("longitude"));
        }
        let expected = times.len() * latitudes.len() * longitudes.len();
        for (variable, values) in &variables {
            if values.len() != expected {
                return Err(GridError::ShapeMismatch {
                    variable: variable.short_name().to_string(),
                    expected,
                    found: values.len(),
                });
            }
        }
        Ok(Self {
            times,
            latitudes,
            longitudes,
            variables,
        })
    }

    pub fn times(&self) -> &[NaiveDateTime] {
        &self.times
    }

    pub fn latitudes(&self) -> &[f64] {
        &self.latitudes
    }

    pub fn longitudes(&self) -> &[f64] {
        &self.longitudes
    }

    /// The variables present in the file, in [`RawVariable`] order.
    pub fn variables(&self) -> impl Iterator<Item = RawVariable> + '_ {
        self.variables.keys().copied()
    }

    pub fn has_variable(&self, variable: RawVariable) -> bool {
        self.variables.contains_key(&variable)
    }

    /// Value at one grid cell, `None` for absent variables, out-of-range indices and fill values.
    pub fn value(
        &self,
        variable: RawVariable,
        time: usize,
        lat: usize,
        lon: usize,
    ) -> Option<f64> {
        if time >= self.times.len() || lat >= self.latitudes.len() || lon >= self.longitudes.len()
        {
            return None;
        }
        let idx = (time * self.latitudes.len() + lat) * self.longitudes.len() + lon;
        self.variables
            .get(&variable)
            .and_then(|values| values.get(idx))
            .copied()
            .filter(|v| v.is_finite())
    }
}

/// Decodes a CF time axis (`"<unit> since <reference>"`) into timestamps.
///
/// Handles the units written by the Copernicus service, e.g.
/// `hours since 1900-01-01 00:00:00.0` and `seconds since 1970-01-01`.
///
/// # Errors
///
/// - [`GridError::InvalidTimeUnits`] for an unknown unit or unparsable reference.
/// - [`GridError::InvalidTimeValue`] for a value that is not finite or lands outside
///   the representable date range.
pub fn decode_cf_times(values: &[f64], units: &str) -> Result<Vec<NaiveDateTime>, GridError> {
    let invalid = || GridError::InvalidTimeUnits(units.to_string());
    let (unit, reference) = units.trim().split_once(" since ").ok_or_else(invalid)?;

    let unit_ms: f64 = match unit.trim().to_ascii_lowercase().as_str() {
        "seconds" | "second" | "secs" | "s" => 1_000.0,
        "minutes" | "minute" | "mins" => 60_000.0,
        "hours" | "hour" | "hrs" | "h" => 3_600_000.0,
        "days" | "day" | "d" => 86_400_000.0,
        _ => return Err(invalid()),
    };
    let reference = parse_reference(reference).ok_or_else(invalid)?;

    values
        .iter()
        .map(|&v| {
            let ms = (v * unit_ms).round();
            // i64::MAX as f64 rounds up to 2^63, so the bound is exclusive.
            (ms.is_finite() && ms.abs() < i64::MAX as f64)
                .then(|| TimeDelta::try_milliseconds(ms as i64))
                .flatten()
                .and_then(|offset| reference.checked_add_signed(offset))
                .ok_or_else(|| GridError::InvalidTimeValue {
                    value: v,
                    units: units.to_string(),
                })
        })
        .collect()
}

fn parse_reference(text: &str) -> Option<NaiveDateTime> {
    let text = text
        .trim()
        .trim_end_matches(" UTC")
        .trim_end_matches('Z');
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
