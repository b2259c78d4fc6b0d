//! Conversion of raw ERA5 units into the units of the output tables, and the
//! derivation of relative humidity from temperature and dewpoint.

use crate::grid::slicer::SlicedSeries;
use crate::types::variable::{Measure, RawVariable};
use chrono::NaiveDateTime;
use log::debug;
use std::collections::BTreeMap;

pub const KELVIN_OFFSET: f64 = 273.15;
pub const MILLIMETERS_PER_METER: f64 = 1000.0;
pub const ATMOSPHERES_PER_PASCAL: f64 = 9.86923e-6;

// Bolton (1980) saturation vapour pressure coefficients.
const BOLTON_A: f64 = 6.112;
const BOLTON_B: f64 = 17.67;
const BOLTON_C: f64 = 243.5;

pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - KELVIN_OFFSET
}

pub fn meters_to_millimeters(meters: f64) -> f64 {
    meters * MILLIMETERS_PER_METER
}

pub fn pascals_to_atmospheres(pascals: f64) -> f64 {
    pascals * ATMOSPHERES_PER_PASCAL
}

/// Saturation vapour pressure over water in hPa, temperature in °C.
fn saturation_vapor_pressure(celsius: f64) -> f64 {
    BOLTON_A * (BOLTON_B * celsius / (celsius + BOLTON_C)).exp()
}

/// Relative humidity in percent from air temperature and dewpoint, both in °C.
///
/// Clamped to `[0, 100]`; a dewpoint above the air temperature reads as saturated.
pub fn relative_humidity(temperature_c: f64, dewpoint_c: f64) -> f64 {
    let rh = 100.0 * saturation_vapor_pressure(dewpoint_c) / saturation_vapor_pressure(temperature_c);
    rh.clamp(0.0, 100.0)
}

/// Series in target units, keyed by [`Measure`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedSeries {
    times: Vec<NaiveDateTime>,
    values: BTreeMap<Measure, Vec<Option<f64>>>,
}

impl ConvertedSeries {
    pub fn new(times: Vec<NaiveDateTime>, values: BTreeMap<Measure, Vec<Option<f64>>>) -> Self {
        Self { times, values }
    }

    pub fn times(&self) -> &[NaiveDateTime] {
        &self.times
    }

    pub fn get(&self, measure: Measure) -> Option<&[Option<f64>]> {
        self.values.get(&measure).map(Vec::as_slice)
    }

    /// Present measures in output column order.
    pub fn iter(&self) -> impl Iterator<Item = (Measure, &[Option<f64>])> + '_ {
        self.values.iter().map(|(m, v)| (*m, v.as_slice()))
    }
}

fn map_values(values: &[Option<f64>], f: impl Fn(f64) -> f64) -> Vec<Option<f64>> {
    values.iter().map(|v| v.map(&f)).collect()
}

/// Converts every variable present in `sliced`; absent variables produce no output.
///
/// The dewpoint entry is consumed: it only survives as the derived `umid` measure,
/// which also needs temperature.
pub fn convert(sliced: SlicedSeries) -> ConvertedSeries {
    let (times, mut raw) = sliced.into_parts();
    let mut values = BTreeMap::new();

    let temperature = raw
        .remove(&RawVariable::Temperature)
        .map(|k| map_values(&k, kelvin_to_celsius));
    let dewpoint = raw
        .remove(&RawVariable::Dewpoint)
        .map(|k| map_values(&k, kelvin_to_celsius));

    if let Some(meters) = raw.remove(&RawVariable::Precipitation) {
        values.insert(Measure::Precip, map_values(&meters, meters_to_millimeters));
    }
    if let Some(pascals) = raw.remove(&RawVariable::Pressure) {
        values.insert(Measure::Pressao, map_values(&pascals, pascals_to_atmospheres));
    }

    match (&temperature, dewpoint) {
        (Some(temp), Some(dew)) => {
            let humidity = temp
                .iter()
                .zip(dew)
                .map(|(t, d)| match (t, d) {
                    (Some(t), Some(d)) => Some(relative_humidity(*t, d)),
                    _ => None,
                })
                .collect();
            values.insert(Measure::Umid, humidity);
        }
        (None, Some(_)) => debug!("Dewpoint present without temperature, humidity omitted"),
        (_, None) => debug!("No dewpoint in source, humidity omitted"),
    }
    if let Some(temp) = temperature {
        values.insert(Measure::Temp, temp);
    }

    ConvertedSeries::new(times, values)
}
