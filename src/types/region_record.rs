use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily weather summary for one region, the row shape handed to storage.
///
/// Every statistic is optional: when the source file lacks a variable, the three
/// statistics derived from it are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRecord {
    pub date: NaiveDate,
    #[serde(rename = "geocodigo")]
    pub geocode: u32,
    /// Temperature, °C.
    pub temp_min: Option<f64>,
    pub temp_med: Option<f64>,
    pub temp_max: Option<f64>,
    /// Precipitation, mm.
    pub precip_min: Option<f64>,
    pub precip_med: Option<f64>,
    pub precip_max: Option<f64>,
    /// Sea level pressure, atm.
    pub pressao_min: Option<f64>,
    pub pressao_med: Option<f64>,
    pub pressao_max: Option<f64>,
    /// Relative humidity, %.
    pub umid_min: Option<f64>,
    pub umid_med: Option<f64>,
    pub umid_max: Option<f64>,
}
