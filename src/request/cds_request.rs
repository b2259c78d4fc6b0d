use crate::request::date_range::{DateAxis, DateParams};
use crate::types::bounding_box::BoundingBox;
use crate::types::variable::RawVariable;
use serde::Serialize;

/// Copernicus dataset holding hourly single-level reanalysis fields.
pub const DATASET: &str = "reanalysis-era5-single-levels";

/// Synoptic hours requested for each day.
pub const SYNOPTIC_TIMES: [&str; 8] = [
    "00:00", "03:00", "06:00", "09:00", "12:00", "15:00", "18:00", "21:00",
];

const REQUEST_VARIABLES: [RawVariable; 4] = [
    RawVariable::Temperature,
    RawVariable::Precipitation,
    RawVariable::Dewpoint,
    RawVariable::Pressure,
];

/// Body of a data request to the Copernicus climate data store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CdsRequest {
    pub product_type: String,
    pub variable: Vec<String>,
    pub year: DateAxis,
    pub month: DateAxis,
    pub day: DateAxis,
    pub time: Vec<String>,
    /// `[north, west, south, east]`
    pub area: [f64; 4],
    pub format: String,
}

impl CdsRequest {
    /// Request for the four raw variables, every three hours, over `area`, as NetCDF.
    pub fn reanalysis(params: DateParams, area: &BoundingBox) -> Self {
        let DateParams { year, month, day } = params;
        Self {
            product_type: "reanalysis".to_string(),
            variable: REQUEST_VARIABLES
                .iter()
                .map(|v| v.request_name().to_string())
                .collect(),
            year,
            month,
            day,
            time: SYNOPTIC_TIMES.iter().map(|t| t.to_string()).collect(),
            area: area.to_area(),
            format: "netcdf".to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
