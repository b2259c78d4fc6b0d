use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridError {
    #[cfg(feature = "netcdf")]
    #[error("Failed to open grid file '{0}'")]
    Open(PathBuf, #[source] netcdf::Error),

    #[cfg(feature = "netcdf")]
    #[error("Failed to read variable '{variable}' from '{path}'")]
    Read {
        path: PathBuf,
        variable: String,
        #[source]
        source: netcdf::Error,
    },

    #[error("No grid registered for '{0}'")]
    NotFound(PathBuf),

    #[error("Coordinate variable '{names}' not found in '{path}'")]
    MissingCoordinate { path: PathBuf, names: String },

    #[error("Unsupported time units '{0}'")]
    InvalidTimeUnits(String),

    #[error("Time value {value} in '{units}' is not a representable timestamp")]
    InvalidTimeValue { value: f64, units: String },

    #[error("Variable '{variable}' in '{path}' has dimensions {found:?}, expected (time, latitude, longitude)")]
    UnexpectedDimensions {
        path: PathBuf,
        variable: String,
        found: Vec<String>,
    },

    #[error("Variable '{variable}' holds {found} values, expected {expected} (time x latitude x longitude)")]
    ShapeMismatch {
        variable: String,
        expected: usize,
        found: usize,
    },

    #[error("Grid axis '{0}' is empty")]
    EmptyAxis(&'static str),

    #[error(
        "Requested extent (lat {latitudes:?}, lon {longitudes:?}) lies outside the grid \
         (lat {lat_extent:?}, lon {lon_extent:?})"
    )]
    OutOfDomain {
        latitudes: [f64; 2],
        longitudes: [f64; 2],
        lat_extent: (f64, f64),
        lon_extent: (f64, f64),
    },
}
