//! Sources of [`GriddedDataset`]s.
//!
//! The pipeline only sees the [`DatasetLoader`] trait. Each `load` call opens the
//! source read-only, consumes it fully and releases it before returning, so no
//! file handle outlives a call.

use crate::grid::dataset::GriddedDataset;
use crate::grid::error::GridError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub trait DatasetLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<GriddedDataset, GridError>;
}

/// Serves datasets that were built in memory, keyed by the path they stand in for.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    datasets: HashMap<PathBuf, GriddedDataset>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<PathBuf>, dataset: GriddedDataset) -> Self {
        self.insert(path, dataset);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, dataset: GriddedDataset) {
        self.datasets.insert(path.into(), dataset);
    }
}

impl DatasetLoader for MemoryLoader {
    fn load(&self, path: &Path) -> Result<GriddedDataset, GridError> {
        self.datasets
            .get(path)
            .cloned()
            .ok_or_else(|| GridError::NotFound(path.to_path_buf()))
    }
}

#[cfg(feature = "netcdf")]
pub use self::netcdf_loader::NetCdfLoader;

#[cfg(feature = "netcdf")]
mod netcdf_loader {
    use super::DatasetLoader;
    use crate::grid::dataset::{decode_cf_times, GriddedDataset};
    use crate::grid::error::GridError;
    use crate::types::variable::RawVariable;
    use log::{debug, info};
    use std::collections::BTreeMap;
    use std::path::Path;

    const LATITUDE_NAMES: [&str; 2] = ["latitude", "lat"];
    const LONGITUDE_NAMES: [&str; 2] = ["longitude", "lon"];
    // Files from the newer CDS backend name the time axis `valid_time`.
    const TIME_NAMES: [&str; 2] = ["time", "valid_time"];

    /// Reads ERA5 single-level NetCDF files.
    ///
    /// Packed variables (`scale_factor`/`add_offset`) are unpacked and fill
    /// values become `NaN`. Variables missing from the file are skipped. Every
    /// variable must be laid out as `(time, latitude, longitude)`, under any of
    /// the accepted names for each axis.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct NetCdfLoader;

    impl DatasetLoader for NetCdfLoader {
        fn load(&self, path: &Path) -> Result<GriddedDataset, GridError> {
            let file =
                netcdf::open(path).map_err(|e| GridError::Open(path.to_path_buf(), e))?;

            let latitudes = read_coordinate(&file, path, &LATITUDE_NAMES)?;
            let longitudes = read_coordinate(&file, path, &LONGITUDE_NAMES)?;

            let time_var = TIME_NAMES
                .iter()
                .find_map(|name| file.variable(name))
                .ok_or_else(|| GridError::MissingCoordinate {
                    path: path.to_path_buf(),
                    names: TIME_NAMES.join(" or "),
                })?;
            let raw_times: Vec<f64> =
                time_var
                    .get_values::<f64, _>(..)
                    .map_err(|e| GridError::Read {
                        path: path.to_path_buf(),
                        variable: time_var.name(),
                        source: e,
                    })?;
            let units = attr_string(&time_var, "units")
                .ok_or_else(|| GridError::InvalidTimeUnits(String::new()))?;
            let times = decode_cf_times(&raw_times, &units)?;

            let mut variables = BTreeMap::new();
            for variable in RawVariable::ALL {
                match file.variable(variable.short_name()) {
                    Some(var) => {
                        check_dimensions(&var, path)?;
                        variables.insert(variable, read_unpacked(&var, path)?);
                    }
                    None => debug!("{} not present in {}", variable, path.display()),
                }
            }

            info!(
                "Loaded {} ({} times, {} x {} grid, {} variables)",
                path.display(),
                times.len(),
                latitudes.len(),
                longitudes.len(),
                variables.len()
            );
            GriddedDataset::new(times, latitudes, longitudes, variables)
        }
    }

    fn read_coordinate(
        file: &netcdf::File,
        path: &Path,
        names: &[&str],
    ) -> Result<Vec<f64>, GridError> {
        for name in names {
            if let Some(var) = file.variable(name) {
                return var.get_values::<f64, _>(..).map_err(|e| GridError::Read {
                    path: path.to_path_buf(),
                    variable: name.to_string(),
                    source: e,
                });
            }
        }
        Err(GridError::MissingCoordinate {
            path: path.to_path_buf(),
            names: names.join(" or "),
        })
    }

    fn check_dimensions(var: &netcdf::Variable, path: &Path) -> Result<(), GridError> {
        let found: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        let expected: [&[&str]; 3] = [&TIME_NAMES, &LATITUDE_NAMES, &LONGITUDE_NAMES];
        let ordered = found.len() == expected.len()
            && found
                .iter()
                .zip(expected)
                .all(|(name, accepted)| accepted.contains(&name.as_str()));
        if ordered {
            Ok(())
        } else {
            Err(GridError::UnexpectedDimensions {
                path: path.to_path_buf(),
                variable: var.name(),
                found,
            })
        }
    }

    fn read_unpacked(var: &netcdf::Variable, path: &Path) -> Result<Vec<f64>, GridError> {
        let scale = attr_f64(var, "scale_factor").unwrap_or(1.0);
        let offset = attr_f64(var, "add_offset").unwrap_or(0.0);
        let fill = attr_f64(var, "_FillValue");
        let missing = attr_f64(var, "missing_value");

        let raw: Vec<f64> = var.get_values::<f64, _>(..).map_err(|e| GridError::Read {
            path: path.to_path_buf(),
            variable: var.name(),
            source: e,
        })?;

        Ok(raw
            .into_iter()
            .map(|v| {
                if !v.is_finite() || Some(v) == fill || Some(v) == missing {
                    f64::NAN
                } else {
                    v * scale + offset
                }
            })
            .collect())
    }

    fn attr_f64(var: &netcdf::Variable, name: &str) -> Option<f64> {
        var.attribute_value(name)
            .and_then(|r| r.ok())
            .and_then(|v| match v {
                netcdf::AttributeValue::Double(d) => Some(d),
                netcdf::AttributeValue::Float(f) => Some(f as f64),
                netcdf::AttributeValue::Short(s) => Some(s as f64),
                netcdf::AttributeValue::Int(i) => Some(i as f64),
                netcdf::AttributeValue::Schar(c) => Some(c as f64),
                _ => None,
            })
    }

    fn attr_string(var: &netcdf::Variable, name: &str) -> Option<String> {
        var.attribute_value(name)
            .and_then(|r| r.ok())
            .and_then(|v| match v {
                netcdf::AttributeValue::Str(s) => Some(s),
                _ => None,
            })
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::extractor::Extractor;
        use crate::regions::gazetteer::RegionGazetteer;
        use crate::types::region::Region;
        use chrono::NaiveDate;

        const GEOCODE: u32 = 4115804;
        const FILL: i16 = -32767;

        /// Two 3-hourly steps on 2023-01-01 over a 3 x 3 grid, laid out the way
        /// the newer CDS backend writes them. `t2m` is packed as `250 + 0.5 * raw`
        /// and is 300 K at the first step, 295 K at the second, with the north-west
        /// cell filled at the second step.
        /// `data_dims` gives the dimension order of the data variables.
        fn write_grid(path: &Path, data_dims: &[&str]) -> Result<(), netcdf::Error> {
            let mut file = netcdf::create(path)?;
            file.add_dimension("valid_time", 2)?;
            file.add_dimension("lat", 3)?;
            file.add_dimension("lon", 3)?;
            if data_dims.contains(&"number") {
                file.add_dimension("number", 1)?;
            }

            {
                let mut var = file.add_variable::<i64>("valid_time", &["valid_time"])?;
                var.put_attribute("units", "seconds since 1970-01-01")?;
                var.put_values(&[1_672_531_200_i64, 1_672_542_000], ..)?;
            }
            {
                let mut var = file.add_variable::<f64>("lat", &["lat"])?;
                var.put_attribute("units", "degrees_north")?;
                var.put_values(&[-25.0, -25.25, -25.5], ..)?;
            }
            {
                let mut var = file.add_variable::<f64>("lon", &["lon"])?;
                var.put_attribute("units", "degrees_east")?;
                var.put_values(&[-54.5, -54.25, -54.0], ..)?;
            }
            {
                let mut raw = vec![100_i16; 9];
                raw.extend([90; 9]);
                raw[9] = FILL;
                let mut var = file.add_variable::<i16>("t2m", data_dims)?;
                var.put_attribute("scale_factor", 0.5_f64)?;
                var.put_attribute("add_offset", 250.0_f64)?;
                var.put_attribute("_FillValue", FILL)?;
                var.put_values(&raw, ..)?;
            }
            {
                let mut var = file.add_variable::<f32>("tp", data_dims)?;
                var.put_attribute("units", "m")?;
                var.put_values(&[0.002_f32; 18], ..)?;
            }
            Ok(())
        }

        fn extractor() -> Extractor {
            Extractor::with_netcdf(RegionGazetteer::new(vec![Region::new(
                GEOCODE, -25.0, -54.0,
            )]))
        }

        #[test]
        fn test_packed_file_through_extractor() -> Result<(), Box<dyn std::error::Error>> {
            let dir = tempfile::tempdir()?;
            let path = dir.path().join("BR_20230101.nc");
            write_grid(&path, &["valid_time", "lat", "lon"])?;

            let dataset = NetCdfLoader.load(&path)?;
            assert_eq!(dataset.latitudes(), [-25.0, -25.25, -25.5]);
            assert_eq!(dataset.times().len(), 2);
            assert_eq!(
                dataset.times()[1],
                NaiveDate::from_ymd_opt(2023, 1, 1)
                    .unwrap()
                    .and_hms_opt(3, 0, 0)
                    .unwrap()
            );
            assert_eq!(dataset.value(RawVariable::Temperature, 0, 1, 1), Some(300.0));
            assert_eq!(dataset.value(RawVariable::Temperature, 1, 0, 0), None);
            assert_eq!(dataset.value(RawVariable::Temperature, 1, 1, 1), Some(295.0));
            assert!(!dataset.has_variable(RawVariable::Dewpoint));

            let table = extractor().extract(&path, GEOCODE)?;
            let rows = table.records()?;
            assert_eq!(rows.len(), 1);
            let row = &rows[0];
            assert_eq!(row.date, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
            let close = |a: Option<f64>, b: f64| a.is_some_and(|a| (a - b).abs() < 1e-6);
            assert!(close(row.temp_max, 26.85), "{:?}", row.temp_max);
            assert!(close(row.temp_min, 21.85), "{:?}", row.temp_min);
            assert!(close(row.temp_med, 24.35), "{:?}", row.temp_med);
            assert!(close(row.precip_med, 2.0), "{:?}", row.precip_med);
            assert_eq!(row.umid_med, None);
            assert_eq!(row.pressao_med, None);
            Ok(())
        }

        #[test]
        fn test_rejects_misordered_dimensions() -> Result<(), Box<dyn std::error::Error>> {
            let dir = tempfile::tempdir()?;
            for (name, dims) in [
                ("swapped.nc", vec!["valid_time", "lon", "lat"]),
                ("member.nc", vec!["valid_time", "number", "lat", "lon"]),
            ] {
                let path = dir.path().join(name);
                write_grid(&path, &dims)?;
                match NetCdfLoader.load(&path) {
                    Err(GridError::UnexpectedDimensions {
                        variable, found, ..
                    }) => {
                        assert_eq!(variable, "t2m");
                        assert_eq!(found, dims);
                    }
                    other => panic!("{name}: expected a dimension error, got {other:?}"),
                }
            }
            Ok(())
        }

        #[test]
        fn test_missing_coordinate() -> Result<(), Box<dyn std::error::Error>> {
            let dir = tempfile::tempdir()?;
            let path = dir.path().join("no_grid.nc");
            {
                let mut file = netcdf::create(&path)?;
                file.add_dimension("time", 1)?;
                let mut var = file.add_variable::<f64>("time", &["time"])?;
                var.put_values(&[0.0], ..)?;
            }
            assert!(matches!(
                NetCdfLoader.load(&path),
                Err(GridError::MissingCoordinate { .. })
            ));
            Ok(())
        }
    }
}
