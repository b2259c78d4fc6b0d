//! Spatial reduction of a grid to a single series per variable.

use crate::grid::dataset::{GriddedDataset, NATIVE_RESOLUTION_DEG};
use crate::grid::error::GridError;
use crate::types::bounding_box::BoundingBox;
use crate::types::variable::RawVariable;
use chrono::NaiveDateTime;
use ordered_float::OrderedFloat;
use std::collections::BTreeMap;

/// Raw variables reduced to one value per timestamp.
///
/// `None` marks a timestamp where none of the matched grid points held a valid value.
#[derive(Debug, Clone, PartialEq)]
pub struct SlicedSeries {
    times: Vec<NaiveDateTime>,
    values: BTreeMap<RawVariable, Vec<Option<f64>>>,
}

impl SlicedSeries {
    pub fn new(
        times: Vec<NaiveDateTime>,
        values: BTreeMap<RawVariable, Vec<Option<f64>>>,
    ) -> Self {
        Self { times, values }
    }

    pub fn times(&self) -> &[NaiveDateTime] {
        &self.times
    }

    pub fn get(&self, variable: RawVariable) -> Option<&[Option<f64>]> {
        self.values.get(&variable).map(Vec::as_slice)
    }

    pub fn into_parts(self) -> (Vec<NaiveDateTime>, BTreeMap<RawVariable, Vec<Option<f64>>>) {
        (self.times, self.values)
    }
}

/// Samples `dataset` at the corners of `bbox` and averages them per timestamp.
///
/// Latitudes `{north, south}` and longitudes `{east, west}` are each matched to the
/// nearest gridpoint (no interpolation); coinciding matches collapse, so a box may
/// select 1, 2 or 4 points. Invalid values are skipped in the mean.
///
/// # Errors
///
/// [`GridError::OutOfDomain`] when all requested latitudes, or all requested
/// longitudes, lie more than half a grid step outside the grid.
pub fn slice(dataset: &GriddedDataset, bbox: &BoundingBox) -> Result<SlicedSeries, GridError> {
    let latitudes = bbox.latitudes();
    let longitudes = bbox
        .longitudes()
        .map(|lon| normalize_longitude(lon, dataset.longitudes()));

    let out_of_domain = || GridError::OutOfDomain {
        latitudes,
        longitudes: bbox.longitudes(),
        lat_extent: extent(dataset.latitudes()),
        lon_extent: extent(dataset.longitudes()),
    };
    let lat_idx = nearest_indices(dataset.latitudes(), &latitudes).ok_or_else(out_of_domain)?;
    let lon_idx = nearest_indices(dataset.longitudes(), &longitudes).ok_or_else(out_of_domain)?;

    let values = dataset
        .variables()
        .map(|variable| {
            let series = (0..dataset.times().len())
                .map(|t| {
                    let (sum, count) = lat_idx
                        .iter()
                        .flat_map(|&i| lon_idx.iter().map(move |&j| (i, j)))
                        .filter_map(|(i, j)| dataset.value(variable, t, i, j))
                        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
                    (count > 0).then(|| sum / count as f64)
                })
                .collect();
            (variable, series)
        })
        .collect();

    Ok(SlicedSeries::new(dataset.times().to_vec(), values))
}

/// Indices of the nearest axis value for each target, deduplicated in request order.
///
/// Returns `None` when no target falls within half a grid step of the axis extent.
fn nearest_indices(axis: &[f64], targets: &[f64]) -> Option<Vec<usize>> {
    let (min, max) = extent(axis);
    let tolerance = step(axis) / 2.0;
    if !targets
        .iter()
        .any(|t| *t >= min - tolerance && *t <= max + tolerance)
    {
        return None;
    }

    let mut indices: Vec<usize> = Vec::with_capacity(targets.len());
    for target in targets {
        let nearest = axis
            .iter()
            .enumerate()
            .min_by_key(|(_, v)| OrderedFloat((*v - target).abs()))
            .map(|(i, _)| i)?;
        if !indices.contains(&nearest) {
            indices.push(nearest);
        }
    }
    Some(indices)
}

fn extent(axis: &[f64]) -> (f64, f64) {
    axis.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(*v), hi.max(*v))
    })
}

fn step(axis: &[f64]) -> f64 {
    match axis {
        [a, b, ..] => (b - a).abs(),
        _ => NATIVE_RESOLUTION_DEG,
    }
}

/// Shifts a longitude into the convention of the axis (−180..180 or 0..360).
fn normalize_longitude(lon: f64, axis: &[f64]) -> f64 {
    let (min, max) = extent(axis);
    if max > 180.0 && lon < 0.0 {
        lon + 360.0
    } else if min < 0.0 && lon > 180.0 {
        lon - 360.0
    } else {
        lon
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    /// 2 timestamps on a 3 x 3 grid; temperature value encodes (t, lat, lon).
    fn dataset() -> GriddedDataset {
        let lats = vec![-25.0, -25.25, -25.5];
        let lons = vec![-54.75, -54.5, -54.25];
        let mut temp = Vec::new();
        for t in 0..2 {
            for i in 0..3 {
                for j in 0..3 {
                    temp.push(300.0 + 100.0 * t as f64 + 10.0 * i as f64 + j as f64);
                }
            }
        }
        let mut precip = vec![0.001; 18];
        precip[4] = f64::NAN; // t0, centre cell
        let mut variables = BTreeMap::new();
        variables.insert(RawVariable::Temperature, temp);
        variables.insert(RawVariable::Precipitation, precip);
        GriddedDataset::new(vec![ts(0), ts(3)], lats, lons, variables).unwrap()
    }

    #[test]
    fn test_four_point_mean() {
        // Corners snap to lat rows 0 and 2, lon columns 0 and 2.
        let bbox = BoundingBox::new(-24.9, -25.6, -54.2, -54.8);
        let sliced = slice(&dataset(), &bbox).unwrap();
        let temp = sliced.get(RawVariable::Temperature).unwrap();
        // (300 + 302 + 320 + 322) / 4
        assert_eq!(temp[0], Some(311.0));
        assert_eq!(temp[1], Some(411.0));
        assert_eq!(sliced.times(), &[ts(0), ts(3)]);
    }

    #[test]
    fn test_collapsed_latitude_yields_two_point_mean() {
        // north == south, one latitude row, two longitudes.
        let bbox = BoundingBox::new(-25.5, -25.5, -54.5, -54.75);
        let sliced = slice(&dataset(), &bbox).unwrap();
        let temp = sliced.get(RawVariable::Temperature).unwrap();
        // row 2, cols 1 and 0: (321 + 320) / 2
        assert_eq!(temp[0], Some(320.5));
        assert_eq!(temp.len(), 2);
    }

    #[test]
    fn test_missing_values_are_skipped() {
        let bbox = BoundingBox::new(-25.25, -25.25, -54.5, -54.5);
        let sliced = slice(&dataset(), &bbox).unwrap();
        let precip = sliced.get(RawVariable::Precipitation).unwrap();
        assert_eq!(precip[0], None);
        assert_eq!(precip[1], Some(0.001));
    }

    #[test]
    fn test_absent_variable_is_absent() {
        let bbox = BoundingBox::new(-25.0, -25.5, -54.25, -54.75);
        let sliced = slice(&dataset(), &bbox).unwrap();
        assert!(sliced.get(RawVariable::Dewpoint).is_none());
    }

    #[test]
    fn test_out_of_domain() {
        let bbox = BoundingBox::new(10.5, 9.5, 20.5, 19.5);
        assert!(matches!(
            slice(&dataset(), &bbox),
            Err(GridError::OutOfDomain { .. })
        ));
    }

    #[test]
    fn test_partially_outside_snaps_to_edge() {
        // South corner is outside but north is inside.
        let bbox = BoundingBox::new(-25.5, -26.5, -54.5, -54.5);
        let sliced = slice(&dataset(), &bbox).unwrap();
        assert_eq!(sliced.get(RawVariable::Temperature).unwrap()[0], Some(321.0));
    }

    #[test]
    fn test_longitude_convention_is_normalized() {
        assert_eq!(normalize_longitude(-54.5, &[300.0, 305.5]), 305.5);
        assert_eq!(normalize_longitude(305.5, &[-60.0, -50.0]), -54.5);
        assert_eq!(normalize_longitude(-54.5, &[-60.0, -50.0]), -54.5);
    }
}
