//! Turns a region centroid into the extent sampled from the grid.

use crate::regions::error::RegionError;
use crate::types::bounding_box::BoundingBox;
use crate::types::region::LatLon;
use log::debug;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Half-width of the computed box on each axis, in degrees.
pub const DEFAULT_DELTA_DEG: f64 = 0.5;

/// Foz do Iguaçu: the computed box lands on a grid cell over the reservoir.
pub const FOZ_DO_IGUACU: u32 = 4108304;

/// Hand-tuned extents keyed by geocode, consulted before the computed box.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideTable {
    entries: HashMap<u32, BoundingBox>,
}

#[derive(Deserialize)]
struct OverrideEntry {
    #[serde(alias = "geocodigo")]
    geocode: u32,
    #[serde(flatten)]
    bbox: BoundingBox,
}

impl OverrideTable {
    /// A table with no overrides at all.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Parses a JSON array of `{geocode, north, south, east, west}` objects.
    pub fn from_json_slice(bytes: &[u8], source: &Path) -> Result<Self, RegionError> {
        let entries: Vec<OverrideEntry> = serde_json::from_slice(bytes)
            .map_err(|e| RegionError::OverrideParse(source.to_path_buf(), e))?;
        Ok(Self {
            entries: entries.into_iter().map(|e| (e.geocode, e.bbox)).collect(),
        })
    }

    pub fn from_json_file(path: &Path) -> Result<Self, RegionError> {
        let bytes =
            std::fs::read(path).map_err(|e| RegionError::OverrideRead(path.to_path_buf(), e))?;
        Self::from_json_slice(&bytes, path)
    }

    /// Adds or replaces the override for `geocode`.
    pub fn with(mut self, geocode: u32, bbox: BoundingBox) -> Self {
        self.entries.insert(geocode, bbox);
        self
    }

    pub fn get(&self, geocode: u32) -> Option<&BoundingBox> {
        self.entries.get(&geocode)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The built-in table: a single latitude row and two western longitudes for Foz do Iguaçu.
impl Default for OverrideTable {
    fn default() -> Self {
        Self::empty().with(
            FOZ_DO_IGUACU,
            BoundingBox::new(-25.5, -25.5, -54.5, -54.75),
        )
    }
}

#[derive(Debug, Clone)]
pub struct BoundingBoxResolver {
    delta: f64,
    overrides: OverrideTable,
}

impl BoundingBoxResolver {
    pub fn new(delta: f64, overrides: OverrideTable) -> Self {
        Self { delta, overrides }
    }

    /// Box of `±delta` degrees around a centroid.
    pub fn resolve(&self, latitude: f64, longitude: f64) -> BoundingBox {
        BoundingBox {
            north: latitude + self.delta,
            south: latitude - self.delta,
            east: longitude + self.delta,
            west: longitude - self.delta,
        }
    }

    /// Box for a region: its override if there is one, otherwise the computed box.
    pub fn resolve_for(&self, geocode: u32, centroid: LatLon) -> BoundingBox {
        match self.overrides.get(geocode) {
            Some(bbox) => {
                debug!("Using override box for geocode {}: {:?}", geocode, bbox);
                *bbox
            }
            None => self.resolve(centroid.0, centroid.1),
        }
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn overrides(&self) -> &OverrideTable {
        &self.overrides
    }
}

impl Default for BoundingBoxResolver {
    fn default() -> Self {
        Self::new(DEFAULT_DELTA_DEG, OverrideTable::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_computed_box_is_symmetric() {
        let resolver = BoundingBoxResolver::default();
        let bbox = resolver.resolve(-22.9, -43.2);
        assert!((bbox.north - -22.4).abs() < 1e-9);
        assert!((bbox.south - -23.4).abs() < 1e-9);
        assert!((bbox.east - -42.7).abs() < 1e-9);
        assert!((bbox.west - -43.7).abs() < 1e-9);
    }

    #[test]
    fn test_override_takes_precedence() {
        let resolver = BoundingBoxResolver::default();
        let centroid = LatLon(-25.5478, -54.5882);
        let bbox = resolver.resolve_for(FOZ_DO_IGUACU, centroid);
        assert_eq!(bbox, BoundingBox::new(-25.5, -25.5, -54.5, -54.75));
        assert_ne!(bbox, resolver.resolve(centroid.0, centroid.1));
    }

    #[test]
    fn test_no_override_uses_computed_box() {
        let resolver = BoundingBoxResolver::new(0.25, OverrideTable::empty());
        let centroid = LatLon(-25.5478, -54.5882);
        assert_eq!(
            resolver.resolve_for(FOZ_DO_IGUACU, centroid),
            resolver.resolve(centroid.0, centroid.1)
        );
    }

    #[test]
    fn test_override_table_from_json() {
        let json = br#"[
            {"geocodigo": 1100015, "north": -11.5, "south": -12.0, "east": -61.75, "west": -62.0}
        ]"#;
        let table = OverrideTable::from_json_slice(json, Path::new("overrides.json")).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.get(1100015),
            Some(&BoundingBox::new(-11.5, -12.0, -61.75, -62.0))
        );
        assert!(table.get(FOZ_DO_IGUACU).is_none());
    }

    #[test]
    fn test_override_table_bad_json() {
        let result = OverrideTable::from_json_slice(b"[{\"geocode\": 1}]", Path::new("o.json"));
        assert!(matches!(result, Err(RegionError::OverrideParse(_, _))));
    }
}
