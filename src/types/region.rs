//! Defines the administrative regions known to the gazetteer, and the
//! implementations needed to index them spatially with the `rstar` crate.

use rstar::{PointDistance, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

/// Represents a geographical coordinate using latitude and longitude.
///
/// Latitude is the first element (index 0), and longitude is the second (index 1).
/// Both values are in decimal degrees.
///
/// # Examples
///
/// ```
/// use reanalysis::LatLon;
///
/// let foz = LatLon(-25.5478, -54.5882);
/// assert_eq!(foz.0, -25.5478); // Latitude
/// assert_eq!(foz.1, -54.5882); // Longitude
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon(pub f64, pub f64);

impl LatLon {
    pub fn latitude(self) -> f64 {
        self.0
    }

    pub fn longitude(self) -> f64 {
        self.1
    }
}

/// A single administrative region (typically a municipality) and its centroid.
///
/// Field aliases accept the IBGE municipality listing (`geocodigo`, `municipio`)
/// as well as plain English keys.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Region {
    /// Numeric geocode identifying the region (e.g. 4108304 for Foz do Iguaçu).
    #[serde(alias = "geocodigo")]
    pub geocode: u32,
    /// Human readable name, if the source listing carries one.
    #[serde(default, alias = "municipio", alias = "nome")]
    pub name: Option<String>,
    /// Centroid latitude in decimal degrees (negative south of the equator).
    pub latitude: f64,
    /// Centroid longitude in decimal degrees (negative west of Greenwich).
    pub longitude: f64,
}

impl Region {
    pub fn new(geocode: u32, latitude: f64, longitude: f64) -> Self {
        Self {
            geocode,
            name: None,
            latitude,
            longitude,
        }
    }

    pub fn centroid(&self) -> LatLon {
        LatLon(self.latitude, self.longitude)
    }
}

/// A region is a point for the R-tree: its envelope is a degenerate AABB.
impl RTreeObject for Region {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.latitude, self.longitude])
    }
}

/// Squared planar distance in degree space, only used to order R-tree candidates.
/// Real distances are computed with haversine afterwards.
impl PointDistance for Region {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.latitude - point[0];
        let dy = self.longitude - point[1];
        dx * dx + dy * dy
    }
}
