//! Four-corner geographic extents used to select grid points.

use serde::{Deserialize, Serialize};

/// A north/south/east/west extent in decimal degrees.
///
/// Boxes computed from a centroid are symmetric, but hand-tuned boxes may
/// collapse an axis (`north == south`) or be skewed to dodge an invalid grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// The latitudes to sample, `[north, south]`.
    pub fn latitudes(&self) -> [f64; 2] {
        [self.north, self.south]
    }

    /// The longitudes to sample, `[east, west]`.
    pub fn longitudes(&self) -> [f64; 2] {
        [self.east, self.west]
    }

    /// The box in the `[N, W, S, E]` order the Copernicus request `area` field expects.
    pub fn to_area(&self) -> [f64; 4] {
        [self.north, self.west, self.south, self.east]
    }
}

/// Extent of Brazil used for the country-wide download.
pub const BRAZIL_AREA: BoundingBox = BoundingBox {
    north: 5.5,
    south: -33.75,
    east: -32.25,
    west: -74.0,
};
