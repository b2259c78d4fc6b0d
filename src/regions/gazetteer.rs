use crate::regions::error::RegionError;
use crate::types::region::{LatLon, Region};
use crate::utils::{ensure_dir_exists, get_cache_dir};
use bincode::config::{Configuration, Fixint, LittleEndian};
use bon::bon;
use haversine::{distance, Location as HaversineLocation, Units};
use log::{debug, info, warn};
use ordered_float::OrderedFloat;
use rstar::RTree;
use std::collections::HashMap;
use std::io::Write;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const BINCODE_CACHE_FILE_PREFIX: &str = "regions";
const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

/// Binary snapshot of one listing.
#[derive(Serialize, Deserialize)]
struct RegionSnapshot {
    listing: String,
    regions: Vec<Region>,
}

/// Immutable lookup from geocode to region centroid.
///
/// Built once (from a JSON listing, a binary cache, or an in-memory list) and
/// then shared read-only by the extraction pipeline.
#[derive(Debug, Clone)]
pub struct RegionGazetteer {
    by_geocode: HashMap<u32, Region>,
    rtree: RTree<Region>,
}

#[bon]
impl RegionGazetteer {
    pub fn new(regions: Vec<Region>) -> Self {
        let mut by_geocode = HashMap::with_capacity(regions.len());
        for region in regions {
            let geocode = region.geocode;
            if by_geocode.insert(geocode, region).is_some() {
                warn!("Duplicate geocode {} in region listing, keeping the last entry", geocode);
            }
        }
        let rtree = RTree::bulk_load(by_geocode.values().cloned().collect());
        Self { by_geocode, rtree }
    }

    /// Parses a JSON array of regions.
    pub fn from_json_slice(bytes: &[u8], source: &Path) -> Result<Self, RegionError> {
        let regions: Vec<Region> = serde_json::from_slice(bytes)
            .map_err(|e| RegionError::ListingParse(source.to_path_buf(), e))?;
        Ok(Self::new(regions))
    }

    pub fn from_json_file(path: &Path) -> Result<Self, RegionError> {
        let bytes =
            std::fs::read(path).map_err(|e| RegionError::ListingRead(path.to_path_buf(), e))?;
        Self::from_json_slice(&bytes, path)
    }

    /// Loads the listing through a binary snapshot kept in `cache_dir`.
    ///
    /// Each listing gets its own snapshot, named after its file stem and absolute
    /// path. The snapshot is rebuilt whenever it is missing, older than the listing,
    /// or was written for another listing.
    pub fn load_cached(listing: &Path, cache_dir: &Path) -> Result<Self, RegionError> {
        let source = listing_key(listing);
        let cache_file = snapshot_path(listing, &source, cache_dir);

        if Self::cache_is_fresh(listing, &cache_file) {
            debug!("Loading regions from cache {}", cache_file.display());
            match Self::get_cached_regions(&cache_file, &source)? {
                Some(regions) => return Ok(Self::new(regions)),
                None => warn!(
                    "Region cache {} belongs to another listing, rebuilding",
                    cache_file.display()
                ),
            }
        }

        info!(
            "Region cache missing or stale, parsing listing {}",
            listing.display()
        );
        let bytes = std::fs::read(listing)
            .map_err(|e| RegionError::ListingRead(listing.to_path_buf(), e))?;
        let regions: Vec<Region> = serde_json::from_slice(&bytes)
            .map_err(|e| RegionError::ListingParse(listing.to_path_buf(), e))?;
        ensure_dir_exists(cache_dir)
            .map_err(|e| RegionError::CacheDirCreation(cache_dir.to_path_buf(), e))?;
        let snapshot = RegionSnapshot {
            listing: source,
            regions,
        };
        Self::cache_regions(&snapshot, cache_dir, &cache_file)?;
        Ok(Self::new(snapshot.regions))
    }

    /// [`load_cached`](Self::load_cached) with the platform cache directory.
    pub fn load_cached_default(listing: &Path) -> Result<Self, RegionError> {
        let cache_dir = get_cache_dir().ok_or(RegionError::CacheDirResolution)?;
        Self::load_cached(listing, &cache_dir)
    }

    fn cache_is_fresh(listing: &Path, cache_file: &Path) -> bool {
        let modified = |p: &Path| std::fs::metadata(p).and_then(|m| m.modified()).ok();
        match (modified(listing), modified(cache_file)) {
            (Some(listing_time), Some(cache_time)) => cache_time >= listing_time,
            // No listing to compare against: trust an existing cache.
            (None, Some(_)) => true,
            _ => false,
        }
    }

    /// Returns `None` when the snapshot was written for a different listing.
    fn get_cached_regions(
        cache_path: &Path,
        source: &str,
    ) -> Result<Option<Vec<Region>>, RegionError> {
        let bytes = std::fs::read(cache_path)
            .map_err(|e| RegionError::CacheRead(cache_path.to_path_buf(), e))?;
        let (decoded, _) = bincode::serde::decode_from_slice::<RegionSnapshot, _>(
            &bytes,
            BINCODE_CONFIG,
        )
        .map_err(|e| RegionError::CacheDecode(cache_path.to_path_buf(), Box::new(e)))?;
        Ok((decoded.listing == source).then_some(decoded.regions))
    }

    fn cache_regions(
        snapshot: &RegionSnapshot,
        cache_dir: &Path,
        cache_path: &Path,
    ) -> Result<(), RegionError> {
        let encoded = bincode::serde::encode_to_vec(snapshot, BINCODE_CONFIG)
            .map_err(|e| RegionError::CacheEncode(Box::new(e)))?;
        // Write next to the target and rename, so readers never see a partial file.
        let mut tmp = NamedTempFile::new_in(cache_dir)
            .map_err(|e| RegionError::CacheWrite(cache_path.to_path_buf(), e))?;
        tmp.write_all(&encoded)
            .map_err(|e| RegionError::CacheWrite(cache_path.to_path_buf(), e))?;
        tmp.persist(cache_path)
            .map_err(|e| RegionError::CacheWrite(cache_path.to_path_buf(), e.error))?;
        info!(
            "Wrote region cache ({} bytes) to {}",
            encoded.len(),
            cache_path.display()
        );
        Ok(())
    }

    /// Returns the centroid of the region identified by `geocode`.
    pub fn lookup(&self, geocode: u32) -> Result<LatLon, RegionError> {
        self.by_geocode
            .get(&geocode)
            .map(Region::centroid)
            .ok_or(RegionError::UnknownRegion(geocode))
    }

    pub fn get(&self, geocode: u32) -> Option<&Region> {
        self.by_geocode.get(&geocode)
    }

    /// All known geocodes, in ascending order.
    pub fn geocodes(&self) -> Vec<u32> {
        let mut geocodes: Vec<u32> = self.by_geocode.keys().copied().collect();
        geocodes.sort_unstable();
        geocodes
    }

    pub fn len(&self) -> usize {
        self.by_geocode.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_geocode.is_empty()
    }

    /// Finds the regions whose centroid is closest to `location`, closest first.
    ///
    /// * `.limit(usize)`: maximum number of regions returned. Defaults to `5`.
    /// * `.max_distance_km(f64)`: search radius. Defaults to `50.0`.
    #[builder]
    pub fn nearest(
        &self,
        location: LatLon,
        limit: Option<usize>,
        max_distance_km: Option<f64>,
    ) -> Vec<(Region, f64)> {
        let limit = limit.unwrap_or(5);
        let max_distance_km = max_distance_km.unwrap_or(50.0);
        if limit == 0 {
            return vec![];
        }

        // R-tree order is planar, so take a margin of candidates before the haversine filter.
        let candidate_limit = (limit * 2).max(20);

        let mut found: Vec<(Region, f64)> = self
            .rtree
            .nearest_neighbor_iter(&[location.0, location.1])
            .take(candidate_limit)
            .filter_map(|region| {
                let dist_km = distance(
                    HaversineLocation {
                        latitude: location.0,
                        longitude: location.1,
                    },
                    HaversineLocation {
                        latitude: region.latitude,
                        longitude: region.longitude,
                    },
                    Units::Kilometers,
                );
                (dist_km <= max_distance_km).then(|| (region.clone(), dist_km))
            })
            .collect();

        found.sort_by_key(|(_, d)| OrderedFloat(*d));
        found.truncate(limit);
        found
    }
}

/// Absolute form of `listing`, used to tell snapshots apart.
///
/// Not canonicalized: the key must not change once the listing is removed.
fn listing_key(listing: &Path) -> String {
    std::path::absolute(listing)
        .unwrap_or_else(|_| listing.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

/// `<cache_dir>/regions_<stem>_<hash>.bin`, where the hash is FNV-1a over the listing key.
fn snapshot_path(listing: &Path, source: &str, cache_dir: &Path) -> PathBuf {
    let stem: String = listing
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    let hash = source.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |acc, b| {
        (acc ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
    });
    cache_dir.join(format!("{BINCODE_CACHE_FILE_PREFIX}_{stem}_{hash:016x}.bin"))
}
