use crate::error::ReanalysisError;
use crate::grid::dataset::GriddedDataset;
use crate::grid::loader::DatasetLoader;
use crate::grid::slicer::slice;
use crate::regions::bounding_box::{BoundingBoxResolver, OverrideTable, DEFAULT_DELTA_DEG};
use crate::regions::error::RegionError;
use crate::regions::gazetteer::RegionGazetteer;
use crate::types::bounding_box::BoundingBox;
use crate::types::region_table::RegionTable;
use crate::weather_data::aggregate::{aggregate_daily, sub_daily_frame, DATE_COLUMN, GEOCODE_COLUMN};
use crate::weather_data::error::AggregationError;
use crate::weather_data::result_cache::{CacheKey, ResultCache};
use crate::weather_data::units::{convert, ConvertedSeries};
use bon::bon;
use log::{debug, info, warn};
use polars::prelude::*;
use std::path::Path;
use std::sync::Arc;

/// Extracts per-region daily weather tables from reanalysis files.
///
/// The `Extractor` owns the region gazetteer, the bounding box resolver, a
/// [`DatasetLoader`] and a [`ResultCache`]. Once a `(file, geocode)` table is
/// computed, later calls return it from the cache without touching the file.
/// Concurrent misses on the same pair may each compute it; the first table stored
/// is the one every caller gets back.
///
/// # Examples
///
/// ```no_run
/// use reanalysis::{DatasetLoader, Extractor, RegionGazetteer};
/// use std::path::Path;
///
/// fn print_daily(loader: Box<dyn DatasetLoader>) -> Result<(), Box<dyn std::error::Error>> {
///     let gazetteer = RegionGazetteer::from_json_file(Path::new("municipios.json"))?;
///     let extractor = Extractor::builder()
///         .gazetteer(gazetteer)
///         .loader(loader)
///         .build();
///
///     let table = extractor.extract("BR_20230101.nc", 4108304)?;
///     for record in table.records()? {
///         println!("{} {:?}", record.date, record.temp_med);
///     }
///     Ok(())
/// }
/// ```
pub struct Extractor {
    gazetteer: RegionGazetteer,
    boxes: BoundingBoxResolver,
    loader: Box<dyn DatasetLoader>,
    cache: ResultCache,
}

/// Result of [`Extractor::extract_batch`]: the tables that were produced and the
/// regions that failed, each with its own error.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub tables: Vec<Arc<RegionTable>>,
    pub failures: Vec<(u32, ReanalysisError)>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// All tables in one frame with a `geocodigo` column after `date`, sorted by
    /// date then geocode. Columns missing from some regions are filled with nulls.
    ///
    /// Returns `None` when no region succeeded.
    pub fn combined(&self) -> Result<Option<DataFrame>, AggregationError> {
        if self.tables.is_empty() {
            return Ok(None);
        }
        let frames: Vec<LazyFrame> = self
            .tables
            .iter()
            .map(|table| table.with_geocode_column())
            .collect();
        let combined = concat_lf_diagonal(frames, UnionArgs::default())?
            .sort(
                [DATE_COLUMN, GEOCODE_COLUMN],
                SortMultipleOptions::default(),
            )
            .collect()?;
        Ok(Some(combined))
    }
}

#[bon]
impl Extractor {
    /// Creates an extractor.
    ///
    /// # Arguments
    ///
    /// * `.gazetteer(RegionGazetteer)`: **Required.** Centroids of the known regions.
    /// * `.loader(Box<dyn DatasetLoader>)`: **Required.** Reads the grid files.
    /// * `.overrides(OverrideTable)`: Optional. Hand-tuned boxes. Defaults to
    ///   [`OverrideTable::default`], which carries the built-in entries.
    /// * `.delta_deg(f64)`: Optional. Half-width of computed boxes. Defaults to
    ///   [`DEFAULT_DELTA_DEG`].
    #[builder]
    pub fn new(
        gazetteer: RegionGazetteer,
        loader: Box<dyn DatasetLoader>,
        overrides: Option<OverrideTable>,
        delta_deg: Option<f64>,
    ) -> Self {
        let boxes = BoundingBoxResolver::new(
            delta_deg.unwrap_or(DEFAULT_DELTA_DEG),
            overrides.unwrap_or_default(),
        );
        Self {
            gazetteer,
            boxes,
            loader,
            cache: ResultCache::new(),
        }
    }

    pub fn gazetteer(&self) -> &RegionGazetteer {
        &self.gazetteer
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// The box sampled for `geocode`.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::UnknownRegion`] if the gazetteer has no such region.
    pub fn region_box(&self, geocode: u32) -> Result<BoundingBox, RegionError> {
        let centroid = self.gazetteer.lookup(geocode)?;
        Ok(self.boxes.resolve_for(geocode, centroid))
    }

    /// Extracts the daily table of one region from one file.
    ///
    /// Resolves the region's box, loads the grid, averages the selected grid
    /// points, converts units and aggregates per day. The result is memoized on
    /// `(file, geocode)`.
    ///
    /// # Errors
    ///
    /// - [`ReanalysisError::Region`] for unknown geocodes.
    /// - [`ReanalysisError::Grid`] if the file cannot be loaded or the box lies
    ///   outside the grid.
    /// - [`ReanalysisError::Aggregation`] if building the table fails.
    pub fn extract(
        &self,
        file: impl AsRef<Path>,
        geocode: u32,
    ) -> Result<Arc<RegionTable>, ReanalysisError> {
        let file = file.as_ref();
        let key = CacheKey::new(file, geocode);
        if let Some(table) = self.cache.get(&key) {
            debug!("Cache hit for {} in {}", geocode, file.display());
            return Ok(table);
        }

        let bbox = self.region_box(geocode)?;
        let dataset = self.load(file)?;
        let table = self.summarize(&dataset, geocode, &bbox)?;
        Ok(self.cache.insert(key, table))
    }

    /// Extracts several regions from one file.
    ///
    /// The file is loaded at most once, and only if some region is not cached yet.
    /// A region that fails is recorded in [`BatchOutcome::failures`] and does not
    /// stop the others. Tables come back in the order of `geocodes`.
    ///
    /// # Errors
    ///
    /// Only a failure to load the file itself aborts the batch.
    pub fn extract_batch(
        &self,
        file: impl AsRef<Path>,
        geocodes: &[u32],
    ) -> Result<BatchOutcome, ReanalysisError> {
        let file = file.as_ref();
        let mut tables = Vec::with_capacity(geocodes.len());
        let mut failures = Vec::new();
        let mut pending = Vec::new();

        for (position, &geocode) in geocodes.iter().enumerate() {
            let key = CacheKey::new(file, geocode);
            if let Some(table) = self.cache.get(&key) {
                tables.push((position, table));
                continue;
            }
            match self.region_box(geocode) {
                Ok(bbox) => pending.push((position, key, bbox)),
                Err(e) => {
                    warn!("Skipping {}: {}", geocode, e);
                    failures.push((geocode, e.into()));
                }
            }
        }

        if !pending.is_empty() {
            let dataset = self.load(file)?;
            for (position, key, bbox) in pending {
                let geocode = key.geocode;
                match self.summarize(&dataset, geocode, &bbox) {
                    Ok(table) => {
                        debug!("{} added", geocode);
                        tables.push((position, self.cache.insert(key, table)));
                    }
                    Err(e) => {
                        warn!("Skipping {}: {}", geocode, e);
                        failures.push((geocode, e));
                    }
                }
            }
        }

        tables.sort_by_key(|(position, _)| *position);
        info!(
            "Extracted {} of {} regions from {}",
            tables.len(),
            geocodes.len(),
            file.display()
        );
        Ok(BatchOutcome {
            tables: tables.into_iter().map(|(_, table)| table).collect(),
            failures,
        })
    }

    /// Converted values of one region at the native time resolution of the file.
    ///
    /// Columns are `time` followed by `temp`, `precip`, `pressao` and `umid` when
    /// available. Not cached.
    pub fn extract_sub_daily(
        &self,
        file: impl AsRef<Path>,
        geocode: u32,
    ) -> Result<DataFrame, ReanalysisError> {
        let bbox = self.region_box(geocode)?;
        let dataset = self.load(file.as_ref())?;
        let converted = Self::converted(&dataset, &bbox)?;
        Ok(sub_daily_frame(&converted)?)
    }

    fn load(&self, file: &Path) -> Result<GriddedDataset, ReanalysisError> {
        debug!("Loading {}", file.display());
        Ok(self.loader.load(file)?)
    }

    fn converted(
        dataset: &GriddedDataset,
        bbox: &BoundingBox,
    ) -> Result<ConvertedSeries, ReanalysisError> {
        let sliced = slice(dataset, bbox)?;
        Ok(convert(sliced))
    }

    fn summarize(
        &self,
        dataset: &GriddedDataset,
        geocode: u32,
        bbox: &BoundingBox,
    ) -> Result<RegionTable, ReanalysisError> {
        let converted = Self::converted(dataset, bbox)?;
        let frame = aggregate_daily(&converted)?;
        Ok(RegionTable::new(geocode, frame))
    }
}

#[cfg(feature = "netcdf")]
impl Extractor {
    /// An extractor reading NetCDF files with the built-in overrides and default box size.
    pub fn with_netcdf(gazetteer: RegionGazetteer) -> Self {
        Self::builder()
            .gazetteer(gazetteer)
            .loader(Box::new(crate::grid::loader::NetCdfLoader))
            .build()
    }
}
