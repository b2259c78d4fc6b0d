mod error;
mod extractor;
mod grid;
mod regions;
mod request;
mod types;
mod utils;
mod weather_data;

pub use error::ReanalysisError;
pub use extractor::*;

pub use grid::dataset::{decode_cf_times, GriddedDataset, NATIVE_RESOLUTION_DEG};
pub use grid::loader::{DatasetLoader, MemoryLoader};
#[cfg(feature = "netcdf")]
pub use grid::loader::NetCdfLoader;
pub use grid::slicer::{slice, SlicedSeries};

pub use regions::bounding_box::{
    BoundingBoxResolver, OverrideTable, DEFAULT_DELTA_DEG, FOZ_DO_IGUACU,
};
pub use regions::gazetteer::RegionGazetteer;

pub use request::cds_request::{CdsRequest, DATASET, SYNOPTIC_TIMES};
pub use request::date_range::{
    DateAxis, DateParams, DateRangeResolver, MAX_SPAN_DAYS, PUBLICATION_LAG_DAYS,
};
pub use request::download::{NetcdfDownloader, Retriever};

pub use types::bounding_box::{BoundingBox, BRAZIL_AREA};
pub use types::region::{LatLon, Region};
pub use types::region_record::RegionRecord;
pub use types::region_table::RegionTable;
pub use types::variable::{Measure, RawVariable};

pub use weather_data::aggregate::{aggregate_daily, sub_daily_frame, DATE_COLUMN, GEOCODE_COLUMN, TIME_COLUMN};
pub use weather_data::result_cache::{CacheKey, ResultCache};
pub use weather_data::units::{
    convert, kelvin_to_celsius, meters_to_millimeters, pascals_to_atmospheres,
    relative_humidity, ConvertedSeries,
};

pub use grid::error::GridError;
pub use regions::error::RegionError;
pub use request::error::{DateRangeError, DownloadError, RetrievalError};
pub use weather_data::error::AggregationError;
