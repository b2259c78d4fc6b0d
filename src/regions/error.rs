use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegionError {
    #[error("Unknown region: no centroid for geocode {0}")]
    UnknownRegion(u32),

    #[error("Failed to read region listing '{0}'")]
    ListingRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse region listing '{0}'")]
    ListingParse(PathBuf, #[source] serde_json::Error),

    #[error("Failed to read override table '{0}'")]
    OverrideRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse override table '{0}'")]
    OverrideParse(PathBuf, #[source] serde_json::Error),

    #[error("Could not determine system cache directory")]
    CacheDirResolution,

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to read cache file '{0}'")]
    CacheRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to write cache file '{0}'")]
    CacheWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to decode cache data from '{0}'")]
    CacheDecode(PathBuf, #[source] Box<bincode::error::DecodeError>),

    #[error("Failed to encode cache data")]
    CacheEncode(#[source] Box<bincode::error::EncodeError>),
}
