use log::info;
use std::io;
use std::path::{Path, PathBuf};

const CACHE_DIR_NAME: &str = "reanalysis_cache";
const DATA_DIR_NAME: &str = "copernicus_data";

/// `<system cache dir>/reanalysis_cache`, if the platform has a cache directory.
pub fn get_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|p| p.join(CACHE_DIR_NAME))
}

/// `~/copernicus_data`, where downloaded reanalysis files land by default.
pub fn get_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(DATA_DIR_NAME))
}

pub fn ensure_dir_exists(path: &Path) -> io::Result<()> {
    match std::fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("Path exists but is not a directory: {}", path.display()),
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("Creating directory: {}", path.display());
            std::fs::create_dir_all(path)
        }
        Err(e) => Err(e),
    }
}
