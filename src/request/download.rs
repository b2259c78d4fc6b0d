use crate::request::cds_request::{CdsRequest, DATASET};
use crate::request::date_range::DateRangeResolver;
use crate::request::error::{DateRangeError, DownloadError, RetrievalError};
use crate::types::bounding_box::{BoundingBox, BRAZIL_AREA};
use crate::utils::{ensure_dir_exists, get_data_dir};
use bon::bon;
use log::{info, warn};
use std::path::{Path, PathBuf};

const DEFAULT_FILE_PREFIX: &str = "BR";

/// Performs the transfer of a request's result into `target`.
///
/// Implementations talk to the data store; they must return an error rather than
/// an empty success when nothing was produced.
pub trait Retriever: Send + Sync {
    fn retrieve(
        &self,
        dataset: &str,
        request: &CdsRequest,
        target: &Path,
    ) -> Result<(), RetrievalError>;
}

/// Fetches reanalysis files for a date or range into a data directory.
///
/// Files are named `<prefix>_<YYYYMMDD>.nc` or `<prefix>_<YYYYMMDD>_<YYYYMMDD>.nc`.
/// A file already present under that name is returned as is.
pub struct NetcdfDownloader {
    retriever: Box<dyn Retriever>,
    data_dir: PathBuf,
    area: BoundingBox,
    prefix: String,
    resolver: DateRangeResolver,
}

#[bon]
impl NetcdfDownloader {
    /// Creates a downloader.
    ///
    /// # Arguments
    ///
    /// * `.retriever(Box<dyn Retriever>)`: **Required.** Performs the actual transfer.
    /// * `.data_dir(PathBuf)`: Optional. Defaults to `~/copernicus_data`.
    /// * `.area(BoundingBox)`: Optional. Defaults to [`BRAZIL_AREA`].
    /// * `.prefix(String)`: Optional. File name prefix, defaults to `BR`.
    /// * `.resolver(DateRangeResolver)`: Optional. Defaults to one anchored on today.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::DataDirResolution`] if no data directory was given
    /// and the home directory cannot be determined.
    #[builder]
    pub fn new(
        retriever: Box<dyn Retriever>,
        data_dir: Option<PathBuf>,
        area: Option<BoundingBox>,
        prefix: Option<String>,
        resolver: Option<DateRangeResolver>,
    ) -> Result<Self, DownloadError> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => get_data_dir().ok_or(DownloadError::DataDirResolution)?,
        };
        Ok(Self {
            retriever,
            data_dir,
            area: area.unwrap_or(BRAZIL_AREA),
            prefix: prefix.unwrap_or_else(|| DEFAULT_FILE_PREFIX.to_string()),
            resolver: resolver.unwrap_or_default(),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Downloads the file for `date` (or `date..=date_end`) and returns its path.
    ///
    /// Without a date, the most recent published day is fetched.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::Date`] for rejected dates, before anything is requested.
    ///   An end date without a start date is an invalid range.
    /// - [`DownloadError::DataDirCreation`] if the data directory cannot be created.
    /// - [`DownloadError::Retrieval`] if the retriever fails.
    /// - [`DownloadError::MissingOutput`] if the retriever succeeded but wrote nothing.
    #[builder]
    pub fn download(
        &self,
        date: Option<&str>,
        date_end: Option<&str>,
    ) -> Result<PathBuf, DownloadError> {
        let (params, stem) = match (date, date_end) {
            (Some(date), None) => (self.resolver.format(date, None)?, date.to_string()),
            (Some(date), Some(end)) => (
                self.resolver.format(date, Some(end))?,
                format!("{date}_{end}"),
            ),
            (None, None) => {
                let latest = self.resolver.latest();
                warn!("No date provided, downloading last available date: {latest}");
                (
                    self.resolver.format_latest(),
                    latest.format("%Y-%m-%d").to_string(),
                )
            }
            (None, Some(_)) => {
                return Err(DateRangeError::InvalidDateRange(
                    "an end date requires a start date".to_string(),
                )
                .into())
            }
        };

        let filename = format!("{}_{}.nc", self.prefix, stem.replace('-', ""));
        ensure_dir_exists(&self.data_dir)
            .map_err(|e| DownloadError::DataDirCreation(self.data_dir.clone(), e))?;
        let target = self.data_dir.join(&filename);

        if target.exists() {
            info!("{} already present, skipping download", target.display());
            return Ok(target);
        }

        let request = CdsRequest::reanalysis(params, &self.area);
        self.retriever
            .retrieve(DATASET, &request, &target)
            .map_err(|source| DownloadError::Retrieval {
                file: target.clone(),
                source,
            })?;
        if !target.exists() {
            return Err(DownloadError::MissingOutput(target));
        }
        info!("NetCDF {} downloaded at {}", filename, self.data_dir.display());
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::date_range::DateAxis;
    use chrono::NaiveDate;
    use std::sync::{Arc, Mutex};

    /// Records requests and writes a placeholder file when `write` is set.
    #[derive(Clone, Default)]
    struct RecordingRetriever {
        write: bool,
        requests: Arc<Mutex<Vec<CdsRequest>>>,
    }

    impl Retriever for RecordingRetriever {
        fn retrieve(
            &self,
            dataset: &str,
            request: &CdsRequest,
            target: &Path,
        ) -> Result<(), RetrievalError> {
            assert_eq!(dataset, DATASET);
            self.requests.lock().unwrap().push(request.clone());
            if self.write {
                std::fs::write(target, b"CDF")?;
            }
            Ok(())
        }
    }

    struct FailingRetriever;

    impl Retriever for FailingRetriever {
        fn retrieve(&self, _: &str, _: &CdsRequest, _: &Path) -> Result<(), RetrievalError> {
            Err("quota exceeded".into())
        }
    }

    fn downloader(retriever: Box<dyn Retriever>, dir: &Path) -> NetcdfDownloader {
        NetcdfDownloader::builder()
            .retriever(retriever)
            .data_dir(dir.to_path_buf())
            .resolver(DateRangeResolver::with_today(
                NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            ))
            .build()
            .unwrap()
    }

    #[test]
    fn test_download_single_date() {
        let tmp = tempfile::tempdir().unwrap();
        let retriever = RecordingRetriever {
            write: true,
            ..Default::default()
        };
        let requests = retriever.requests.clone();
        let dl = downloader(Box::new(retriever), tmp.path());

        let path = dl.download().date("2023-01-01").call().unwrap();
        assert_eq!(path, tmp.path().join("BR_20230101.nc"));

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].day, DateAxis::single("01"));
        assert_eq!(requests[0].area, BRAZIL_AREA.to_area());
    }

    #[test]
    fn test_existing_file_is_not_downloaded_again() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("BR_20230101_20230131.nc"), b"CDF").unwrap();
        let retriever = RecordingRetriever::default();
        let requests = retriever.requests.clone();
        let dl = downloader(Box::new(retriever), tmp.path());

        let path = dl
            .download()
            .date("2023-01-01")
            .date_end("2023-01-31")
            .call()
            .unwrap();
        assert_eq!(path, tmp.path().join("BR_20230101_20230131.nc"));
        assert!(requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_latest_date_by_default() {
        let tmp = tempfile::tempdir().unwrap();
        let retriever = RecordingRetriever {
            write: true,
            ..Default::default()
        };
        let dl = downloader(Box::new(retriever), tmp.path());
        let path = dl.download().call().unwrap();
        assert_eq!(path, tmp.path().join("BR_20240524.nc"));
    }

    #[test]
    fn test_failures_are_surfaced() {
        let tmp = tempfile::tempdir().unwrap();

        let dl = downloader(Box::new(FailingRetriever), tmp.path());
        assert!(matches!(
            dl.download().date("2023-01-01").call(),
            Err(DownloadError::Retrieval { .. })
        ));

        let dl = downloader(Box::new(RecordingRetriever::default()), tmp.path());
        assert!(matches!(
            dl.download().date("2023-01-01").call(),
            Err(DownloadError::MissingOutput(_))
        ));
    }

    #[test]
    fn test_bad_dates_are_rejected_before_requesting() {
        let tmp = tempfile::tempdir().unwrap();
        let retriever = RecordingRetriever::default();
        let requests = retriever.requests.clone();
        let dl = downloader(Box::new(retriever), tmp.path());

        assert!(matches!(
            dl.download().date("2024-05-30").call(),
            Err(DownloadError::Date(DateRangeError::DateTooRecent { .. }))
        ));
        assert!(matches!(
            dl.download().date_end("2023-01-31").call(),
            Err(DownloadError::Date(DateRangeError::InvalidDateRange(_)))
        ));
        assert!(requests.lock().unwrap().is_empty());
    }
}
