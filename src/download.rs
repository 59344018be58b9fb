//! Download orchestration: turns a `SearchResult` into a manifest aligned
//! with its rows. Failures of single products are recorded per entry and as
//! warnings; only invalid options abort the batch.

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use serde::Serialize;

use crate::cache::{self, CacheKey, ProductCache};
use crate::catalog::Observation;
use crate::config::ResolvedConfig;
use crate::error::{LkError, SearchWarning};
use crate::fs_util;
use crate::result::SearchResult;
use crate::transfer::{TransferClient, TransferStatus};

pub const EMPTY_RESULT_WARNING: &str = "Cannot download from an empty search result";

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Where products are placed. `None` leaves them in the product cache.
    pub download_dir: Option<Utf8PathBuf>,
    /// Fetch again even when a cached copy exists.
    pub overwrite: bool,
    /// Consult and fill the product cache.
    pub cache: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            download_dir: None,
            overwrite: false,
            cache: true,
        }
    }
}

impl DownloadOptions {
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self {
            download_dir: Some(config.download_dir.clone()),
            ..Self::default()
        }
    }

    pub fn download_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum DownloadStatus {
    Ok,
    Error(String),
}

impl DownloadStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, DownloadStatus::Ok)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestEntry {
    #[serde(rename = "productFilename")]
    pub product_filename: String,
    #[serde(rename = "dataURI")]
    pub data_uri: String,
    pub local_path: Option<Utf8PathBuf>,
    pub status: DownloadStatus,
    /// Served from the product cache without a transfer.
    pub cached: bool,
    pub downloaded_at: Option<String>,
}

impl ManifestEntry {
    fn ok(row: &Observation, local_path: Utf8PathBuf, cached: bool) -> Self {
        Self {
            product_filename: row.product_filename.clone(),
            data_uri: row.data_uri.clone(),
            local_path: Some(local_path),
            status: DownloadStatus::Ok,
            cached,
            downloaded_at: Some(Utc::now().to_rfc3339()),
        }
    }

    fn failed(row: &Observation, local_path: Option<Utf8PathBuf>, message: String) -> Self {
        Self {
            product_filename: row.product_filename.clone(),
            data_uri: row.data_uri.clone(),
            local_path,
            status: DownloadStatus::Error(message),
            cached: false,
            downloaded_at: None,
        }
    }
}

/// Ordered download report; entry `i` belongs to row `i` of the result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
    pub warnings: Vec<SearchWarning>,
}

impl Manifest {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter()
    }

    pub fn get(&self, index: usize) -> Option<&ManifestEntry> {
        self.entries.get(index)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter().filter(|entry| !entry.status.is_ok())
    }
}

pub struct Downloader<T: TransferClient> {
    transfer: T,
    cache: ProductCache,
    max_workers: usize,
}

impl<T: TransferClient> Downloader<T> {
    pub fn new(transfer: T, cache: ProductCache, max_workers: usize) -> Result<Self, LkError> {
        if max_workers == 0 {
            return Err(LkError::Configuration(
                "max_workers must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            transfer,
            cache,
            max_workers,
        })
    }

    pub fn from_config(transfer: T, config: &ResolvedConfig) -> Result<Self, LkError> {
        Self::new(transfer, ProductCache::from_config(config), config.max_workers)
    }

    pub fn cache(&self) -> &ProductCache {
        &self.cache
    }

    pub fn transfer(&self) -> &T {
        &self.transfer
    }

    pub fn download(
        &self,
        result: &SearchResult,
        options: &DownloadOptions,
    ) -> Result<Manifest, LkError> {
        if result.is_empty() {
            return Ok(Manifest {
                entries: Vec::new(),
                warnings: vec![SearchWarning::new(EMPTY_RESULT_WARNING)],
            });
        }

        let rows = result.table();
        let workers = self.max_workers.min(rows.len());
        tracing::info!(products = rows.len(), workers, "starting downloads");

        let next = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel();
        thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let next = &next;
                scope.spawn(move || {
                    loop {
                        let index = next.fetch_add(1, Ordering::SeqCst);
                        let Some(row) = rows.get(index) else {
                            break;
                        };
                        let outcome = self.download_one(row, options);
                        if tx.send((index, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(tx);

        let mut slots: Vec<Option<(ManifestEntry, Option<SearchWarning>)>> =
            vec![None; rows.len()];
        for (index, outcome) in rx {
            slots[index] = Some(outcome);
        }

        let mut manifest = Manifest::default();
        for (row, slot) in rows.iter().zip(slots) {
            let (entry, warning) = slot.unwrap_or_else(|| {
                let message = "download worker exited before this product".to_string();
                (
                    ManifestEntry::failed(row, None, message.clone()),
                    Some(SearchWarning::new(message)),
                )
            });
            manifest.entries.push(entry);
            manifest.warnings.extend(warning);
        }

        tracing::info!(
            products = manifest.len(),
            failed = manifest.failed().count(),
            "downloads finished"
        );
        Ok(manifest)
    }

    fn download_one(
        &self,
        row: &Observation,
        options: &DownloadOptions,
    ) -> (ManifestEntry, Option<SearchWarning>) {
        match self.try_download(row, options) {
            Ok(entry) => (entry, None),
            Err(err) => {
                let warning = SearchWarning::new(format!(
                    "Failed to download {} from {}: {err}",
                    row.product_filename, row.data_uri
                ));
                (ManifestEntry::failed(row, None, err.to_string()), Some(warning))
            }
        }
    }

    fn try_download(
        &self,
        row: &Observation,
        options: &DownloadOptions,
    ) -> Result<ManifestEntry, LkError> {
        let key = CacheKey::for_observation(row)?;
        let target_dir = match &options.download_dir {
            Some(dir) => dir.join(key.obs_id()),
            None => self.cache.dir_for(&key),
        };
        let target = target_dir.join(key.product_filename());

        if options.cache {
            if options.overwrite {
                self.cache.invalidate(&key)?;
            } else if let Some(cached) = self.cache.lookup(&key) {
                tracing::debug!(path = %cached, "product cache hit");
                ensure_valid(&cached)?;
                deliver(&cached, &target)?;
                return Ok(ManifestEntry::ok(row, target, true));
            }
        }

        // With the cache on, the transfer lands in the cache and is copied out.
        let fetch_dir = if options.cache {
            self.cache.dir_for(&key)
        } else {
            target_dir
        };
        let outcome = self.transfer.fetch(
            &row.product_filename,
            &row.data_uri,
            fetch_dir.as_std_path(),
        )?;
        if let TransferStatus::Error(message) = outcome.status {
            return Err(LkError::Transport(message));
        }
        let fetched = Utf8PathBuf::from_path_buf(outcome.local_path)
            .map_err(|_| LkError::Filesystem("non UTF-8 download path".to_string()))?;
        if let Err(err) = fs_util::validate_product(fetched.as_std_path()) {
            // A rejected transfer must not look like a cached product.
            discard(&fetched);
            return Err(LkError::Transport(format!(
                "{} failed validation after transfer: {err}",
                row.product_filename
            )));
        }

        if options.cache {
            self.cache.store(&key, &fetched, &row.data_uri)?;
        }
        deliver(&fetched, &target)?;
        tracing::debug!(path = %target, "downloaded product");
        Ok(ManifestEntry::ok(row, target, false))
    }
}

fn ensure_valid(path: &Utf8Path) -> Result<(), LkError> {
    fs_util::validate_product(path.as_std_path()).map_err(|err| {
        LkError::Filesystem(format!(
            "{path} may be corrupt; download again with overwrite enabled ({err})"
        ))
    })
}

fn discard(path: &Utf8Path) {
    if let Err(err) = fs::remove_file(path.as_std_path()) {
        tracing::warn!(%path, error = %err, "failed to remove rejected download");
    }
}

fn deliver(source: &Utf8Path, target: &Utf8Path) -> Result<(), LkError> {
    if source == target {
        return Ok(());
    }
    cache::copy_file_atomic(source, target)
}
