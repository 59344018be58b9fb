use std::fs;
use std::path::{Path, PathBuf};

use crate::error::LkError;
use crate::fs_util;
use crate::http::MastHttp;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    Ok,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub local_path: PathBuf,
    pub status: TransferStatus,
}

impl TransferOutcome {
    pub fn ok(local_path: PathBuf) -> Self {
        Self {
            local_path,
            status: TransferStatus::Ok,
        }
    }
}

/// Moves one product from the archive into the `destination` directory as
/// `destination/product_filename`. Implementations must not leave a partial
/// file at that path.
pub trait TransferClient: Send + Sync {
    fn fetch(
        &self,
        product_filename: &str,
        data_uri: &str,
        destination: &Path,
    ) -> Result<TransferOutcome, LkError>;
}

#[derive(Clone)]
pub struct MastHttpTransfer {
    http: MastHttp,
}

impl MastHttpTransfer {
    pub fn new(http: MastHttp) -> Self {
        Self { http }
    }

    /// Archive URIs go through the download gateway; plain URLs are fetched as is.
    pub fn request_for(&self, data_uri: &str) -> (String, Vec<(&'static str, String)>) {
        if data_uri.starts_with("http://") || data_uri.starts_with("https://") {
            (data_uri.to_string(), Vec::new())
        } else {
            (
                format!("{}/api/v0.1/Download/file", self.http.base_url()),
                vec![("uri", data_uri.to_string())],
            )
        }
    }
}

impl TransferClient for MastHttpTransfer {
    fn fetch(
        &self,
        product_filename: &str,
        data_uri: &str,
        destination: &Path,
    ) -> Result<TransferOutcome, LkError> {
        fs::create_dir_all(destination).map_err(|err| LkError::Filesystem(err.to_string()))?;
        let target = destination.join(product_filename);

        let (url, query) = self.request_for(data_uri);
        let temp = tempfile::Builder::new()
            .prefix("lksearch-part")
            .tempfile_in(destination)
            .map_err(|err| LkError::Filesystem(err.to_string()))?;
        let info = self.http.download_to(&url, &query, temp.path())?;

        if info.is_zip {
            // Cutout service wraps the single FITS file in a zip.
            let unpack = tempfile::Builder::new()
                .prefix("lksearch-unzip")
                .tempdir_in(destination)
                .map_err(|err| LkError::Filesystem(err.to_string()))?;
            let extracted = fs_util::extract_zip(temp.path(), unpack.path())?;
            let product = extracted
                .into_iter()
                .find(|path| {
                    path.extension()
                        .is_some_and(|ext| ext == "fits" || ext == "gz")
                })
                .ok_or_else(|| {
                    LkError::Transport(format!("archive for {data_uri} contained no FITS file"))
                })?;
            fs::rename(&product, &target).map_err(|err| LkError::Filesystem(err.to_string()))?;
            return Ok(TransferOutcome::ok(target));
        }

        if info.bytes == 0 {
            return Ok(TransferOutcome {
                local_path: target,
                status: TransferStatus::Error(format!("empty response for {data_uri}")),
            });
        }
        temp.persist(&target)
            .map_err(|err| LkError::Filesystem(err.to_string()))?;
        Ok(TransferOutcome::ok(target))
    }
}
