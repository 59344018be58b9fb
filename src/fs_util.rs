use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use zip::ZipArchive;

use crate::error::LkError;

/// Extracts every file of a zip archive into `target_dir` and returns the
/// extracted paths in archive order.
pub fn extract_zip(zip_path: &Path, target_dir: &Path) -> Result<Vec<PathBuf>, LkError> {
    let file = fs::File::open(zip_path)
        .map_err(|err| LkError::Filesystem(format!("open zip {}: {err}", zip_path.display())))?;
    let mut archive = ZipArchive::new(file).map_err(|err| LkError::Filesystem(err.to_string()))?;

    let mut extracted = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| LkError::Filesystem(err.to_string()))?;
        let entry_path = match entry.enclosed_name() {
            Some(path) => target_dir.join(path),
            None => {
                return Err(LkError::Filesystem(
                    "zip entry path traversal detected".to_string(),
                ));
            }
        };

        if entry.is_dir() {
            fs::create_dir_all(&entry_path).map_err(|err| LkError::Filesystem(err.to_string()))?;
            continue;
        }

        if let Some(parent) = entry_path.parent() {
            fs::create_dir_all(parent).map_err(|err| LkError::Filesystem(err.to_string()))?;
        }
        let mut outfile =
            fs::File::create(&entry_path).map_err(|err| LkError::Filesystem(err.to_string()))?;
        io::copy(&mut entry, &mut outfile).map_err(|err| LkError::Filesystem(err.to_string()))?;
        extracted.push(entry_path);
    }
    Ok(extracted)
}

/// Cheap integrity check for a product on disk: it must be non-empty, and a
/// gzip file must decompress to the end.
pub fn validate_product(path: &Path) -> Result<(), LkError> {
    let metadata =
        fs::metadata(path).map_err(|err| LkError::Filesystem(format!("{}: {err}", path.display())))?;
    if metadata.len() == 0 {
        return Err(LkError::Filesystem(format!("{} is empty", path.display())));
    }
    if path.extension().is_some_and(|ext| ext == "gz") {
        let file = fs::File::open(path).map_err(|err| LkError::Filesystem(err.to_string()))?;
        io::copy(&mut GzDecoder::new(file), &mut io::sink())
            .map_err(|err| LkError::Filesystem(format!("{}: {err}", path.display())))?;
    }
    Ok(())
}
