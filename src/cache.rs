use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::catalog::Observation;
use crate::config::ResolvedConfig;
use crate::error::LkError;

/// Identifies one materialized product: observing period plus product filename.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    obs_id: String,
    product_filename: String,
}

impl CacheKey {
    pub fn new(obs_id: &str, product_filename: &str) -> Result<Self, LkError> {
        Ok(Self {
            obs_id: path_component(obs_id)?,
            product_filename: path_component(product_filename)?,
        })
    }

    pub fn for_observation(row: &Observation) -> Result<Self, LkError> {
        Self::new(&row.obs_id, &row.product_filename)
    }

    pub fn obs_id(&self) -> &str {
        &self.obs_id
    }

    pub fn product_filename(&self) -> &str {
        &self.product_filename
    }
}

/// Products already fetched, laid out as `root/<obs_id>/<productFilename>`.
/// Entries never expire; only `invalidate` and `clear` remove them.
#[derive(Debug, Clone)]
pub struct ProductCache {
    root: Utf8PathBuf,
}

impl ProductCache {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self::new(config.cache_dir.clone())
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn key(&self, row: &Observation) -> Result<CacheKey, LkError> {
        CacheKey::for_observation(row)
    }

    pub fn dir_for(&self, key: &CacheKey) -> Utf8PathBuf {
        self.root.join(&key.obs_id)
    }

    pub fn path_for(&self, key: &CacheKey) -> Utf8PathBuf {
        self.dir_for(key).join(&key.product_filename)
    }

    pub fn lookup(&self, key: &CacheKey) -> Option<Utf8PathBuf> {
        let path = self.path_for(key);
        path.as_std_path().is_file().then_some(path)
    }

    /// Copies `source` into the cache and records where it came from.
    pub fn store(
        &self,
        key: &CacheKey,
        source: &Utf8Path,
        data_uri: &str,
    ) -> Result<Utf8PathBuf, LkError> {
        let dest = self.path_for(key);
        if source != dest.as_path() {
            copy_file_atomic(source, &dest)?;
        }
        write_metadata(
            &self.metadata_path(key),
            &CacheMetadata {
                obs_id: key.obs_id.clone(),
                product_filename: key.product_filename.clone(),
                data_uri: data_uri.to_string(),
                cached_at: Utc::now().to_rfc3339(),
                tool: format!("lksearch/{}", env!("CARGO_PKG_VERSION")),
            },
        )?;
        Ok(dest)
    }

    pub fn metadata(&self, key: &CacheKey) -> Option<CacheMetadata> {
        let content = fs::read_to_string(self.metadata_path(key).as_std_path()).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Removes one entry. Returns whether anything was there.
    pub fn invalidate(&self, key: &CacheKey) -> Result<bool, LkError> {
        let path = self.path_for(key);
        let existed = path.as_std_path().exists();
        if existed {
            fs::remove_file(path.as_std_path())
                .map_err(|err| LkError::Filesystem(err.to_string()))?;
            tracing::debug!(%path, "invalidated cached product");
        }
        let metadata = self.metadata_path(key);
        if metadata.as_std_path().exists() {
            fs::remove_file(metadata.as_std_path())
                .map_err(|err| LkError::Filesystem(err.to_string()))?;
        }
        Ok(existed)
    }

    pub fn clear(&self) -> Result<(), LkError> {
        if self.root.as_std_path().exists() {
            fs::remove_dir_all(self.root.as_std_path())
                .map_err(|err| LkError::Filesystem(err.to_string()))?;
        }
        Ok(())
    }

    fn metadata_path(&self, key: &CacheKey) -> Utf8PathBuf {
        self.root
            .join(".metadata")
            .join(&key.obs_id)
            .join(format!("{}.json", key.product_filename))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub obs_id: String,
    pub product_filename: String,
    pub data_uri: String,
    pub cached_at: String,
    pub tool: String,
}

pub fn write_metadata(path: &Utf8Path, metadata: &CacheMetadata) -> Result<(), LkError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| LkError::Filesystem(err.to_string()))?;
    }
    let tmp_path = path.with_extension("json.tmp");
    let content =
        serde_json::to_vec_pretty(metadata).map_err(|err| LkError::Filesystem(err.to_string()))?;
    fs::write(tmp_path.as_std_path(), &content)
        .map_err(|err| LkError::Filesystem(err.to_string()))?;
    fs::rename(tmp_path.as_std_path(), path.as_std_path())
        .map_err(|err| LkError::Filesystem(err.to_string()))?;
    Ok(())
}

pub fn copy_file_atomic(source: &Utf8Path, dest: &Utf8Path) -> Result<(), LkError> {
    let parent = dest
        .parent()
        .ok_or_else(|| LkError::Filesystem("invalid destination path".to_string()))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| LkError::Filesystem(err.to_string()))?;
    let temp = tempfile::Builder::new()
        .prefix("lksearch-file")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| LkError::Filesystem(err.to_string()))?;
    fs::copy(source.as_std_path(), temp.path())
        .map_err(|err| LkError::Filesystem(err.to_string()))?;
    temp.persist(dest.as_std_path())
        .map_err(|err| LkError::Filesystem(err.to_string()))?;
    Ok(())
}

fn path_component(value: &str) -> Result<String, LkError> {
    let trimmed = value.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\'])
    {
        return Err(LkError::Filesystem(format!(
            "invalid cache key component: {value:?}"
        )));
    }
    Ok(trimmed.to_string())
}
