use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::sync::Arc;

use crate::cadence::{self, Cadence};
use crate::catalog::{Observation, ProductKind};
use crate::domain::Mission;
use crate::download::{DownloadOptions, Downloader, Manifest};
use crate::error::LkError;
use crate::normalize;
use crate::pipeline;
use crate::transfer::TransferClient;

/// Immutable, ordered view over a canonical table. Every selection returns a
/// new `SearchResult`; the rows themselves are never mutated.
#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    rows: Arc<[Observation]>,
}

impl SearchResult {
    /// Builds a result from arbitrary rows, restoring canonical order and
    /// dropping duplicate products.
    pub fn new(rows: Vec<Observation>) -> Self {
        Self::from_canonical(normalize::sort_and_dedup(rows))
    }

    pub fn empty() -> Self {
        Self::default()
    }

    // Rows must already be unique and in canonical order.
    pub(crate) fn from_canonical(rows: Vec<Observation>) -> Self {
        Self { rows: rows.into() }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn table(&self) -> &[Observation] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.rows.iter()
    }

    /// Single row as its own result; negative indices count from the end.
    pub fn get(&self, index: isize) -> Option<SearchResult> {
        let position = self.wrap(index)?;
        Some(Self::from_canonical(vec![self.rows[position].clone()]))
    }

    pub fn row(&self, index: isize) -> Option<&Observation> {
        self.wrap(index).map(|position| &self.rows[position])
    }

    /// Python slice semantics: negative bounds count from the end, bounds are
    /// clamped, an empty or inverted range yields an empty result.
    pub fn slice(&self, start: Option<isize>, end: Option<isize>) -> SearchResult {
        let len = self.len() as isize;
        let clamp = |value: isize| {
            if value < 0 {
                (value + len).max(0)
            } else {
                value.min(len)
            }
        };
        let start = start.map(clamp).unwrap_or(0) as usize;
        let end = end.map(clamp).unwrap_or(len) as usize;
        if start >= end {
            return Self::empty();
        }
        Self::from_canonical(self.rows[start..end].to_vec())
    }

    pub fn range<R: RangeBounds<usize>>(&self, range: R) -> SearchResult {
        let start = match range.start_bound() {
            Bound::Included(value) => Some(saturating_index(*value)),
            Bound::Excluded(value) => Some(saturating_index(*value).saturating_add(1)),
            Bound::Unbounded => None,
        };
        let end = match range.end_bound() {
            Bound::Included(value) => Some(saturating_index(*value).saturating_add(1)),
            Bound::Excluded(value) => Some(saturating_index(*value)),
            Bound::Unbounded => None,
        };
        self.slice(start, end)
    }

    /// Boolean mask aligned with the rows.
    pub fn mask(&self, mask: &[bool]) -> Result<SearchResult, LkError> {
        if mask.len() != self.len() {
            return Err(LkError::Configuration(format!(
                "mask has {} entries but the result has {} rows",
                mask.len(),
                self.len()
            )));
        }
        let rows = self
            .rows
            .iter()
            .zip(mask)
            .filter(|(_, keep)| **keep)
            .map(|(row, _)| row.clone())
            .collect();
        Ok(Self::from_canonical(rows))
    }

    pub fn filter<F>(&self, predicate: F) -> SearchResult
    where
        F: Fn(&Observation) -> bool,
    {
        Self::from_canonical(
            self.rows
                .iter()
                .filter(|row| predicate(row))
                .cloned()
                .collect(),
        )
    }

    pub fn filter_table(&self, filter: &TableFilter) -> SearchResult {
        let mut rows: Vec<Observation> = self
            .rows
            .iter()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect();
        if let Some(limit) = filter.limit {
            rows.truncate(limit);
        }
        Self::from_canonical(rows)
    }

    /// Image-stack products: target pixel files and cutouts.
    pub fn cubedata(&self) -> SearchResult {
        self.filter(|row| row.kind.is_cube())
    }

    pub fn timeseries(&self) -> SearchResult {
        self.filter(|row| row.kind.is_timeseries())
    }

    pub fn target_name(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.target_name.as_str()).collect()
    }

    pub fn mission(&self) -> Vec<Mission> {
        self.rows.iter().map(|row| row.mission).collect()
    }

    pub fn pipeline(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.pipeline.as_str()).collect()
    }

    pub fn exptime(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.exptime).collect()
    }

    pub fn obs_id(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.obs_id.as_str()).collect()
    }

    pub fn ra(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.ra).collect()
    }

    pub fn dec(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.dec).collect()
    }

    pub fn distance(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.distance).collect()
    }

    pub fn product_filename(&self) -> Vec<&str> {
        self.rows
            .iter()
            .map(|row| row.product_filename.as_str())
            .collect()
    }

    pub fn data_uri(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.data_uri.as_str()).collect()
    }

    pub fn to_json(&self) -> Result<String, LkError> {
        serde_json::to_string_pretty(&*self.rows)
            .map_err(|err| LkError::Filesystem(err.to_string()))
    }

    pub fn download<T: TransferClient>(
        &self,
        downloader: &Downloader<T>,
        options: &DownloadOptions,
    ) -> Result<Manifest, LkError> {
        downloader.download(self, options)
    }

    fn wrap(&self, index: isize) -> Option<usize> {
        let len = self.len() as isize;
        let position = if index < 0 { index + len } else { index };
        (0..len).contains(&position).then_some(position as usize)
    }
}

// Unsigned bounds never count from the end.
fn saturating_index(value: usize) -> isize {
    isize::try_from(value).unwrap_or(isize::MAX)
}

impl PartialEq for SearchResult {
    fn eq(&self, other: &Self) -> bool {
        self.rows[..] == other.rows[..]
    }
}

impl<'a> IntoIterator for &'a SearchResult {
    type Item = &'a Observation;
    type IntoIter = std::slice::Iter<'a, Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SearchResult containing {} data products.", self.len())?;
        writeln!(
            f,
            "{:>4}  {:<7} {:<6} {:<16} {:<10} {:>9} {:>9}  {}",
            "#", "mission", "obs_id", "target_name", "pipeline", "exptime", "distance", "productFilename"
        )?;
        if self.is_empty() {
            return writeln!(f, "No results");
        }
        for (index, row) in self.rows.iter().enumerate() {
            writeln!(
                f,
                "{:>4}  {:<7} {:<6} {:<16} {:<10} {:>9.1} {:>9.2}  {}",
                index,
                row.mission.to_string(),
                row.obs_id,
                row.target_name,
                row.pipeline,
                row.exptime,
                row.distance,
                row.product_filename
            )?;
        }
        Ok(())
    }
}

/// Post-hoc predicates for `SearchResult::filter_table`. Unset fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct TableFilter {
    pub limit: Option<usize>,
    pub exptime: Option<Cadence>,
    pub pipeline: Vec<String>,
    pub mission: Option<Mission>,
    pub sequence: Vec<u32>,
    pub obs_id: Vec<String>,
    pub kind: Option<ProductKind>,
}

impl TableFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn exptime(mut self, exptime: impl Into<Cadence>) -> Self {
        self.exptime = Some(exptime.into());
        self
    }

    pub fn pipeline(mut self, name: &str) -> Self {
        self.pipeline.push(pipeline::canonicalize(name));
        self
    }

    pub fn mission(mut self, mission: Mission) -> Self {
        self.mission = Some(mission);
        self
    }

    /// Quarter, campaign or sector number.
    pub fn sequence(mut self, sequence: u32) -> Self {
        self.sequence.push(sequence);
        self
    }

    pub fn obs_id(mut self, obs_id: impl Into<String>) -> Self {
        self.obs_id.push(obs_id.into());
        self
    }

    pub fn kind(mut self, kind: ProductKind) -> Self {
        self.kind = Some(kind);
        self
    }

    fn matches(&self, row: &Observation) -> bool {
        self.exptime
            .is_none_or(|exptime| cadence::matches(exptime, row.mission, row.exptime))
            && (self.pipeline.is_empty() || pipeline::contains(&self.pipeline, &row.pipeline))
            && self.mission.is_none_or(|mission| mission == row.mission)
            && (self.sequence.is_empty() || self.sequence.contains(&row.sequence))
            && (self.obs_id.is_empty() || self.obs_id.iter().any(|id| *id == row.obs_id))
            && self.kind.is_none_or(|kind| kind == row.kind)
    }
}
