//! Turns a raw, mission-heterogeneous archive catalog into the canonical
//! table: aliases resolved, filters applied, split campaigns relabelled,
//! duplicates removed and rows in canonical order.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::cadence::{self, Cadence};
use crate::campaign;
use crate::catalog::{Observation, RawProduct};
use crate::domain::{Mission, SkyCoord, TargetId};
use crate::error::LkError;
use crate::mission::MissionStrategy;
use crate::pipeline;

pub const DEFAULT_NEAREST_TOLERANCE_ARCSEC: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct QueryFilters {
    /// Mission tag; `None` searches every mission.
    pub mission: Option<Mission>,
    /// Canonical pipeline names; empty means any pipeline.
    pub pipelines: Vec<String>,
    pub exptime: Cadence,
    pub quarter: Vec<u32>,
    pub campaign: Vec<u32>,
    pub sector: Vec<u32>,
    pub month: Vec<u8>,
    /// Arcseconds. Unset restricts the table to the requested target itself.
    pub search_radius: Option<f64>,
    pub target_id: Option<TargetId>,
    pub position: Option<SkyCoord>,
    pub nearest_tolerance_arcsec: f64,
}

impl Default for QueryFilters {
    fn default() -> Self {
        Self {
            mission: None,
            pipelines: Vec::new(),
            exptime: Cadence::Any,
            quarter: Vec::new(),
            campaign: Vec::new(),
            sector: Vec::new(),
            month: Vec::new(),
            search_radius: None,
            target_id: None,
            position: None,
            nearest_tolerance_arcsec: DEFAULT_NEAREST_TOLERANCE_ARCSEC,
        }
    }
}

impl QueryFilters {
    pub fn validate(&self) -> Result<(), LkError> {
        if let Some(radius) = self.search_radius {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(LkError::Configuration(format!(
                    "search radius must be a positive number of arcseconds, got {radius}"
                )));
            }
        }
        if let Some(month) = self.month.iter().find(|month| !(1..=3).contains(*month)) {
            return Err(LkError::Configuration(format!(
                "Kepler month must be 1, 2 or 3, got {month}"
            )));
        }
        if let Some(mission) = self.mission {
            // An explicit mission with an unsupported cadence word is a caller error.
            cadence::resolve(self.exptime, mission)?;
        } else if let Cadence::Seconds(_) = self.exptime {
            cadence::resolve(self.exptime, Mission::Tess)?;
        }
        Ok(())
    }

    fn sequence_values(&self, mission: Mission) -> &[u32] {
        match mission {
            Mission::Kepler => &self.quarter,
            Mission::K2 => &self.campaign,
            Mission::Tess => &self.sector,
        }
    }

    fn has_sequence_filter(&self) -> bool {
        !self.quarter.is_empty() || !self.campaign.is_empty() || !self.sector.is_empty()
    }
}

pub fn normalize(raw: Vec<RawProduct>, filters: &QueryFilters) -> Result<Vec<Observation>, LkError> {
    filters.validate()?;
    let raw_count = raw.len();

    let rows: Vec<Observation> = raw
        .into_iter()
        .filter_map(|product| to_observation(product, filters))
        .collect();
    let converted = rows.len();

    let rows = assign_kepler_months(rows);
    let rows = split_campaigns(rows, filters);
    let nearest = nearest_distances(&rows);

    let rows: Vec<Observation> = rows
        .into_iter()
        .filter(|row| cadence::matches(filters.exptime, row.mission, row.exptime))
        .filter(|row| matches_sequence(row, filters))
        .filter(|row| matches_month(row, filters))
        .filter(|row| filters.pipelines.is_empty() || pipeline::contains(&filters.pipelines, &row.pipeline))
        .filter(|row| matches_target(row, filters, &nearest))
        .collect();

    let rows = sort_and_dedup(rows);
    tracing::debug!(
        raw = raw_count,
        usable = converted,
        kept = rows.len(),
        "normalized archive catalog"
    );
    Ok(rows)
}

/// Canonical order (distance, observing period, filename) with duplicate
/// product filenames removed, first occurrence kept.
pub fn sort_and_dedup(mut rows: Vec<Observation>) -> Vec<Observation> {
    rows.sort_by(canonical_order);
    let mut seen = HashSet::new();
    rows.retain(|row| seen.insert(row.product_filename.clone()));
    rows
}

pub fn canonical_order(a: &Observation, b: &Observation) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.sequence.cmp(&b.sequence))
        .then_with(|| a.obs_id.cmp(&b.obs_id))
        .then_with(|| {
            a.t_min
                .unwrap_or(f64::NEG_INFINITY)
                .total_cmp(&b.t_min.unwrap_or(f64::NEG_INFINITY))
        })
        .then_with(|| a.product_filename.cmp(&b.product_filename))
}

fn to_observation(product: RawProduct, filters: &QueryFilters) -> Option<Observation> {
    let product_filename = product.product_filename.filter(|name| !name.trim().is_empty())?;
    let data_uri = product.data_uri.filter(|uri| !uri.trim().is_empty())?;

    let pipeline_name = product.provenance_name.as_deref().map(pipeline::canonicalize);
    let mission = product
        .mission
        .as_deref()
        .and_then(Mission::from_archive)
        .or_else(|| pipeline_name.as_deref().and_then(pipeline::mission_of))
        .or(filters.mission)?;
    if filters.mission.is_some_and(|wanted| wanted != mission) {
        return None;
    }
    let strategy = MissionStrategy::for_mission(mission);
    let pipeline = pipeline_name.unwrap_or_else(|| strategy.mission_pipeline.to_string());

    let exptime = product.exptime.filter(|value| value.is_finite() && *value > 0.0)?;
    let raw_sequence = product.sequence_number?;

    let (sequence, obs_id) = match (mission, campaign::archive_half(raw_sequence)) {
        (Mission::K2, Some((number, half))) => (number, campaign::label(number, Some(half))),
        _ => (raw_sequence, strategy.format_sequence(raw_sequence)),
    };

    let row_position = match (product.s_ra, product.s_dec) {
        (Some(ra), Some(dec)) => SkyCoord::new(ra, dec).ok(),
        _ => None,
    };
    let distance = product
        .distance
        .filter(|value| value.is_finite() && *value >= 0.0)
        .or_else(|| Some(filters.position?.separation_arcsec(&row_position?)))
        .unwrap_or(0.0);
    let (ra, dec) = row_position
        .or(filters.position)
        .map(|coord| (coord.ra(), coord.dec()))
        .unwrap_or((f64::NAN, f64::NAN));

    let kind = strategy.classify(&product_filename, product.description.as_deref());
    let target_name = product
        .target_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    Some(Observation {
        target_name,
        mission,
        pipeline,
        exptime,
        obs_id,
        sequence,
        product_filename,
        data_uri,
        distance,
        ra,
        dec,
        month: product.month,
        kind,
        t_min: product.t_min,
        t_max: product.t_max,
    })
}

/// Kepler short cadence is delivered as one file per month. When the archive
/// does not say which month a file covers and all three are present, the
/// chronological filename order gives it.
fn assign_kepler_months(mut rows: Vec<Observation>) -> Vec<Observation> {
    let mut groups: BTreeMap<(String, u32, String), Vec<usize>> = BTreeMap::new();
    for (index, row) in rows.iter().enumerate() {
        if cadence::is_kepler_short(row.mission, row.exptime) && row.month.is_none() {
            groups
                .entry((
                    row.target_name.clone(),
                    row.sequence,
                    format!("{}:{:?}", row.pipeline, row.kind),
                ))
                .or_default()
                .push(index);
        }
    }
    for (_, mut indices) in groups {
        if indices.len() != 3 {
            continue;
        }
        indices.sort_by(|a, b| rows[*a].product_filename.cmp(&rows[*b].product_filename));
        for (month, index) in (1u8..).zip(indices) {
            rows[index].month = Some(month);
        }
    }
    rows
}

fn split_campaigns(mut rows: Vec<Observation>, filters: &QueryFilters) -> Vec<Observation> {
    if filters.mission.is_some_and(|mission| mission != Mission::K2) {
        return rows;
    }
    let campaigns: Vec<u32> = if filters.campaign.is_empty() {
        campaign::SPLIT_CAMPAIGNS
            .into_iter()
            .filter(|number| {
                rows.iter()
                    .any(|row| row.mission == Mission::K2 && row.sequence == *number)
            })
            .collect()
    } else {
        filters
            .campaign
            .iter()
            .copied()
            .filter(|number| campaign::is_split_campaign(*number))
            .collect()
    };
    for number in campaigns {
        rows = campaign::split(rows, number);
    }
    rows
}

fn matches_sequence(row: &Observation, filters: &QueryFilters) -> bool {
    if !filters.has_sequence_filter() {
        return true;
    }
    filters.sequence_values(row.mission).contains(&row.sequence)
}

fn matches_month(row: &Observation, filters: &QueryFilters) -> bool {
    if filters.month.is_empty() || !cadence::is_kepler_short(row.mission, row.exptime) {
        return true;
    }
    row.month.is_some_and(|month| filters.month.contains(&month))
}

/// Smallest distance per mission. Catalog positions of one star differ
/// between missions, so each mission gets its own nearest source.
fn nearest_distances(rows: &[Observation]) -> HashMap<Mission, f64> {
    let mut nearest: HashMap<Mission, f64> = HashMap::new();
    for row in rows {
        nearest
            .entry(row.mission)
            .and_modify(|current| *current = current.min(row.distance))
            .or_insert(row.distance);
    }
    nearest
}

fn matches_target(
    row: &Observation,
    filters: &QueryFilters,
    nearest: &HashMap<Mission, f64>,
) -> bool {
    if let Some(radius) = filters.search_radius {
        return row.distance <= radius;
    }
    // A catalog id only names products in its own mission's archive; other
    // missions file the same star under their own catalog.
    if let Some(id) = filters.target_id.filter(|id| id.mission() == row.mission) {
        return id.matches(&row.target_name);
    }
    nearest
        .get(&row.mission)
        .is_some_and(|nearest| row.distance <= nearest + filters.nearest_tolerance_arcsec)
}
