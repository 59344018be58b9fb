//! Cadence vocabulary: maps the words callers use ("long", "short", "fast",
//! "any") or an explicit exposure time onto the exposure times each mission
//! actually records.

use std::fmt;
use std::str::FromStr;

use crate::domain::Mission;
use crate::error::LkError;

const EXACT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Cadence {
    #[default]
    Any,
    Fast,
    Short,
    Long,
    Seconds(f64),
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cadence::Any => write!(f, "any"),
            Cadence::Fast => write!(f, "fast"),
            Cadence::Short => write!(f, "short"),
            Cadence::Long => write!(f, "long"),
            Cadence::Seconds(value) => write!(f, "{value}"),
        }
    }
}

impl From<f64> for Cadence {
    fn from(value: f64) -> Self {
        Cadence::Seconds(value)
    }
}

impl From<u32> for Cadence {
    fn from(value: u32) -> Self {
        Cadence::Seconds(f64::from(value))
    }
}

impl FromStr for Cadence {
    type Err = LkError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "any" => Ok(Cadence::Any),
            "fast" => Ok(Cadence::Fast),
            "short" => Ok(Cadence::Short),
            "long" => Ok(Cadence::Long),
            other => other
                .parse::<f64>()
                .map(Cadence::Seconds)
                .map_err(|_| LkError::Configuration(format!("unknown cadence: {value}"))),
        }
    }
}

/// Half-open exposure-time band in seconds, `[low, high)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureBand {
    pub low: f64,
    pub high: f64,
}

impl ExposureBand {
    const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, exptime: f64) -> bool {
        exptime >= self.low && exptime < self.high
    }
}

const KEPLER_SHORT: ExposureBand = ExposureBand::new(0.0, 120.0);
const KEPLER_LONG: ExposureBand = ExposureBand::new(120.0, f64::INFINITY);
const TESS_FAST: ExposureBand = ExposureBand::new(0.0, 60.0);
const TESS_SHORT: ExposureBand = ExposureBand::new(60.0, 200.0);
// FFI cadence changed across the mission (1800 s, 600 s, 200 s); anything at or
// above 200 s counts as long.
const TESS_LONG: ExposureBand = ExposureBand::new(200.0, f64::INFINITY);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExptimeFilter {
    Any,
    Band(ExposureBand),
    Exact(f64),
}

impl ExptimeFilter {
    pub fn contains(&self, exptime: f64) -> bool {
        match self {
            ExptimeFilter::Any => true,
            ExptimeFilter::Band(band) => band.contains(exptime),
            ExptimeFilter::Exact(value) => (exptime - value).abs() <= EXACT_TOLERANCE,
        }
    }
}

pub fn resolve(cadence: Cadence, mission: Mission) -> Result<ExptimeFilter, LkError> {
    match (cadence, mission) {
        (Cadence::Any, _) => Ok(ExptimeFilter::Any),
        (Cadence::Seconds(value), _) => {
            if value.is_finite() && value > 0.0 {
                Ok(ExptimeFilter::Exact(value))
            } else {
                Err(LkError::Configuration(format!(
                    "exposure time must be a positive number of seconds, got {value}"
                )))
            }
        }
        (Cadence::Fast, Mission::Kepler | Mission::K2) => Err(LkError::Configuration(format!(
            "fast cadence is not available for {mission}"
        ))),
        (Cadence::Short, Mission::Kepler | Mission::K2) => Ok(ExptimeFilter::Band(KEPLER_SHORT)),
        (Cadence::Long, Mission::Kepler | Mission::K2) => Ok(ExptimeFilter::Band(KEPLER_LONG)),
        (Cadence::Fast, Mission::Tess) => Ok(ExptimeFilter::Band(TESS_FAST)),
        (Cadence::Short, Mission::Tess) => Ok(ExptimeFilter::Band(TESS_SHORT)),
        (Cadence::Long, Mission::Tess) => Ok(ExptimeFilter::Band(TESS_LONG)),
    }
}

/// Row-level check used when a table mixes missions: a cadence a mission does
/// not support simply matches none of its rows.
pub fn matches(cadence: Cadence, mission: Mission, exptime: f64) -> bool {
    resolve(cadence, mission)
        .map(|filter| filter.contains(exptime))
        .unwrap_or(false)
}

/// Kepler short cadence is the only cadence with monthly sub-files.
pub fn is_kepler_short(mission: Mission, exptime: f64) -> bool {
    mission == Mission::Kepler && KEPLER_SHORT.contains(exptime)
}
