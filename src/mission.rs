use crate::catalog::ProductKind;
use crate::domain::Mission;
use crate::pipeline::TESSCUT;

/// Name of the observing-period parameter a mission uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceParam {
    Quarter,
    Campaign,
    Sector,
}

impl SequenceParam {
    pub fn name(&self) -> &'static str {
        match self {
            SequenceParam::Quarter => "quarter",
            SequenceParam::Campaign => "campaign",
            SequenceParam::Sector => "sector",
        }
    }
}

/// Everything that differs between missions: parameter vocabulary, default
/// pipelines and which product files count as cubes or time series.
#[derive(Debug)]
pub struct MissionStrategy {
    pub mission: Mission,
    pub sequence_param: SequenceParam,
    /// The mission's own processing pipeline.
    pub mission_pipeline: &'static str,
    default_pipelines: &'static [&'static str],
    cube_suffixes: &'static [&'static str],
    timeseries_suffixes: &'static [&'static str],
}

static KEPLER: MissionStrategy = MissionStrategy {
    mission: Mission::Kepler,
    sequence_param: SequenceParam::Quarter,
    mission_pipeline: "Kepler",
    default_pipelines: &["Kepler", "KBONUS-BKG"],
    cube_suffixes: &["_lpd-targ.fits", "_spd-targ.fits"],
    timeseries_suffixes: &["_llc.fits", "_slc.fits"],
};

static K2: MissionStrategy = MissionStrategy {
    mission: Mission::K2,
    sequence_param: SequenceParam::Campaign,
    mission_pipeline: "K2",
    default_pipelines: &["K2", "EVEREST", "K2SFF", "K2SC", "K2VARCAT"],
    cube_suffixes: &["_lpd-targ.fits", "_spd-targ.fits"],
    timeseries_suffixes: &["_llc.fits", "_slc.fits"],
};

static TESS: MissionStrategy = MissionStrategy {
    mission: Mission::Tess,
    sequence_param: SequenceParam::Sector,
    mission_pipeline: "SPOC",
    default_pipelines: &["SPOC", "TESS-SPOC", "QLP", TESSCUT],
    cube_suffixes: &["_tp.fits", "_fast-tp.fits", "_astrocut.fits"],
    timeseries_suffixes: &["_lc.fits", "_fast-lc.fits", "_llc.fits"],
};

impl MissionStrategy {
    pub fn for_mission(mission: Mission) -> &'static MissionStrategy {
        match mission {
            Mission::Kepler => &KEPLER,
            Mission::K2 => &K2,
            Mission::Tess => &TESS,
        }
    }

    /// Pipelines searched when the caller names none. Without high-level
    /// science products only the mission pipeline (and TESS cutouts) remain.
    pub fn default_pipelines(&self, hlsp: bool) -> Vec<String> {
        if hlsp {
            return self
                .default_pipelines
                .iter()
                .map(|name| name.to_string())
                .collect();
        }
        let mut names = vec![self.mission_pipeline.to_string()];
        if self.mission == Mission::Tess {
            names.push(TESSCUT.to_string());
        }
        names
    }

    pub fn format_sequence(&self, sequence: u32) -> String {
        format!("{sequence:02}")
    }

    pub fn classify(&self, product_filename: &str, description: Option<&str>) -> ProductKind {
        let lowered = product_filename.to_ascii_lowercase();
        let name = lowered.strip_suffix(".gz").unwrap_or(&lowered);
        if name.ends_with("_astrocut.fits") {
            return ProductKind::Cutout;
        }
        if self.cube_suffixes.iter().any(|suffix| name.ends_with(suffix)) {
            return ProductKind::TargetPixel;
        }
        if self
            .timeseries_suffixes
            .iter()
            .any(|suffix| name.ends_with(suffix))
        {
            return ProductKind::LightCurve;
        }

        let description = description.unwrap_or_default().to_ascii_lowercase();
        if description.contains("target pixel") {
            ProductKind::TargetPixel
        } else if description.contains("light curve") && name.ends_with(".fits") {
            ProductKind::LightCurve
        } else {
            ProductKind::Other
        }
    }
}
