use serde::{Deserialize, Serialize};

use crate::domain::Mission;

/// One product row as returned by the archive. Every column is optional; the
/// normalizer decides which rows are usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProduct {
    #[serde(default)]
    pub target_name: Option<String>,
    #[serde(default)]
    pub mission: Option<String>,
    #[serde(default)]
    pub provenance_name: Option<String>,
    #[serde(default, rename = "t_exptime")]
    pub exptime: Option<f64>,
    #[serde(default)]
    pub sequence_number: Option<u32>,
    #[serde(default)]
    pub obs_id: Option<String>,
    #[serde(default, rename = "productFilename")]
    pub product_filename: Option<String>,
    #[serde(default, rename = "dataURI")]
    pub data_uri: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub s_ra: Option<f64>,
    #[serde(default)]
    pub s_dec: Option<f64>,
    #[serde(default)]
    pub t_min: Option<f64>,
    #[serde(default)]
    pub t_max: Option<f64>,
    #[serde(default)]
    pub month: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    TargetPixel,
    LightCurve,
    Cutout,
    Other,
}

impl ProductKind {
    /// Image stacks over time.
    pub fn is_cube(&self) -> bool {
        matches!(self, ProductKind::TargetPixel | ProductKind::Cutout)
    }

    pub fn is_timeseries(&self) -> bool {
        matches!(self, ProductKind::LightCurve)
    }
}

/// One row of the canonical table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub target_name: String,
    pub mission: Mission,
    pub pipeline: String,
    pub exptime: f64,
    pub obs_id: String,
    pub sequence: u32,
    #[serde(rename = "productFilename")]
    pub product_filename: String,
    #[serde(rename = "dataURI")]
    pub data_uri: String,
    pub distance: f64,
    pub ra: f64,
    pub dec: f64,
    pub month: Option<u8>,
    pub kind: ProductKind,
    pub t_min: Option<f64>,
    pub t_max: Option<f64>,
}

impl Observation {
    /// Whether the campaign half suffix has been applied ("09a", "09b").
    pub fn is_split_labelled(&self) -> bool {
        self.obs_id.ends_with(['a', 'b'])
    }
}
