//! Cutout cubes cut on demand from TESS full-frame images. Whether a target
//! was observed in a sector is decided by the sector footprint reported by
//! the cutout service; no pixel margin is applied here.

use serde_json::Value;

use crate::catalog::RawProduct;
use crate::config::ResolvedConfig;
use crate::domain::{Mission, SkyCoord};
use crate::error::LkError;
use crate::http::MastHttp;
use crate::pipeline::TESSCUT;

/// One camera/CCD of one sector whose footprint covers the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FootprintSector {
    pub sector: u32,
    pub camera: u8,
    pub ccd: u8,
}

pub trait FootprintClient: Send + Sync {
    fn sectors(&self, position: &SkyCoord) -> Result<Vec<FootprintSector>, LkError>;
}

#[derive(Clone)]
pub struct TesscutHttpClient {
    http: MastHttp,
    base_url: String,
}

impl TesscutHttpClient {
    pub fn new(http: MastHttp, config: &ResolvedConfig) -> Self {
        Self {
            http,
            base_url: config.tesscut_base_url.clone(),
        }
    }
}

impl FootprintClient for TesscutHttpClient {
    fn sectors(&self, position: &SkyCoord) -> Result<Vec<FootprintSector>, LkError> {
        let url = format!("{}/sector", self.base_url);
        let body = self.http.get_json(
            &url,
            &[
                ("ra", position.ra().to_string()),
                ("dec", position.dec().to_string()),
                ("radius", "0m".to_string()),
            ],
        )?;
        Ok(parse_sectors(&body))
    }
}

fn parse_sectors(body: &Value) -> Vec<FootprintSector> {
    // The service sends these as zero-padded strings.
    let number = |value: &Value, key: &str| -> Option<u64> {
        let field = value.get(key)?;
        field
            .as_u64()
            .or_else(|| field.as_str().and_then(|text| text.trim().parse().ok()))
    };
    body.get("results")
        .and_then(Value::as_array)
        .map(|results| {
            results
                .iter()
                .filter_map(|entry| {
                    Some(FootprintSector {
                        sector: u32::try_from(number(entry, "sector")?).ok()?,
                        camera: u8::try_from(number(entry, "camera")?).ok()?,
                        ccd: u8::try_from(number(entry, "ccd")?).ok()?,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq)]
pub enum TesscutState {
    NotQueried,
    Found(Vec<FootprintSector>),
    NotFound,
    /// The footprint service could not be reached; not the same as "no data".
    Unavailable(String),
}

impl TesscutState {
    /// Asks the footprint service which of `sectors` (all when empty) cover `position`.
    pub fn query<F: FootprintClient + ?Sized>(
        client: &F,
        position: &SkyCoord,
        sectors: &[u32],
    ) -> Self {
        match client.sectors(position) {
            Ok(mut found) => {
                found.retain(|entry| sectors.is_empty() || sectors.contains(&entry.sector));
                found.sort();
                found.dedup();
                tracing::debug!(%position, sectors = found.len(), "tesscut footprint");
                if found.is_empty() {
                    TesscutState::NotFound
                } else {
                    TesscutState::Found(found)
                }
            }
            Err(err) => {
                tracing::warn!(%position, error = %err, "tesscut footprint unavailable");
                TesscutState::Unavailable(err.to_string())
            }
        }
    }

    pub fn sectors(&self) -> &[FootprintSector] {
        match self {
            TesscutState::Found(sectors) => sectors,
            _ => &[],
        }
    }
}

/// FFI cadence of a sector: 30 min in the prime mission, 10 min in the first
/// extension, 200 s afterwards.
pub fn ffi_exptime(sector: u32) -> f64 {
    match sector {
        0..=26 => 1800.0,
        27..=55 => 600.0,
        _ => 200.0,
    }
}

pub fn no_data_message(target: &str, sectors: &[u32]) -> String {
    if sectors.is_empty() {
        return format!("No data found for {target} in any TESS sector");
    }
    let list: Vec<String> = sectors.iter().map(u32::to_string).collect();
    format!("No data found for {target} in TESS sector(s) {}", list.join(", "))
}

/// One cutout product per covering sector, shaped like an archive row so the
/// normalizer treats it like any other product.
pub fn candidates(
    target_name: &str,
    position: &SkyCoord,
    sectors: &[FootprintSector],
    size: u32,
    tesscut_base_url: &str,
) -> Vec<RawProduct> {
    sectors
        .iter()
        .map(|entry| {
            let filename = format!(
                "tess-s{:04}-{}-{}_{:.6}_{:.6}_{size}x{size}_astrocut.fits",
                entry.sector,
                entry.camera,
                entry.ccd,
                position.ra(),
                position.dec()
            );
            let data_uri = format!(
                "{tesscut_base_url}/astrocut?ra={}&dec={}&y={size}&x={size}&sector={}",
                position.ra(),
                position.dec(),
                entry.sector
            );
            RawProduct {
                target_name: Some(target_name.to_string()),
                mission: Some(Mission::Tess.archive_name().to_string()),
                provenance_name: Some(TESSCUT.to_string()),
                exptime: Some(ffi_exptime(entry.sector)),
                sequence_number: Some(entry.sector),
                obs_id: None,
                product_filename: Some(filename),
                data_uri: Some(data_uri),
                description: Some("TESS FFI cutout".to_string()),
                distance: Some(0.0),
                s_ra: Some(position.ra()),
                s_dec: Some(position.dec()),
                t_min: None,
                t_max: None,
                month: None,
            }
        })
        .collect()
}
