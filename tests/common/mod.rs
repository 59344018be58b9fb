#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use flate2::Compression;
use flate2::write::GzEncoder;

use lksearch::archive::{ArchiveClient, ArchiveQuery};
use lksearch::catalog::RawProduct;
use lksearch::config::ResolvedConfig;
use lksearch::domain::SkyCoord;
use lksearch::error::LkError;
use lksearch::pipeline;
use lksearch::resolver::CoordinateResolver;
use lksearch::search::Searcher;
use lksearch::tesscut::{FootprintClient, FootprintSector};
use lksearch::transfer::{TransferClient, TransferOutcome};

pub const KEPLER10: (f64, f64) = (285.679_42, 50.241_30);
pub const KIC6507433: (f64, f64) = (290.016_04, 41.945_53);
pub const EPIC228162462: (f64, f64) = (182.798_10, -5.195_44);
pub const EPIC201000001: (f64, f64) = (173.100_00, -1.100_00);
pub const EPIC203830112: (f64, f64) = (246.651_00, -24.011_00);
pub const TIC273985862: (f64, f64) = (338.573_28, -62.040_56);
pub const AU_MIC: (f64, f64) = (311.289_72, -31.340_90);
pub const TRES2: (f64, f64) = (286.808_50, 49.316_39);

pub fn coord((ra, dec): (f64, f64)) -> SkyCoord {
    SkyCoord::new(ra, dec).unwrap()
}

/// Offsets a position north by `arcsec`.
pub fn north_of((ra, dec): (f64, f64), arcsec: f64) -> (f64, f64) {
    (ra, dec + arcsec / 3600.0)
}

pub struct MockResolver {
    names: HashMap<String, SkyCoord>,
    pub calls: AtomicUsize,
}

impl Default for MockResolver {
    fn default() -> Self {
        let mut names = HashMap::new();
        for (name, position) in [
            ("Kepler-10", KEPLER10),
            ("KIC 11904151", KEPLER10),
            ("KIC 6507433", KIC6507433),
            ("EPIC 228162462", EPIC228162462),
            ("EPIC 201000001", EPIC201000001),
            ("EPIC 203830112", EPIC203830112),
            ("TIC 273985862", TIC273985862),
            ("AU Mic", AU_MIC),
            ("TIC 441420236", AU_MIC),
            ("TrES-2b", TRES2),
        ] {
            names.insert(name.to_string(), coord(position));
        }
        Self {
            names,
            calls: AtomicUsize::new(0),
        }
    }
}

impl CoordinateResolver for MockResolver {
    fn resolve(&self, name: &str) -> Result<SkyCoord, LkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| LkError::Resolve(format!("Unable to find {name}")))
    }
}

/// Cone search over a fixed catalog, mimicking the archive's collection filter.
pub struct MockArchive {
    rows: Vec<RawProduct>,
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl MockArchive {
    pub fn new(rows: Vec<RawProduct>) -> Self {
        Self {
            rows,
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }
}

impl Default for MockArchive {
    fn default() -> Self {
        Self::new(catalog())
    }
}

impl ArchiveClient for MockArchive {
    fn query(&self, query: &ArchiveQuery) -> Result<Vec<RawProduct>, LkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(LkError::TransportStatus {
                status: 503,
                message: "Service Unavailable".to_string(),
            });
        }
        Ok(self
            .rows
            .iter()
            .filter(|row| {
                let position = coord((row.s_ra.unwrap(), row.s_dec.unwrap()));
                position.separation_arcsec(&query.position) <= query.radius_arcsec
            })
            .filter(|row| match row.mission.as_deref() {
                Some(mission) => query
                    .missions
                    .iter()
                    .any(|wanted| wanted.archive_name() == mission),
                None => {
                    query.hlsp
                        && row
                            .provenance_name
                            .as_deref()
                            .and_then(pipeline::mission_of)
                            .is_some_and(|mission| query.missions.contains(&mission))
                }
            })
            .cloned()
            .collect())
    }
}

pub struct MockFootprint {
    pub sectors: Vec<FootprintSector>,
    pub fail: bool,
}

impl MockFootprint {
    pub fn covering(sectors: &[u32]) -> Self {
        Self {
            sectors: sectors
                .iter()
                .map(|sector| FootprintSector {
                    sector: *sector,
                    camera: 1,
                    ccd: 2,
                })
                .collect(),
            fail: false,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            sectors: Vec::new(),
            fail: true,
        }
    }
}

impl FootprintClient for MockFootprint {
    fn sectors(&self, _position: &SkyCoord) -> Result<Vec<FootprintSector>, LkError> {
        if self.fail {
            return Err(LkError::Transport("connection refused".to_string()));
        }
        Ok(self.sectors.clone())
    }
}

pub type MockSearcher = Searcher<MockResolver, MockArchive, MockFootprint>;

pub fn searcher() -> MockSearcher {
    searcher_with(MockArchive::default(), MockFootprint::covering(&[]))
}

pub fn searcher_with(archive: MockArchive, footprint: MockFootprint) -> MockSearcher {
    Searcher::new(
        MockResolver::default(),
        archive,
        footprint,
        ResolvedConfig::default(),
    )
}

/// Writes a plausible product for every request; filenames listed in
/// `failing` answer 404. The first `truncated` calls write an empty file.
#[derive(Default)]
pub struct MockTransfer {
    pub failing: HashSet<String>,
    pub truncated: usize,
    pub calls: AtomicUsize,
    pub fetched: Mutex<Vec<String>>,
}

impl MockTransfer {
    pub fn failing(names: &[&str]) -> Self {
        Self {
            failing: names.iter().map(|name| name.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn truncated_first(count: usize) -> Self {
        Self {
            truncated: count,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TransferClient for MockTransfer {
    fn fetch(
        &self,
        product_filename: &str,
        _data_uri: &str,
        destination: &Path,
    ) -> Result<TransferOutcome, LkError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(product_filename) {
            return Err(LkError::TransportStatus {
                status: 404,
                message: "Not Found".to_string(),
            });
        }
        fs::create_dir_all(destination).unwrap();
        let path = destination.join(product_filename);
        if call < self.truncated {
            fs::write(&path, b"").unwrap();
        } else {
            fs::write(&path, product_bytes(product_filename)).unwrap();
        }
        self.fetched
            .lock()
            .unwrap()
            .push(product_filename.to_string());
        Ok(TransferOutcome::ok(path))
    }
}

pub fn product_bytes(product_filename: &str) -> Vec<u8> {
    let header = b"SIMPLE  =                    T / conforms to FITS standard".repeat(8);
    if product_filename.ends_with(".gz") {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&header).unwrap();
        encoder.finish().unwrap()
    } else {
        header
    }
}

pub struct Row {
    pub target: &'static str,
    pub mission: Option<&'static str>,
    pub pipeline: &'static str,
    pub exptime: f64,
    pub sequence: u32,
    pub filename: String,
    pub position: (f64, f64),
    pub window: Option<(f64, f64)>,
}

impl Row {
    pub fn build(self) -> RawProduct {
        let collection = self.mission.unwrap_or("HLSP");
        RawProduct {
            target_name: Some(self.target.to_string()),
            mission: self.mission.map(str::to_string),
            provenance_name: Some(self.pipeline.to_string()),
            exptime: Some(self.exptime),
            sequence_number: Some(self.sequence),
            obs_id: None,
            data_uri: Some(format!("mast:{collection}/product/{}", self.filename)),
            product_filename: Some(self.filename),
            description: None,
            distance: None,
            s_ra: Some(self.position.0),
            s_dec: Some(self.position.1),
            t_min: self.window.map(|window| window.0),
            t_max: self.window.map(|window| window.1),
            month: None,
        }
    }
}

pub const KEPLER10_QUARTERS: [u32; 15] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 14, 15, 16];

pub fn catalog() -> Vec<RawProduct> {
    let mut rows = Vec::new();

    // Kepler-10: long cadence light curves and pixel files in 15 quarters,
    // short cadence in quarter 11 as three monthly files.
    for quarter in KEPLER10_QUARTERS {
        for suffix in ["llc.fits", "lpd-targ.fits.gz"] {
            rows.push(
                Row {
                    target: "kplr011904151",
                    mission: Some("Kepler"),
                    pipeline: "Kepler",
                    exptime: 1765.5,
                    sequence: quarter,
                    filename: format!("kplr011904151-q{quarter:02}_{suffix}"),
                    position: KEPLER10,
                    window: None,
                }
                .build(),
            );
        }
    }
    for month in 1..=3 {
        rows.push(
            Row {
                target: "kplr011904151",
                mission: Some("Kepler"),
                pipeline: "Kepler",
                exptime: 58.85,
                sequence: 11,
                filename: format!("kplr011904151-q11m{month}_slc.fits"),
                position: KEPLER10,
                window: None,
            }
            .build(),
        );
    }

    // Kepler-10 again in TESS sector 14, filed under its TIC number. The TIC
    // position sits 0.4 arcsec from the KIC one.
    rows.push(
        Row {
            target: "27677846",
            mission: Some("TESS"),
            pipeline: "SPOC",
            exptime: 120.0,
            sequence: 14,
            filename: "tess2019198215352-s0014-0000000027677846-0150-s_lc.fits".to_string(),
            position: north_of(KEPLER10, 0.4),
            window: None,
        }
        .build(),
    );

    // KIC 6507433 and an unrelated star 1.5 arcsec north of it.
    rows.push(
        Row {
            target: "kplr006507433",
            mission: Some("Kepler"),
            pipeline: "Kepler",
            exptime: 1765.5,
            sequence: 5,
            filename: "kplr006507433-q05_llc.fits".to_string(),
            position: KIC6507433,
            window: None,
        }
        .build(),
    );
    rows.push(
        Row {
            target: "kplr006507444",
            mission: Some("Kepler"),
            pipeline: "Kepler",
            exptime: 1765.5,
            sequence: 5,
            filename: "kplr006507444-q05_llc.fits".to_string(),
            position: north_of(KIC6507433, 1.5),
            window: None,
        }
        .build(),
    );

    // K2 campaign 9, observed in both halves; the archive files both under 9.
    for (filename, window) in [
        ("ktwo228162462-c92_lpd-targ.fits.gz", (57530.0, 57571.0)),
        ("ktwo228162462-c91_lpd-targ.fits.gz", (57500.0, 57526.0)),
    ] {
        rows.push(
            Row {
                target: "ktwo228162462",
                mission: Some("K2"),
                pipeline: "K2",
                exptime: 1765.5,
                sequence: 9,
                filename: filename.to_string(),
                position: EPIC228162462,
                window: Some(window),
            }
            .build(),
        );
    }

    // K2 campaign 10 under the archive's sub-campaign codes, no time columns.
    for code in [102, 101] {
        rows.push(
            Row {
                target: "ktwo201000001",
                mission: Some("K2"),
                pipeline: "K2",
                exptime: 1765.5,
                sequence: code,
                filename: format!("ktwo201000001-c{code}_llc.fits"),
                position: EPIC201000001,
                window: None,
            }
            .build(),
        );
    }

    // K2 campaign 11, second half only.
    rows.push(
        Row {
            target: "ktwo203830112",
            mission: Some("K2"),
            pipeline: "K2",
            exptime: 1765.5,
            sequence: 11,
            filename: "ktwo203830112-c112_llc.fits".to_string(),
            position: EPIC203830112,
            window: Some((57682.0, 57729.0)),
        }
        .build(),
    );

    // TIC 273985862 in sector 1 with a neighbour 1 arcsec away.
    for (target, position, filename) in [
        (
            "273985862",
            TIC273985862,
            "tess2018206045859-s0001-0000000273985862-0120-s_lc.fits",
        ),
        (
            "273985870",
            north_of(TIC273985862, 1.0),
            "tess2018206045859-s0001-0000000273985870-0120-s_lc.fits",
        ),
    ] {
        rows.push(
            Row {
                target,
                mission: Some("TESS"),
                pipeline: "SPOC",
                exptime: 120.0,
                sequence: 1,
                filename: filename.to_string(),
                position,
                window: None,
            }
            .build(),
        );
    }

    // AU Mic, sector 27: 20 s and 120 s products.
    for (exptime, suffix) in [
        (20.0, "fast-lc.fits"),
        (20.0, "fast-tp.fits"),
        (120.0, "lc.fits"),
        (120.0, "tp.fits"),
    ] {
        rows.push(
            Row {
                target: "441420236",
                mission: Some("TESS"),
                pipeline: "SPOC",
                exptime,
                sequence: 27,
                filename: format!("tess2020186164531-s0027-0000000441420236-0189-a_{suffix}"),
                position: AU_MIC,
                window: None,
            }
            .build(),
        );
    }

    // TrES-2b, sector 26: three pipelines for the same sector.
    for (mission, pipeline, exptime, filename) in [
        (
            Some("TESS"),
            "SPOC",
            120.0,
            "tess2020160202036-s0026-0000000399860444-0188-s_lc.fits",
        ),
        (
            None,
            "TESS-SPOC",
            1800.0,
            "hlsp_tess-spoc_tess_phot_0000000399860444-s0026_tess_v1_lc.fits",
        ),
        (
            None,
            "QLP",
            1800.0,
            "hlsp_qlp_tess_ffi_s0026-0000000399860444_tess_v01_llc.fits",
        ),
    ] {
        rows.push(
            Row {
                target: "399860444",
                mission,
                pipeline,
                exptime,
                sequence: 26,
                filename: filename.to_string(),
                position: TRES2,
                window: None,
            }
            .build(),
        );
    }

    rows
}
