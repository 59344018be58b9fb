use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::LkError;

static CATALOG_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(KIC|EPIC|TIC)[\s_-]*(\d+)$").expect("catalog id pattern")
});

static DECIMAL_COORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-]?\d+(?:\.\d*)?)\s*(?:,\s*|\s+)([+-]?\d+(?:\.\d*)?)$")
        .expect("decimal coordinate pattern")
});

static SEXAGESIMAL_COORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{1,2})[:\s](\d{1,2})[:\s](\d{1,2}(?:\.\d*)?)\s*(?:,\s*|\s+)([+-]?)(\d{1,2})[:\s](\d{1,2})[:\s](\d{1,2}(?:\.\d*)?)$",
    )
    .expect("sexagesimal coordinate pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Mission {
    Kepler,
    K2,
    #[serde(rename = "TESS")]
    Tess,
}

impl Mission {
    pub const ALL: [Mission; 3] = [Mission::Kepler, Mission::K2, Mission::Tess];

    /// Collection name used by the archive.
    pub fn archive_name(&self) -> &'static str {
        match self {
            Mission::Kepler => "Kepler",
            Mission::K2 => "K2",
            Mission::Tess => "TESS",
        }
    }

    /// Maps an archive collection or mission column to a mission, if it is one of ours.
    pub fn from_archive(value: &str) -> Option<Self> {
        value.parse().ok()
    }
}

impl fmt::Display for Mission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.archive_name())
    }
}

impl FromStr for Mission {
    type Err = LkError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "kepler" => Ok(Mission::Kepler),
            "k2" => Ok(Mission::K2),
            "tess" => Ok(Mission::Tess),
            _ => Err(LkError::Configuration(format!("unknown mission: {value}"))),
        }
    }
}

/// ICRS position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyCoord {
    ra: f64,
    dec: f64,
}

impl SkyCoord {
    pub fn new(ra: f64, dec: f64) -> Result<Self, LkError> {
        if !ra.is_finite() || !(0.0..360.0).contains(&ra) {
            return Err(LkError::Configuration(format!(
                "right ascension out of range [0, 360): {ra}"
            )));
        }
        if !dec.is_finite() || !(-90.0..=90.0).contains(&dec) {
            return Err(LkError::Configuration(format!(
                "declination out of range [-90, 90]: {dec}"
            )));
        }
        Ok(Self { ra, dec })
    }

    pub fn ra(&self) -> f64 {
        self.ra
    }

    pub fn dec(&self) -> f64 {
        self.dec
    }

    /// Angular separation in arcseconds (haversine).
    pub fn separation_arcsec(&self, other: &SkyCoord) -> f64 {
        let (ra1, dec1) = (self.ra.to_radians(), self.dec.to_radians());
        let (ra2, dec2) = (other.ra.to_radians(), other.dec.to_radians());
        let hav = ((dec2 - dec1) / 2.0).sin().powi(2)
            + dec1.cos() * dec2.cos() * ((ra2 - ra1) / 2.0).sin().powi(2);
        let angle = 2.0 * hav.sqrt().min(1.0).asin();
        angle.to_degrees() * 3600.0
    }
}

impl fmt::Display for SkyCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6} {:+.6}", self.ra, self.dec)
    }
}

/// Input catalog identifiers that map onto mission target names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetId {
    Kic(u64),
    Epic(u64),
    Tic(u64),
}

impl TargetId {
    pub fn number(&self) -> u64 {
        match self {
            TargetId::Kic(n) | TargetId::Epic(n) | TargetId::Tic(n) => *n,
        }
    }

    /// Mission whose archive files products under this catalog.
    pub fn mission(&self) -> Mission {
        match self {
            TargetId::Kic(_) => Mission::Kepler,
            TargetId::Epic(_) => Mission::K2,
            TargetId::Tic(_) => Mission::Tess,
        }
    }

    /// The `target_name` the mission archive files products under.
    pub fn canonical_name(&self) -> String {
        match self {
            TargetId::Kic(n) => format!("kplr{n:09}"),
            TargetId::Epic(n) => format!("ktwo{n}"),
            TargetId::Tic(n) => n.to_string(),
        }
    }

    /// Whether an archive `target_name` refers to this catalog object.
    pub fn matches(&self, target_name: &str) -> bool {
        let compact: String = target_name
            .trim()
            .chars()
            .filter(|ch| !ch.is_whitespace() && *ch != '_' && *ch != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        let split = compact
            .find(|ch: char| ch.is_ascii_digit())
            .unwrap_or(compact.len());
        let (prefix, digits) = compact.split_at(split);
        if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
            return false;
        }
        let prefix_ok = match self {
            TargetId::Kic(_) => matches!(prefix, "" | "kplr" | "kic"),
            TargetId::Epic(_) => matches!(prefix, "" | "ktwo" | "epic"),
            TargetId::Tic(_) => matches!(prefix, "" | "tic"),
        };
        prefix_ok && digits.parse::<u64>().ok() == Some(self.number())
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetId::Kic(n) => write!(f, "KIC {n}"),
            TargetId::Epic(n) => write!(f, "EPIC {n}"),
            TargetId::Tic(n) => write!(f, "TIC {n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Id(TargetId),
    Coordinates(SkyCoord),
    Name(String),
}

impl Target {
    /// Catalog identifier, when the target was given as one.
    pub fn catalog_id(&self) -> Option<TargetId> {
        match self {
            Target::Id(id) => Some(*id),
            _ => None,
        }
    }

    /// Position known without consulting a resolver.
    pub fn known_position(&self) -> Option<SkyCoord> {
        match self {
            Target::Coordinates(coord) => Some(*coord),
            _ => None,
        }
    }
}

impl From<SkyCoord> for Target {
    fn from(value: SkyCoord) -> Self {
        Target::Coordinates(value)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Id(id) => write!(f, "{id}"),
            Target::Coordinates(coord) => write!(f, "{coord}"),
            Target::Name(name) => write!(f, "{name}"),
        }
    }
}

impl FromStr for Target {
    type Err = LkError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LkError::Configuration("empty target".to_string()));
        }

        if let Some(caps) = CATALOG_ID.captures(trimmed) {
            let number = caps[2]
                .parse::<u64>()
                .map_err(|_| LkError::Configuration(format!("invalid catalog id: {value}")))?;
            let id = match caps[1].to_ascii_uppercase().as_str() {
                "KIC" => TargetId::Kic(number),
                "EPIC" => TargetId::Epic(number),
                _ => TargetId::Tic(number),
            };
            return Ok(Target::Id(id));
        }

        if let Some(caps) = DECIMAL_COORD.captures(trimmed) {
            let ra = parse_number(&caps[1], value)?;
            let dec = parse_number(&caps[2], value)?;
            return Ok(Target::Coordinates(SkyCoord::new(ra, dec)?));
        }

        if let Some(caps) = SEXAGESIMAL_COORD.captures(trimmed) {
            let hours = parse_sexagesimal(&caps[1], &caps[2], &caps[3], value)?;
            let degrees = parse_sexagesimal(&caps[5], &caps[6], &caps[7], value)?;
            let sign = if &caps[4] == "-" { -1.0 } else { 1.0 };
            return Ok(Target::Coordinates(SkyCoord::new(
                hours * 15.0,
                sign * degrees,
            )?));
        }

        Ok(Target::Name(trimmed.to_string()))
    }
}

fn parse_number(text: &str, original: &str) -> Result<f64, LkError> {
    text.parse::<f64>()
        .map_err(|_| LkError::Configuration(format!("invalid coordinate: {original}")))
}

fn parse_sexagesimal(a: &str, b: &str, c: &str, original: &str) -> Result<f64, LkError> {
    let whole = parse_number(a, original)?;
    let minutes = parse_number(b, original)?;
    let seconds = parse_number(c, original)?;
    if minutes >= 60.0 || seconds >= 60.0 {
        return Err(LkError::Configuration(format!(
            "invalid sexagesimal coordinate: {original}"
        )));
    }
    Ok(whole + minutes / 60.0 + seconds / 3600.0)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_catalog_ids() {
        let target: Target = "KIC 11904151".parse().unwrap();
        assert_eq!(target, Target::Id(TargetId::Kic(11904151)));
        let target: Target = "TIC41336498".parse().unwrap();
        assert_eq!(target, Target::Id(TargetId::Tic(41336498)));
        let target: Target = "epic 210634047".parse().unwrap();
        assert_eq!(target, Target::Id(TargetId::Epic(210634047)));
    }

    #[test]
    fn parse_decimal_coordinates() {
        let target: Target = "297.5835, 40.98339".parse().unwrap();
        let coord = target.known_position().unwrap();
        assert!((coord.ra() - 297.5835).abs() < 1e-9);
        assert!((coord.dec() - 40.98339).abs() < 1e-9);

        let target: Target = "285.67942179 +50.24130576".parse().unwrap();
        assert!(target.known_position().is_some());
    }

    #[test]
    fn parse_sexagesimal_coordinates() {
        let target: Target = "19:02:43.1 +50:14:28.7".parse().unwrap();
        let coord = target.known_position().unwrap();
        assert!((coord.ra() - 285.679583).abs() < 1e-5);
        assert!((coord.dec() - 50.241306).abs() < 1e-5);
    }

    #[test]
    fn free_form_names_pass_through() {
        for name in ["pi Mensae", "Kepler 16b", "2MASS J19024305+5014286"] {
            let target: Target = name.parse().unwrap();
            assert_eq!(target, Target::Name(name.to_string()));
        }
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        let err = "400.0 10.0".parse::<Target>().unwrap_err();
        assert_matches!(err, LkError::Configuration(_));
    }

    #[test]
    fn canonical_names_and_matching() {
        let kic = TargetId::Kic(6507433);
        assert_eq!(kic.canonical_name(), "kplr006507433");
        assert!(kic.matches("kplr006507433"));
        assert!(kic.matches("KIC 6507433"));
        assert!(!kic.matches("kplr006507434"));
        assert!(!TargetId::Tic(6507433).matches("kplr006507433"));
    }

    #[test]
    fn separation_of_nearby_points() {
        let a = SkyCoord::new(10.0, 20.0).unwrap();
        let b = SkyCoord::new(10.0, 20.0 + 4.0 / 3600.0).unwrap();
        assert!((a.separation_arcsec(&b) - 4.0).abs() < 1e-6);
    }

    #[test]
    fn mission_parse() {
        assert_eq!("tess".parse::<Mission>().unwrap(), Mission::Tess);
        assert_matches!("hubble".parse::<Mission>(), Err(LkError::Configuration(_)));
    }
}
