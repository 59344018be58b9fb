use crate::domain::Mission;

const ALIASES: &[(&str, &str)] = &[
    ("spoc", "SPOC"),
    ("tess-spoc", "TESS-SPOC"),
    ("qlp", "QLP"),
    ("k2", "K2"),
    ("kepler", "Kepler"),
    ("tesscut", "TESScut"),
    ("tasoc", "TASOC"),
    ("cdips", "CDIPS"),
    ("pathos", "PATHOS"),
    ("gsfc-eleanor-lite", "GSFC-ELEANOR-LITE"),
    ("everest", "EVEREST"),
    ("k2sff", "K2SFF"),
    ("k2sc", "K2SC"),
    ("k2varcat", "K2VARCAT"),
    ("kbonus-bkg", "KBONUS-BKG"),
];

pub const TESSCUT: &str = "TESScut";

/// Canonical spelling of a pipeline name. Unknown names pass through trimmed.
pub fn canonicalize(name: &str) -> String {
    let trimmed = name.trim();
    let lowered = trimmed.to_ascii_lowercase();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

pub fn canonicalize_all<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let canonical = canonicalize(name.as_ref());
        if !out.iter().any(|existing| existing.eq_ignore_ascii_case(&canonical)) {
            out.push(canonical);
        }
    }
    out
}

/// Case-insensitive membership, so unknown pipelines still match however they are spelled.
pub fn contains(allowed: &[String], pipeline: &str) -> bool {
    let canonical = canonicalize(pipeline);
    allowed
        .iter()
        .any(|name| name.eq_ignore_ascii_case(&canonical))
}

/// Mission a high-level science product pipeline reprocesses.
pub fn mission_of(pipeline: &str) -> Option<Mission> {
    match canonicalize(pipeline).as_str() {
        "Kepler" | "KBONUS-BKG" => Some(Mission::Kepler),
        "K2" | "EVEREST" | "K2SFF" | "K2SC" | "K2VARCAT" => Some(Mission::K2),
        "SPOC" | "TESS-SPOC" | "QLP" | "TASOC" | "CDIPS" | "PATHOS" | "GSFC-ELEANOR-LITE"
        | TESSCUT => Some(Mission::Tess),
        _ => None,
    }
}
