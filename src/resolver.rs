use serde_json::{Value, json};

use crate::domain::SkyCoord;
use crate::error::LkError;
use crate::http::MastHttp;

/// Turns a free-form target name into a sky position.
pub trait CoordinateResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Result<SkyCoord, LkError>;
}

#[derive(Clone)]
pub struct MastNameResolver {
    http: MastHttp,
}

impl MastNameResolver {
    pub fn new(http: MastHttp) -> Self {
        Self { http }
    }
}

impl CoordinateResolver for MastNameResolver {
    fn resolve(&self, name: &str) -> Result<SkyCoord, LkError> {
        let body = self.http.invoke(
            "Mast.Name.Lookup",
            json!({ "input": name, "format": "json" }),
            1,
        )?;
        let coord = parse_lookup(&body)
            .ok_or_else(|| LkError::Resolve(format!("Unable to find {name}")))?;
        tracing::debug!(target_name = name, %coord, "resolved target name");
        Ok(coord)
    }
}

fn parse_lookup(body: &Value) -> Option<SkyCoord> {
    let first = body
        .get("resolvedCoordinate")
        .and_then(Value::as_array)
        .and_then(|array| array.first())?;
    let ra = first.get("ra").and_then(Value::as_f64)?;
    let dec = first.get("decl").and_then(Value::as_f64)?;
    SkyCoord::new(ra, dec).ok()
}
