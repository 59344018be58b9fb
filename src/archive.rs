use std::collections::HashMap;

use serde_json::{Value, json};

use crate::catalog::RawProduct;
use crate::domain::{Mission, SkyCoord};
use crate::error::LkError;
use crate::http::MastHttp;

const PRODUCT_BATCH: usize = 500;

/// A cone query against the observation archive.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveQuery {
    pub position: SkyCoord,
    pub radius_arcsec: f64,
    pub missions: Vec<Mission>,
    /// Also return community-contributed high-level science products.
    pub hlsp: bool,
}

impl ArchiveQuery {
    pub fn collections(&self) -> Vec<&'static str> {
        let mut collections: Vec<&'static str> =
            self.missions.iter().map(Mission::archive_name).collect();
        if self.hlsp {
            collections.push("HLSP");
        }
        collections
    }
}

/// Source of raw product rows. Each row is one downloadable product joined
/// with the observation it belongs to.
pub trait ArchiveClient: Send + Sync {
    fn query(&self, query: &ArchiveQuery) -> Result<Vec<RawProduct>, LkError>;
}

#[derive(Clone)]
pub struct MastArchiveClient {
    http: MastHttp,
}

impl MastArchiveClient {
    pub fn new(http: MastHttp) -> Self {
        Self { http }
    }

    fn observations(&self, query: &ArchiveQuery) -> Result<Vec<Value>, LkError> {
        let params = json!({
            "columns": "*",
            "filters": [
                { "paramName": "obs_collection", "values": query.collections() },
                { "paramName": "dataproduct_type", "values": ["timeseries", "image"] },
            ],
            "position": format!(
                "{}, {}, {}",
                query.position.ra(),
                query.position.dec(),
                query.radius_arcsec / 3600.0
            ),
        });
        self.http.invoke_all("Mast.Caom.Filtered.Position", params)
    }

    fn products(&self, obsids: &[String]) -> Result<Vec<Value>, LkError> {
        let mut rows = Vec::new();
        for batch in obsids.chunks(PRODUCT_BATCH) {
            let params = json!({ "obsid": batch.join(",") });
            rows.extend(self.http.invoke_all("Mast.Caom.Products", params)?);
        }
        Ok(rows)
    }
}

impl ArchiveClient for MastArchiveClient {
    fn query(&self, query: &ArchiveQuery) -> Result<Vec<RawProduct>, LkError> {
        let observations = self.observations(query)?;
        if observations.is_empty() {
            return Ok(Vec::new());
        }

        let by_obsid: HashMap<String, &Value> = observations
            .iter()
            .filter_map(|obs| Some((id_string(obs.get("obsid")?)?, obs)))
            .collect();
        let mut obsids: Vec<String> = by_obsid.keys().cloned().collect();
        obsids.sort();

        let products = self.products(&obsids)?;
        let rows: Vec<RawProduct> = products
            .iter()
            .filter(|product| {
                product
                    .get("productType")
                    .and_then(Value::as_str)
                    .is_some_and(|kind| kind.eq_ignore_ascii_case("SCIENCE"))
            })
            .filter_map(|product| {
                let parent = product
                    .get("parent_obsid")
                    .or_else(|| product.get("obsID"))
                    .and_then(id_string)?;
                let observation = by_obsid.get(&parent)?;
                Some(join_product(observation, product))
            })
            .collect();

        tracing::debug!(
            observations = observations.len(),
            products = products.len(),
            science = rows.len(),
            "archive query complete"
        );
        Ok(rows)
    }
}

/// Merges a product row with its parent observation.
pub fn join_product(observation: &Value, product: &Value) -> RawProduct {
    let text = |value: &Value, key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(|value| value.to_string())
    };
    let number = |key: &str| observation.get(key).and_then(Value::as_f64);

    let mission = text(observation, "obs_collection")
        .filter(|collection| Mission::from_archive(collection).is_some());

    RawProduct {
        target_name: text(observation, "target_name"),
        mission,
        provenance_name: text(observation, "provenance_name"),
        exptime: number("t_exptime"),
        sequence_number: observation
            .get("sequence_number")
            .and_then(Value::as_u64)
            .and_then(|value| u32::try_from(value).ok()),
        obs_id: text(observation, "obs_id"),
        product_filename: text(product, "productFilename"),
        data_uri: text(product, "dataURI"),
        description: text(product, "description"),
        distance: None,
        s_ra: number("s_ra"),
        s_dec: number("s_dec"),
        t_min: number("t_min"),
        t_max: number("t_max"),
        month: None,
    }
}

// The archive returns ids as numbers in one service and strings in another.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
