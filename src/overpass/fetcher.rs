//! Overpass fetcher for `timezone=*` relations.

use geo::Coord;
use hashbrown::HashMap;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::error::FetchError;
use crate::models::{Ring, SourceRecord};
use crate::source::open_ring;

/// Fetches one time zone's ways from Overpass
pub struct OverpassFetcher {
    client: Client,
    endpoint: String,
    timeout_secs: u32,
}

#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    pub elements: Vec<Element>,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Node {
        id: i64,
        lat: f64,
        lon: f64,
    },
    Way {
        id: i64,
        #[serde(default)]
        nodes: Vec<i64>,
    },
    #[serde(other)]
    Other,
}

impl OverpassFetcher {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u32) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent("tzbounds/0.1 (time zone boundary tools)")
            .timeout(std::time::Duration::from_secs(timeout_secs as u64 + 10))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout_secs,
        })
    }

    pub async fn fetch_timezone(&self, name: &str) -> Result<SourceRecord, FetchError> {
        let query = overpass_query(name, self.timeout_secs);
        let url = Url::parse_with_params(&self.endpoint, &[("data", query)])?;

        info!("Querying OpenStreetMap for {}...", name);
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let data: OverpassResponse = response.json().await?;
        debug!("Overpass returned {} elements", data.elements.len());

        record_from_elements(name, &data.elements)
    }
}

/// Overpass QL selecting the relation, its ways and their nodes
pub fn overpass_query(name: &str, timeout_secs: u32) -> String {
    format!(
        r#"[out:json][timeout:{}];(relation["timezone"="{}"];);out body;>;out skel qt;"#,
        timeout_secs, name
    )
}

/// Assemble ways into rings, in response order
pub fn record_from_elements(name: &str, elements: &[Element]) -> Result<SourceRecord, FetchError> {
    let nodes: HashMap<i64, Coord<f64>> = elements
        .iter()
        .filter_map(|e| match e {
            Element::Node { id, lat, lon } => Some((*id, Coord { x: *lon, y: *lat })),
            _ => None,
        })
        .collect();

    if nodes.is_empty() {
        return Err(FetchError::NotFound(name.to_string()));
    }

    let mut rings: Vec<Ring> = Vec::new();
    for element in elements {
        if let Element::Way { id, nodes: refs } = element {
            let ring = refs
                .iter()
                .map(|node| {
                    nodes.get(node).copied().ok_or_else(|| FetchError::MissingNode {
                        way: *id,
                        node: *node,
                    })
                })
                .collect::<Result<Ring, _>>()?;
            rings.push(open_ring(ring));
        }
    }

    info!("Found {} ways for {}", rings.len(), name);
    Ok(SourceRecord::polygon(0, name, rings))
}
