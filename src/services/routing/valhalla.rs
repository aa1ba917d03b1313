//! Valhalla travel-time client (`/sources_to_targets`)
//!
//! https://valhalla.github.io/valhalla/api/matrix/api-reference/

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;
use crate::types::Coordinates;
use super::{TravelTimeMatrix, TravelTimeProvider};

const DEFAULT_BASE_URL: &str = "http://localhost:8002";

/// Phone GPS fixes are often a few hundred metres off the road graph
const DEFAULT_SNAP_RADIUS_M: u32 = 500;

#[derive(Debug, Clone)]
pub struct ValhallaConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    /// Snap radius around each location, in metres
    pub snap_radius_m: u32,
}

impl Default for ValhallaConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, crate::defaults::DEFAULT_VALHALLA_TIMEOUT_SECONDS)
    }
}

impl ValhallaConfig {
    pub fn new(base_url: impl Into<String>, timeout_seconds: u64) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_seconds,
            snap_radius_m: DEFAULT_SNAP_RADIUS_M,
        }
    }
}

/// Travel-time provider backed by a Valhalla server
pub struct ValhallaClient {
    http: Client,
    config: ValhallaConfig,
}

impl ValhallaClient {
    pub fn new(config: ValhallaConfig) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { http, config })
    }

    /// Every location is both a source and a target
    fn sources_to_targets(&self, locations: &[Coordinates]) -> SourcesToTargets {
        let points: Vec<Location> = locations
            .iter()
            .map(|c| Location {
                lat: c.lat,
                lon: c.lng,
                radius: Some(self.config.snap_radius_m),
            })
            .collect();

        SourcesToTargets {
            sources: points.clone(),
            targets: points,
            costing: "auto",
        }
    }
}

/// Convert a Valhalla matrix payload into minutes, checking it covers every pair
fn matrix_from_response(response: SourcesToTargetsReply, n: usize) -> Result<TravelTimeMatrix, ProviderError> {
    if response.sources_to_targets.len() != n {
        return Err(ProviderError::MalformedPayload(format!(
            "expected {} rows, got {}",
            n,
            response.sources_to_targets.len()
        )));
    }

    let mut seconds = vec![vec![0.0; n]; n];
    for (i, row) in response.sources_to_targets.iter().enumerate() {
        if row.len() != n {
            return Err(ProviderError::MalformedPayload(format!(
                "row {} has {} cells, expected {}",
                i,
                row.len(),
                n
            )));
        }
        for (j, cell) in row.iter().enumerate() {
            seconds[i][j] = cell.time.ok_or_else(|| {
                ProviderError::MalformedPayload(format!("no route {} -> {}", i, j))
            })?;
        }
    }

    TravelTimeMatrix::from_seconds(seconds)
}

#[async_trait]
impl TravelTimeProvider for ValhallaClient {
    async fn travel_time_matrix(
        &self,
        origin: Coordinates,
        destinations: &[Coordinates],
    ) -> Result<TravelTimeMatrix, ProviderError> {
        let mut locations = Vec::with_capacity(destinations.len() + 1);
        locations.push(origin);
        locations.extend_from_slice(destinations);
        let n = locations.len();

        if n == 1 {
            return TravelTimeMatrix::new(vec![vec![0.0]]);
        }

        let url = format!("{}/sources_to_targets", self.config.base_url);
        debug!("Requesting {}x{} travel times from {}", n, n, url);

        let response = self
            .http
            .post(&url)
            .json(&self.sources_to_targets(&locations))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        let body = response.bytes().await?;
        let reply: SourcesToTargetsReply = serde_json::from_slice(&body)
            .map_err(|e| ProviderError::MalformedPayload(e.to_string()))?;

        matrix_from_response(reply, n)
    }

    fn name(&self) -> &str {
        "Valhalla"
    }
}

// Wire types. Only `time` is read back; distances are ignored.

#[derive(Debug, Serialize)]
struct SourcesToTargets {
    sources: Vec<Location>,
    targets: Vec<Location>,
    costing: &'static str,
}

#[derive(Debug, Serialize, Clone)]
struct Location {
    lat: f64,
    lon: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    radius: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SourcesToTargetsReply {
    sources_to_targets: Vec<Vec<Cell>>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    /// Seconds; null when Valhalla found no route
    time: Option<f64>,
}
