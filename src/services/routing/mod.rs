//! Travel-time lookup for the scheduler
//!
//! Uses Valhalla for production, a haversine estimate when Valhalla is not
//! configured or unreachable.

mod valhalla;

pub use valhalla::{ValhallaClient, ValhallaConfig};

use async_trait::async_trait;
use anyhow::Result;
use tracing::{info, warn};

use crate::error::ProviderError;
use crate::services::geo;
use crate::types::Coordinates;

/// Square travel-time matrix in minutes.
///
/// Index 0 is the origin, index `i` (1..=N) is the i-th destination in the
/// order it was requested. Entries are kept as `f64`; nothing is rounded.
#[derive(Debug, Clone, PartialEq)]
pub struct TravelTimeMatrix {
    minutes: Vec<Vec<f64>>,
}

impl TravelTimeMatrix {
    /// Build a matrix from minute rows, rejecting non-square shapes and
    /// negative or non-finite entries.
    pub fn new(minutes: Vec<Vec<f64>>) -> Result<Self, ProviderError> {
        let n = minutes.len();
        for (i, row) in minutes.iter().enumerate() {
            if row.len() != n {
                return Err(ProviderError::MalformedPayload(format!(
                    "row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
            if let Some((j, value)) = row
                .iter()
                .enumerate()
                .find(|(_, v)| !v.is_finite() || **v < 0.0)
            {
                return Err(ProviderError::MalformedPayload(format!(
                    "invalid travel time {} at [{}][{}]",
                    value, i, j
                )));
            }
        }
        Ok(Self { minutes })
    }

    /// Build a matrix from second rows (the external service's unit)
    pub fn from_seconds(seconds: Vec<Vec<f64>>) -> Result<Self, ProviderError> {
        Self::new(
            seconds
                .into_iter()
                .map(|row| row.into_iter().map(|s| s / 60.0).collect())
                .collect(),
        )
    }

    /// Matrix side length (destinations + 1)
    pub fn size(&self) -> usize {
        self.minutes.len()
    }

    /// Number of destinations (everything except the origin)
    pub fn destination_count(&self) -> usize {
        self.minutes.len().saturating_sub(1)
    }

    /// Travel minutes from node `from` to node `to`
    pub fn minutes(&self, from: usize, to: usize) -> f64 {
        self.minutes[from][to]
    }
}

/// Travel-time lookup abstraction (Valhalla, estimate, test fixtures)
#[async_trait]
pub trait TravelTimeProvider: Send + Sync {
    /// Pairwise travel times among `{origin} ∪ destinations`, origin at index 0,
    /// destinations in the given order. One outbound call, no retries.
    async fn travel_time_matrix(
        &self,
        origin: Coordinates,
        destinations: &[Coordinates],
    ) -> Result<TravelTimeMatrix, ProviderError>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Offline provider: haversine distance × road coefficient at an average speed
pub struct EstimateProvider {
    /// Coefficient for converting straight-line to road distance (default: 1.3)
    road_coefficient: f64,
    /// Average speed in km/h (default: 40)
    average_speed_kmh: f64,
}

impl Default for EstimateProvider {
    fn default() -> Self {
        Self {
            road_coefficient: geo::ROAD_COEFFICIENT,
            average_speed_kmh: geo::AVERAGE_SPEED_KMH,
        }
    }
}

impl EstimateProvider {
    pub fn with_params(road_coefficient: f64, average_speed_kmh: f64) -> Self {
        Self {
            road_coefficient,
            average_speed_kmh,
        }
    }
}

#[async_trait]
impl TravelTimeProvider for EstimateProvider {
    async fn travel_time_matrix(
        &self,
        origin: Coordinates,
        destinations: &[Coordinates],
    ) -> Result<TravelTimeMatrix, ProviderError> {
        let mut points = Vec::with_capacity(destinations.len() + 1);
        points.push(origin);
        points.extend_from_slice(destinations);

        let minutes = geo::time_matrix_with(&points, self.road_coefficient, self.average_speed_kmh);
        TravelTimeMatrix::new(minutes)
    }

    fn name(&self) -> &str {
        "Estimate"
    }
}

/// Create the travel-time provider, probing Valhalla first.
///
/// Returns `fallback` when no URL is configured, the client cannot be built,
/// or the health check fails.
pub async fn create_provider_with_fallback(
    valhalla_url: Option<String>,
    timeout_seconds: u64,
    fallback: EstimateProvider,
) -> Box<dyn TravelTimeProvider> {
    if let Some(url) = valhalla_url {
        let config = ValhallaConfig::new(url.clone(), timeout_seconds);

        match check_valhalla_health(&url).await {
            Ok(()) => match ValhallaClient::new(config) {
                Ok(client) => {
                    info!("Valhalla travel-time service available at {}", url);
                    return Box::new(client);
                }
                Err(e) => {
                    warn!("Failed to build Valhalla client: {}. Falling back to estimates.", e);
                }
            },
            Err(e) => {
                warn!("Valhalla not available at {}: {}. Falling back to estimates.", url, e);
            }
        }
    }

    info!("Using estimated travel times (Valhalla not configured or unavailable)");
    Box::new(fallback)
}

/// Check if Valhalla is healthy by making a simple status request
async fn check_valhalla_health(base_url: &str) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()?;

    let url = format!("{}/status", base_url);
    let response = client.get(&url).send().await?;

    if response.status().is_success() {
        Ok(())
    } else {
        anyhow::bail!("Valhalla returned status {}", response.status())
    }
}
