//! NATS message handlers

pub mod ping;
pub mod schedule;

use std::sync::Arc;

use anyhow::Result;
use async_nats::Client;
use serde::de::DeserializeOwned;
use tokio::select;
use tracing::{error, info};

use crate::config::Config;
use crate::services::cancellation::CANCELLATION;
use crate::services::routing::{create_provider_with_fallback, EstimateProvider, TravelTimeProvider};
use crate::services::store::TaskStore;
use crate::types::{ErrorResponse, Request};

use schedule::ScheduleContext;

pub const SUBJECT_PING: &str = "taskroute.ping";
pub const SUBJECT_SCHEDULE: &str = "taskroute.schedule";
pub const SUBJECT_SCHEDULE_CANCEL: &str = "taskroute.schedule.cancel";

/// Decode a request envelope in two steps so a bad payload is still answered
/// under the caller's request id. Only an unreadable envelope gets the nil id.
pub(crate) fn decode_request<T: DeserializeOwned>(bytes: &[u8]) -> std::result::Result<Request<T>, ErrorResponse> {
    let envelope: Request<serde_json::Value> = serde_json::from_slice(bytes)
        .map_err(|e| ErrorResponse::new(uuid::Uuid::nil(), "INVALID_REQUEST", e.to_string()))?;

    let payload = serde_json::from_value(envelope.payload).map_err(|e| {
        ErrorResponse::new(envelope.id, "INVALID_REQUEST", format!("invalid payload: {}", e))
    })?;

    Ok(Request {
        id: envelope.id,
        timestamp: envelope.timestamp,
        payload,
    })
}

/// Start all message handlers
pub async fn start_handlers(client: Client, store: Arc<dyn TaskStore>, config: &Config) -> Result<()> {
    info!("Starting message handlers...");
    info!("Task store: {}", store.name());

    // Travel-time provider with automatic Valhalla detection
    let estimate = EstimateProvider::with_params(config.estimate_road_coefficient, config.estimate_speed_kmh);
    let provider: Arc<dyn TravelTimeProvider> = Arc::from(
        create_provider_with_fallback(config.valhalla_url.clone(), config.valhalla_timeout_seconds, estimate)
            .await,
    );
    info!("Travel-time provider initialized: {}", provider.name());

    let ctx = Arc::new(ScheduleContext {
        store,
        provider,
        registry: CANCELLATION.clone(),
        limits: config.scheduler.clone(),
    });
    info!(
        "Scheduler limits: max_tasks={} timeout={:?} node_budget={:?}",
        ctx.limits.max_tasks, ctx.limits.search_timeout, ctx.limits.node_budget
    );

    let ping_sub = client.subscribe(SUBJECT_PING).await?;
    let schedule_sub = client.subscribe(SUBJECT_SCHEDULE).await?;
    let cancel_sub = client.subscribe(SUBJECT_SCHEDULE_CANCEL).await?;

    info!("Subscribed to NATS subjects");

    let ping_handle = tokio::spawn(ping::handle_ping(client.clone(), ping_sub));
    let schedule_handle = tokio::spawn(schedule::handle_schedule(client.clone(), schedule_sub, Arc::clone(&ctx)));
    let cancel_handle = tokio::spawn(schedule::handle_cancel(client, cancel_sub, ctx.registry.clone()));

    info!("All handlers started, waiting for messages...");

    select! {
        result = ping_handle => {
            error!("Ping handler finished: {:?}", result);
        }
        result = schedule_handle => {
            error!("Schedule handler finished: {:?}", result);
        }
        result = cancel_handle => {
            error!("Schedule cancel handler finished: {:?}", result);
        }
    }

    Ok(())
}
