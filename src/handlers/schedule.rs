//! Scheduling message handlers
//!
//! `taskroute.schedule` resolves the requested tasks, fetches one travel-time
//! matrix and runs the route scheduler on the blocking pool.
//! `taskroute.schedule.cancel` stops an in-flight search early.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::decode_request;
use crate::config::SchedulerConfig;
use crate::error::{ProviderError, SchedulingError, ValidationError};
use crate::services::cancellation::CancellationRegistry;
use crate::services::clock::{format_minutes, parse_clock_minutes};
use crate::services::itinerary::build_itinerary;
use crate::services::routing::{TravelTimeMatrix, TravelTimeProvider};
use crate::services::scheduler::{RouteScheduler, SearchLimits};
use crate::services::store::TaskStore;
use crate::types::{
    CancelScheduleRequest, CancelScheduleResponse, Coordinates, ErrorResponse, Request,
    ScheduleRequest, ScheduleResponse, SuccessResponse, Task, TaskRecord,
};

/// Everything a scheduling request needs, shared across requests
pub struct ScheduleContext {
    pub store: Arc<dyn TaskStore>,
    pub provider: Arc<dyn TravelTimeProvider>,
    pub registry: CancellationRegistry,
    pub limits: SchedulerConfig,
}

/// Check request-level fields; returns the current time in minutes.
///
/// Runs before the store, the provider or the scheduler are touched.
pub fn validate_request(request: &ScheduleRequest, max_tasks: usize) -> Result<u32, ValidationError> {
    if request.task_ids.is_empty() {
        return Err(ValidationError::EmptyTaskIds);
    }
    if request.task_ids.len() > max_tasks {
        return Err(ValidationError::TooManyTasks {
            count: request.task_ids.len(),
            max: max_tasks,
        });
    }

    let mut seen = HashSet::with_capacity(request.task_ids.len());
    for id in &request.task_ids {
        if !seen.insert(id.as_str()) {
            return Err(ValidationError::DuplicateTaskId(id.clone()));
        }
    }

    let origin = request.origin;
    if origin.is_null_island() {
        return Err(ValidationError::NullOrigin);
    }
    if !origin.is_valid() {
        return Err(ValidationError::InvalidOrigin {
            lat: origin.lat,
            lng: origin.lng,
        });
    }

    let current_time = request
        .current_time
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or(ValidationError::MissingCurrentTime)?;

    parse_clock_minutes(current_time)
}

fn invalid_task(task_id: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidTask {
        task_id: task_id.to_string(),
        reason: reason.into(),
    }
}

/// Convert a store record into a scheduler task, rejecting values the
/// search has no defined behaviour for
pub fn task_from_record(record: TaskRecord) -> Result<Task, ValidationError> {
    let start = parse_clock_minutes(&record.start_time)
        .map_err(|_| invalid_task(&record.id, format!("invalid start time '{}'", record.start_time)))?;
    let end = parse_clock_minutes(&record.end_time)
        .map_err(|_| invalid_task(&record.id, format!("invalid end time '{}'", record.end_time)))?;

    if start >= end {
        return Err(invalid_task(
            &record.id,
            format!("start {} is not before end {}", record.start_time, record.end_time),
        ));
    }
    if record.duration_minutes <= 0 {
        return Err(invalid_task(
            &record.id,
            format!("duration must be positive, got {}", record.duration_minutes),
        ));
    }

    let coordinates = record.coordinates();
    if !coordinates.is_valid() {
        return Err(invalid_task(&record.id, "coordinates out of range"));
    }

    Ok(Task {
        id: record.id,
        start_minute: start as f64,
        end_minute: end as f64,
        duration_minutes: record.duration_minutes as f64,
        coordinates,
        priority: record.priority,
        description: record.description,
    })
}

/// Run the search and translate indices back to task ids
fn run_search(
    tasks: &[Task],
    matrix: &TravelTimeMatrix,
    current_minute: f64,
    limits: &SearchLimits,
) -> Result<ScheduleResponse, SchedulingError> {
    let scheduler = RouteScheduler::new(tasks, matrix, current_minute)?;
    let outcome = scheduler.search(limits);

    if !outcome.termination.is_complete() {
        warn!(
            "Search stopped early ({}) after {} nodes, {} candidates",
            outcome.termination.as_str(),
            outcome.nodes_explored,
            outcome.candidates
        );
    }

    if !outcome.schedule.is_feasible() {
        // Exhausted searches stay bare; cut-short ones carry their reason
        let mut response = ScheduleResponse::infeasible();
        if !outcome.termination.is_complete() {
            response.termination = Some(outcome.termination);
        }
        return Ok(response);
    }

    let stops = build_itinerary(tasks, matrix, current_minute, &outcome.schedule);
    let task_ids = outcome
        .schedule
        .sequence
        .iter()
        .map(|&idx| tasks[idx].id.clone())
        .collect();

    Ok(ScheduleResponse {
        task_ids,
        time_cost_minutes: outcome.schedule.total_cost,
        stops,
        termination: Some(outcome.termination),
    })
}

/// Process one scheduling request end to end
pub async fn process_schedule(
    ctx: &ScheduleContext,
    request_id: Uuid,
    request: ScheduleRequest,
) -> Result<ScheduleResponse, SchedulingError> {
    let started_at = Instant::now();
    let current_minute = validate_request(&request, ctx.limits.max_tasks)?;
    debug!(
        "Scheduling {} tasks for request {} starting at {}",
        request.task_ids.len(),
        request_id,
        format_minutes(current_minute as f64)
    );

    let guard = ctx.registry.register(request_id);

    let records = ctx.store.get_tasks(&request.task_ids).await?;
    let tasks = records
        .into_iter()
        .map(task_from_record)
        .collect::<Result<Vec<_>, _>>()?;

    let destinations: Vec<Coordinates> = tasks.iter().map(|t| t.coordinates).collect();
    let matrix = ctx
        .provider
        .travel_time_matrix(request.origin, &destinations)
        .await?;
    if matrix.destination_count() != tasks.len() || matrix.size() != tasks.len() + 1 {
        return Err(ProviderError::MalformedPayload(format!(
            "matrix covers {} destinations, requested {}",
            matrix.destination_count(),
            tasks.len()
        ))
        .into());
    }
    debug!(
        "Travel-time matrix from {} ready in {} ms",
        ctx.provider.name(),
        started_at.elapsed().as_millis()
    );

    let limits = SearchLimits {
        node_budget: ctx.limits.node_budget,
        deadline: Some(Instant::now() + ctx.limits.search_timeout),
        cancel: Some(guard.token()),
    };

    let response = tokio::task::spawn_blocking(move || {
        run_search(&tasks, &matrix, current_minute as f64, &limits)
    })
    .await
    .map_err(|e| SchedulingError::Internal(format!("search task failed: {}", e)))??;

    drop(guard);

    info!(
        "Scheduled {} tasks: feasible={} cost={} in {} ms",
        request.task_ids.len(),
        !response.task_ids.is_empty(),
        response.time_cost_minutes,
        started_at.elapsed().as_millis()
    );

    Ok(response)
}

/// Handle taskroute.schedule messages
pub async fn handle_schedule(
    client: Client,
    mut subscriber: Subscriber,
    ctx: Arc<ScheduleContext>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received schedule message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<ScheduleRequest> = match decode_request(&msg.payload) {
            Ok(req) => req,
            Err(error) => {
                error!("Failed to parse schedule request {}: {}", error.id, error.error.message);
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        // Each request runs independently so a long search never blocks the next one
        let client = client.clone();
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            let body = match process_schedule(&ctx, request.id, request.payload).await {
                Ok(response) => serde_json::to_vec(&SuccessResponse::new(request.id, response)),
                Err(e) => {
                    if e.is_client_error() {
                        warn!("Rejected schedule request {}: {}", request.id, e);
                    } else {
                        error!("Schedule request {} failed: {}", request.id, e);
                    }
                    serde_json::to_vec(&ErrorResponse::from_error(request.id, &e))
                }
            };

            match body {
                Ok(bytes) => {
                    if let Err(e) = client.publish(reply, bytes.into()).await {
                        error!("Failed to publish schedule reply: {}", e);
                    }
                }
                Err(e) => error!("Failed to serialize schedule reply: {}", e),
            }
        });
    }

    Ok(())
}

/// Handle taskroute.schedule.cancel messages
pub async fn handle_cancel(
    client: Client,
    mut subscriber: Subscriber,
    registry: CancellationRegistry,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => continue,
        };

        let request: Request<CancelScheduleRequest> = match decode_request(&msg.payload) {
            Ok(req) => req,
            Err(error) => {
                error!("Failed to parse cancel request {}: {}", error.id, error.error.message);
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let target = request.payload.request_id;
        let cancelled = registry.cancel(&target);
        info!("Cancel request for schedule {}: cancelled={}", target, cancelled);

        let response = SuccessResponse::new(request.id, CancelScheduleResponse { cancelled });
        let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
    }

    Ok(())
}
