//! Scheduling request/response types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Coordinates;

/// Request to order a set of tasks into a feasible visit sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    #[serde(default)]
    pub task_ids: Vec<String>,
    pub origin: Coordinates,
    /// Current clock time, "HH:MM"
    #[serde(default)]
    pub current_time: Option<String>,
}

/// Result of the scheduler: a full visiting order or the infeasible sentinel
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSchedule {
    /// Task positions (0-based into the input task list) in visiting order
    pub sequence: Vec<usize>,
    /// Total elapsed minutes (travel + wait + service), -1 when infeasible
    pub total_cost: f64,
}

impl RouteSchedule {
    pub const INFEASIBLE_COST: f64 = -1.0;

    pub fn infeasible() -> Self {
        Self {
            sequence: vec![],
            total_cost: Self::INFEASIBLE_COST,
        }
    }

    pub fn is_feasible(&self) -> bool {
        self.total_cost >= 0.0
    }
}

/// Why the search stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Every admissible branch was explored
    Exhausted,
    /// Node budget spent, best candidate so far returned
    NodeBudget,
    /// Wall-clock deadline hit, best candidate so far returned
    Deadline,
    /// Cancelled by the caller, best candidate so far returned
    Cancelled,
}

impl Termination {
    pub const fn as_str(self) -> &'static str {
        match self {
            Termination::Exhausted => "exhausted",
            Termination::NodeBudget => "node_budget",
            Termination::Deadline => "deadline",
            Termination::Cancelled => "cancelled",
        }
    }

    pub const fn is_complete(self) -> bool {
        matches!(self, Termination::Exhausted)
    }
}

/// Timing of a single stop in a feasible schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryStop {
    pub task_id: String,
    pub travel_minutes: f64,
    pub wait_minutes: f64,
    pub arrival_minute: f64,
    pub service_start_minute: f64,
    pub departure_minute: f64,
}

/// Scheduling response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResponse {
    pub task_ids: Vec<String>,
    pub time_cost_minutes: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stops: Vec<ItineraryStop>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination: Option<Termination>,
}

impl ScheduleResponse {
    pub fn infeasible() -> Self {
        Self {
            task_ids: vec![],
            time_cost_minutes: RouteSchedule::INFEASIBLE_COST,
            stops: vec![],
            termination: None,
        }
    }
}

/// Request to cancel an in-flight scheduling request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelScheduleRequest {
    pub request_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelScheduleResponse {
    pub cancelled: bool,
}
