//! Task types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Geographic position (WGS84)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(rename = "latitude")]
    pub lat: f64,
    #[serde(rename = "longitude")]
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Both components finite and inside the WGS84 range
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// The (0, 0) point clients send when they have no location fix
    pub fn is_null_island(&self) -> bool {
        self.lat == 0.0 && self.lng == 0.0
    }
}

/// Task record as returned by the task store
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    pub name: String,
    /// Earliest start, "HH:MM"
    pub start_time: String,
    /// Deadline, "HH:MM"
    pub end_time: String,
    pub duration_minutes: i32,
    pub latitude: f64,
    pub longitude: f64,
    pub priority: i32,
    pub description: Option<String>,
}

impl TaskRecord {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Task as seen by the scheduler. All times are minutes since midnight.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: String,
    pub start_minute: f64,
    pub end_minute: f64,
    pub duration_minutes: f64,
    pub coordinates: Coordinates,
    /// Informational only, never part of the cost
    pub priority: i32,
    pub description: Option<String>,
}

impl Task {
    #[cfg(test)]
    pub fn new(id: impl Into<String>, start_minute: u32, end_minute: u32, duration_minutes: u32) -> Self {
        Self {
            id: id.into(),
            start_minute: start_minute as f64,
            end_minute: end_minute as f64,
            duration_minutes: duration_minutes as f64,
            coordinates: Coordinates::new(0.0, 0.0),
            priority: 0,
            description: None,
        }
    }

    /// Waiting time when arriving at `arrival`
    pub fn wait_at(&self, arrival: f64) -> f64 {
        (self.start_minute - arrival).max(0.0)
    }

    /// Whether service can begin by the deadline when arriving at `arrival`
    pub fn reachable_at(&self, arrival: f64) -> bool {
        arrival + self.wait_at(arrival) <= self.end_minute
    }
}
