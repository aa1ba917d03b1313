//! Configuration management

use std::time::Duration;

use anyhow::{self, Context, Result};

use crate::defaults::{
    DEFAULT_MAX_TASKS, DEFAULT_NATS_URL, DEFAULT_SEARCH_TIMEOUT_MS,
    DEFAULT_VALHALLA_TIMEOUT_SECONDS,
};
use crate::services::geo::{AVERAGE_SPEED_KMH, ROAD_COEFFICIENT};
use crate::services::scheduler::MAX_SEARCH_TASKS;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// NATS server URL
    pub nats_url: String,

    /// PostgreSQL connection string (task store)
    pub database_url: String,

    /// Valhalla routing engine URL (optional, falls back to estimates if unavailable)
    pub valhalla_url: Option<String>,

    /// Valhalla request timeout
    pub valhalla_timeout_seconds: u64,

    /// Straight-line to road distance factor for estimated travel times
    pub estimate_road_coefficient: f64,

    /// Average speed for estimated travel times
    pub estimate_speed_kmh: f64,

    /// Scheduler limits applied to every request
    pub scheduler: SchedulerConfig,
}

/// Bounds on the exhaustive search
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Requests with more tasks are rejected up front
    pub max_tasks: usize,
    /// Wall-clock budget per search
    pub search_timeout: Duration,
    /// Optional node budget per search
    pub node_budget: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_tasks: DEFAULT_MAX_TASKS,
            search_timeout: Duration::from_millis(DEFAULT_SEARCH_TIMEOUT_MS),
            node_budget: None,
        }
    }
}

/// Positive finite factor from `name`, or `default` when unset
fn positive_env(name: &str, default: f64) -> Result<f64> {
    let value = parse_env::<f64>(name)?.unwrap_or(default);
    if !value.is_finite() || value <= 0.0 {
        anyhow::bail!("{} must be a positive number (current: {})", name, value);
    }
    Ok(value)
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} is invalid ({}): {}", name, raw, e)),
        _ => Ok(None),
    }
}

impl SchedulerConfig {
    /// Load scheduler limits from environment variables
    pub fn from_env() -> Result<Self> {
        let max_tasks = parse_env::<usize>("SCHEDULER_MAX_TASKS")?.unwrap_or(DEFAULT_MAX_TASKS);
        if max_tasks == 0 || max_tasks > MAX_SEARCH_TASKS {
            anyhow::bail!(
                "SCHEDULER_MAX_TASKS must be between 1 and {} (current: {})",
                MAX_SEARCH_TASKS,
                max_tasks
            );
        }

        let timeout_ms =
            parse_env::<u64>("SCHEDULER_TIMEOUT_MS")?.unwrap_or(DEFAULT_SEARCH_TIMEOUT_MS);
        let node_budget = parse_env::<u64>("SCHEDULER_NODE_BUDGET")?;

        if max_tasks > 12 && node_budget.is_none() {
            tracing::warn!(
                "SCHEDULER_MAX_TASKS={} without SCHEDULER_NODE_BUDGET: large requests will run until the {} ms deadline",
                max_tasks,
                timeout_ms
            );
        }

        Ok(Self {
            max_tasks,
            search_timeout: Duration::from_millis(timeout_ms),
            node_budget,
        })
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let nats_url = std::env::var("NATS_URL")
            .unwrap_or_else(|_| DEFAULT_NATS_URL.to_string());

        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set")?;

        let valhalla_url = std::env::var("VALHALLA_URL").ok().filter(|u| !u.is_empty());

        let valhalla_timeout_seconds = parse_env::<u64>("VALHALLA_TIMEOUT_SECONDS")?
            .unwrap_or(DEFAULT_VALHALLA_TIMEOUT_SECONDS);

        let estimate_road_coefficient = positive_env("ESTIMATE_ROAD_COEFFICIENT", ROAD_COEFFICIENT)?;
        let estimate_speed_kmh = positive_env("ESTIMATE_SPEED_KMH", AVERAGE_SPEED_KMH)?;

        let scheduler = SchedulerConfig::from_env()?;

        Ok(Self {
            nats_url,
            database_url,
            valhalla_url,
            valhalla_timeout_seconds,
            estimate_road_coefficient,
            estimate_speed_kmh,
            scheduler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_config_default() {
        let config = SchedulerConfig::default();
        assert_eq!(config.max_tasks, 10);
        assert_eq!(config.search_timeout, Duration::from_millis(5_000));
        assert!(config.node_budget.is_none());
    }

    #[test]
    fn test_parse_env_unset_is_none() {
        let value = parse_env::<u64>("TASKROUTE_TEST_SURELY_UNSET").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("TASKROUTE_TEST_GARBAGE", "ten");
        let result = parse_env::<u64>("TASKROUTE_TEST_GARBAGE");
        std::env::remove_var("TASKROUTE_TEST_GARBAGE");

        let err = result.unwrap_err();
        assert!(err.to_string().contains("TASKROUTE_TEST_GARBAGE"));
    }

    #[test]
    fn test_parse_env_trims() {
        std::env::set_var("TASKROUTE_TEST_TRIM", " 250 ");
        let result = parse_env::<u64>("TASKROUTE_TEST_TRIM");
        std::env::remove_var("TASKROUTE_TEST_TRIM");

        assert_eq!(result.unwrap(), Some(250));
    }

    #[test]
    fn test_positive_env_default_and_rejection() {
        assert_eq!(positive_env("TASKROUTE_TEST_SURELY_UNSET_SPEED", 40.0).unwrap(), 40.0);

        std::env::set_var("TASKROUTE_TEST_NEGATIVE_SPEED", "-5");
        let result = positive_env("TASKROUTE_TEST_NEGATIVE_SPEED", 40.0);
        std::env::remove_var("TASKROUTE_TEST_NEGATIVE_SPEED");
        assert!(result.is_err());

        std::env::set_var("TASKROUTE_TEST_FAST_SPEED", "60.5");
        let result = positive_env("TASKROUTE_TEST_FAST_SPEED", 40.0);
        std::env::remove_var("TASKROUTE_TEST_FAST_SPEED");
        assert_eq!(result.unwrap(), 60.5);
    }

    #[test]
    #[ignore] // requires --test-threads=1 due to env var race
    fn test_config_valhalla_url_none_when_not_set() {
        std::env::remove_var("VALHALLA_URL");
        std::env::set_var("DATABASE_URL", "postgres://test");

        let config = Config::from_env().unwrap();
        assert!(config.valhalla_url.is_none());
    }

    #[test]
    #[ignore] // requires --test-threads=1 due to env var race
    fn test_config_rejects_oversized_max_tasks() {
        std::env::set_var("DATABASE_URL", "postgres://test");
        std::env::set_var("SCHEDULER_MAX_TASKS", "65");

        let result = Config::from_env();
        std::env::remove_var("SCHEDULER_MAX_TASKS");

        assert!(result.is_err());
    }

    #[test]
    #[ignore] // requires --test-threads=1 due to env var race
    fn test_config_scheduler_limits_from_env() {
        std::env::set_var("DATABASE_URL", "postgres://test");
        std::env::set_var("SCHEDULER_MAX_TASKS", "8");
        std::env::set_var("SCHEDULER_TIMEOUT_MS", "1500");
        std::env::set_var("SCHEDULER_NODE_BUDGET", "200000");

        let config = Config::from_env().unwrap();
        for name in ["SCHEDULER_MAX_TASKS", "SCHEDULER_TIMEOUT_MS", "SCHEDULER_NODE_BUDGET"] {
            std::env::remove_var(name);
        }

        assert_eq!(config.scheduler.max_tasks, 8);
        assert_eq!(config.scheduler.search_timeout, Duration::from_millis(1500));
        assert_eq!(config.scheduler.node_budget, Some(200_000));
    }
}
