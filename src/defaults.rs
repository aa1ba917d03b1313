pub const DEFAULT_NATS_URL: &str = "nats://localhost:4222";

pub const DEFAULT_VALHALLA_TIMEOUT_SECONDS: u64 = 30;

/// 10! orderings is still interactive; beyond that the search leans on the deadline
pub const DEFAULT_MAX_TASKS: usize = 10;

pub const DEFAULT_SEARCH_TIMEOUT_MS: u64 = 5_000;
