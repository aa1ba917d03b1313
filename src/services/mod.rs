//! Scheduling services

pub mod cancellation;
pub mod clock;
pub mod geo;
pub mod itinerary;
pub mod routing;
pub mod scheduler;
pub mod store;
