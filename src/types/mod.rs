//! Type definitions

pub mod messages;
pub mod schedule;
pub mod task;

pub use messages::*;
pub use schedule::*;
pub use task::*;
