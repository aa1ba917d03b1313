//! Database queries

pub mod task;
