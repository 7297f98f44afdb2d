//! Newsrisk CLI - command layer and read-only dashboard API.

pub mod commands;
pub mod dashboard;
pub mod render;

pub use dashboard::{build_router, serve, DashboardState};
