//! Streaming service.
//!
//! Fans raw metrics and alerts out to live dashboards over SSE. One shared
//! hot stream per topic is created at process start ([`hub::StreamHub`]);
//! every HTTP subscriber taps it through a bounded per-subscriber buffer,
//! with optional service filtering applied at the subscriber so the
//! upstream consumer group stays shared.

pub mod api;
pub mod app;
pub mod config;
pub mod hub;

#[cfg(test)]
mod tests;
