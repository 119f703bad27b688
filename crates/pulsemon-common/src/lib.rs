//! Shared wire types for the monitoring pipeline.
//!
//! Every service exchanges [`types::MetricEvent`] and [`types::AlertEvent`]
//! as self-describing JSON; the [`codec`] module pins down the timestamp
//! format and provides the encode/decode helpers all consumers agree on.

pub mod codec;
pub mod types;
