//! Turning a live surface into PNG files.

/// Batch input files.
pub mod batch;
/// Deterministic output file names.
pub mod naming;
/// Settle, capture and export.
pub mod pipeline;
/// PNG encoding of composed frames.
pub mod png;
/// Destinations for exported files.
pub mod sink;
