// Core data types and errors
pub mod core;

// Feed parsing
pub mod ingest;

// New-token detection
pub mod detect;

// Feed and push clients
pub mod client;

// Alert delivery
pub mod transport;

pub mod config;
pub mod monitor;
pub mod util;

// Re-export commonly used types for convenience
pub use self::core::*;
pub use detect::{DetectionEngine, Phase, SeenSet};
pub use ingest::{ParsedBatch, TokenRecordParser};
pub use monitor::{CycleReport, Monitor, MonitorSettings};
