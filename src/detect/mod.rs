//! New-token detection: seen-set bookkeeping and the two-phase report policy

pub mod seen;
pub mod engine;

pub use seen::SeenSet;
pub use engine::{DetectionEngine, Phase, DEFAULT_THRESHOLD_MINUTES};
