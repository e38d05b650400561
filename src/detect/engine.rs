use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::seen::SeenSet;
use crate::core::types::Token;

/// Default "newly created" window applied to the first batch
pub const DEFAULT_THRESHOLD_MINUTES: i64 = 30;

/// Process-wide operating phase. Moves Startup -> SteadyState once, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// No batch processed yet; the next batch is absorbed as history
    Startup,
    /// History established; identity novelty alone decides reporting
    SteadyState,
}

/// Decides which tokens of a batch are new and must be reported.
///
/// Startup: every token is absorbed into the seen-set; only tokens created
/// within the threshold window are reported. The phase then flips to
/// SteadyState whatever the batch contained, including nothing.
///
/// SteadyState: a token is reported iff its id was never seen before.
/// Duplicates inside one batch are reported once, at first occurrence.
///
/// Callers must serialise access; batches are never processed concurrently.
#[derive(Debug)]
pub struct DetectionEngine {
    seen: SeenSet,
    phase: Phase,
    threshold: Duration,
    batches_processed: u64,
    total_reported: u64,
}

impl Default for DetectionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionEngine {
    pub fn new() -> Self {
        Self::with_threshold(Duration::minutes(DEFAULT_THRESHOLD_MINUTES))
    }

    /// Windows too large for a `Duration` are clamped to the largest one.
    pub fn with_threshold_minutes(minutes: i64) -> Self {
        Self::with_threshold(Duration::try_minutes(minutes).unwrap_or(Duration::MAX))
    }

    pub fn with_threshold(threshold: Duration) -> Self {
        debug!(threshold_minutes = threshold.num_minutes(), "Detection engine created");
        Self {
            seen: SeenSet::new(),
            phase: Phase::Startup,
            threshold,
            batches_processed: 0,
            total_reported: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_first_run(&self) -> bool {
        self.phase == Phase::Startup
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    pub fn batches_processed(&self) -> u64 {
        self.batches_processed
    }

    pub fn total_reported(&self) -> u64 {
        self.total_reported
    }

    /// Run one batch against the current wall clock
    pub fn process_batch(&mut self, tokens: &[Token]) -> Vec<Token> {
        self.process_batch_at(tokens, Utc::now())
    }

    /// Run one batch, measuring token age against `now`
    pub fn process_batch_at(&mut self, tokens: &[Token], now: DateTime<Utc>) -> Vec<Token> {
        let reported = match self.phase {
            Phase::Startup => self.absorb_startup_batch(tokens, now),
            Phase::SteadyState => self.collect_novel(tokens),
        };

        self.batches_processed += 1;
        self.total_reported += reported.len() as u64;
        reported
    }

    fn absorb_startup_batch(&mut self, tokens: &[Token], now: DateTime<Utc>) -> Vec<Token> {
        let mut reported = Vec::new();

        for token in tokens {
            let first_occurrence = !self.seen.contains(token.token_id);
            self.seen.mark_seen(token.token_id);

            if first_occurrence && token.is_newly_created_at(self.threshold, now) {
                reported.push(token.clone());
            }
        }

        self.phase = Phase::SteadyState;
        info!(
            batch_size = tokens.len(),
            recent = reported.len(),
            seen = self.seen.len(),
            "First batch absorbed, switching to steady-state detection"
        );
        reported
    }

    fn collect_novel(&mut self, tokens: &[Token]) -> Vec<Token> {
        let reported: Vec<Token> = tokens
            .iter()
            .filter(|token| self.seen.is_new(token.token_id))
            .cloned()
            .collect();

        debug!(
            batch_size = tokens.len(),
            new = reported.len(),
            seen = self.seen.len(),
            "Steady-state batch processed"
        );
        reported
    }
}
