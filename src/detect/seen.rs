use std::collections::HashSet;

/// In-memory set of token ids already reported or absorbed.
///
/// Grows monotonically for the life of the process. Not synchronised; the
/// owning [`DetectionEngine`](super::DetectionEngine) is the only writer.
#[derive(Debug, Default, Clone)]
pub struct SeenSet {
    ids: HashSet<i64>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, token_id: i64) -> bool {
        self.ids.contains(&token_id)
    }

    /// Idempotent insert
    pub fn mark_seen(&mut self, token_id: i64) {
        self.ids.insert(token_id);
    }

    /// Check-then-mark: `true` (and now marked) if the id was absent
    pub fn is_new(&mut self, token_id: i64) -> bool {
        self.ids.insert(token_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
