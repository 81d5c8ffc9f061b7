// src/engine/queue.rs

use std::collections::BTreeSet;

use tracing::debug;

use super::TaskName;

/// Follow-up runs requested while a task was in flight.
///
/// Semantics:
/// - At most one follow-up is remembered per task; further triggers while
///   one is already pending coalesce into it.
/// - When the in-flight invocation finishes, the follow-up is taken exactly
///   once and dispatched as a fresh invocation.
#[derive(Debug, Default)]
pub struct RerunQueue {
    pending: BTreeSet<TaskName>,
}

impl RerunQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no follow-up is pending for any task.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Pending tasks in name order.
    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }

    /// Remember that `task` must run again. Returns false when a follow-up
    /// was already pending and this trigger coalesced into it.
    pub fn record(&mut self, task: &str) -> bool {
        let inserted = self.pending.insert(task.to_string());
        debug!(task = %task, coalesced = !inserted, "recorded follow-up run");
        inserted
    }

    /// Take the pending follow-up for `task`, if any.
    pub fn take(&mut self, task: &str) -> bool {
        self.pending.remove(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_records_coalesce() {
        let mut q = RerunQueue::new();
        assert!(q.record("css"));
        assert!(!q.record("css"));
        assert!(q.record("js"));
        assert_eq!(q.len(), 2);

        assert!(q.take("css"));
        assert!(!q.take("css"));
        assert_eq!(q.len(), 1);
    }
}
