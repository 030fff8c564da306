use std::sync::atomic::{AtomicU64, Ordering};

/// Shared line-throughput counter for pipeline runs.
///
/// Workers increment the counter exactly once per input line they claim, whether or
/// not the line maps to a record, so after a run completes `lines_seen` equals the
/// number of input lines regardless of worker count. Callers can read the counter at
/// any time (e.g. from a progress-reporting thread); only the post-run value is a
/// stable total.
#[derive(Debug, Default)]
pub struct PipelineStats {
    lines_seen: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self {
            lines_seen: AtomicU64::new(0),
        }
    }

    pub(crate) fn on_line(&self) {
        let _ = self.lines_seen.fetch_add(1, Ordering::SeqCst);
    }

    /// Snapshot read of the number of lines claimed so far.
    pub fn lines_seen(&self) -> u64 {
        self.lines_seen.load(Ordering::SeqCst)
    }
}
