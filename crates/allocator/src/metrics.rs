// Metrics hooks for the `allocator` crate.
//
// Callers install a global `AllocationMetrics` implementation via
// [`set_allocation_metrics`]; every successful run through [`Allocator::run`]
// then reports its latency and size. This keeps instrumentation decoupled from
// any specific metrics backend.
use std::sync::{Arc, RwLock};
use std::time::Duration;

use once_cell::sync::OnceCell;

/// Metrics observer for allocation runs.
pub trait AllocationMetrics: Send + Sync {
    /// Record the outcome of one run.
    ///
    /// `students` and `supervisors` are the input sizes, `suggestions` the
    /// total number of suggestions issued across all students.
    fn record_allocation(
        &self,
        latency: Duration,
        students: usize,
        supervisors: usize,
        suggestions: usize,
    );
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn AllocationMetrics>>> {
    static METRICS: OnceCell<RwLock<Option<Arc<dyn AllocationMetrics>>>> = OnceCell::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn AllocationMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

/// Install or clear the global allocation metrics recorder.
///
/// Typically called once during service startup.
pub fn set_allocation_metrics(recorder: Option<Arc<dyn AllocationMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}
