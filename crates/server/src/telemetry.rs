//! Prometheus wiring.
//!
//! Installs the process-wide `metrics` recorder once and bridges the
//! allocator and pipeline observer hooks onto it.

use allocator::{set_allocation_metrics, AllocationError, AllocationMetrics};
use embedding::EmbeddingError;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use topicmatch::{set_pipeline_metrics, PipelineMetrics};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder (first call only) and the observer bridges.
///
/// Returns `None` if another recorder already owns the process.
pub fn init_metrics() -> Option<&'static PrometheusHandle> {
    if let Some(existing) = PROMETHEUS_HANDLE.get() {
        return Some(existing);
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = PROMETHEUS_HANDLE.set(handle);
            set_allocation_metrics(Some(Arc::new(RecorderBridge)));
            set_pipeline_metrics(Some(Arc::new(RecorderBridge)));
            tracing::info!("installed prometheus recorder");
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to install prometheus recorder");
        }
    }
    PROMETHEUS_HANDLE.get()
}

/// Current metrics in Prometheus text format, if the recorder is installed.
pub fn render() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(PrometheusHandle::render)
}

/// Forwards observer callbacks to the `metrics` facade.
struct RecorderBridge;

impl AllocationMetrics for RecorderBridge {
    fn record_allocation(
        &self,
        latency: Duration,
        students: usize,
        supervisors: usize,
        suggestions: usize,
    ) {
        metrics::histogram!("topicmatch_allocation_duration_seconds")
            .record(latency.as_secs_f64());
        metrics::counter!("topicmatch_allocation_students_total").increment(students as u64);
        metrics::counter!("topicmatch_suggestions_total").increment(suggestions as u64);
        metrics::gauge!("topicmatch_last_run_supervisors").set(supervisors as f64);
    }
}

impl PipelineMetrics for RecorderBridge {
    fn record_embedding(&self, latency: Duration, texts: usize, result: Result<(), EmbeddingError>) {
        metrics::histogram!("topicmatch_embedding_duration_seconds")
            .record(latency.as_secs_f64());
        metrics::counter!("topicmatch_embedded_texts_total").increment(texts as u64);
        if let Err(err) = result {
            let kind = match err {
                EmbeddingError::RateLimited(_) => "rate_limited",
                EmbeddingError::Provider { .. } => "provider",
                EmbeddingError::Transport(_) => "transport",
                EmbeddingError::InvalidResponse(_) => "invalid_response",
                EmbeddingError::InvalidConfig(_) => "invalid_config",
            };
            metrics::counter!("topicmatch_embedding_errors_total", "kind" => kind).increment(1);
        }
    }

    fn record_allocation(&self, _latency: Duration, result: Result<(), AllocationError>) {
        if result.is_err() {
            metrics::counter!("topicmatch_allocation_errors_total").increment(1);
        }
    }
}
