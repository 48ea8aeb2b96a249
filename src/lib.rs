//! Workspace umbrella crate for topicmatch.
//!
//! Stitches roster loading, topic embedding, and allocation together so
//! callers can go from two JSON data files to per-student supervisor
//! suggestions with a single call.

pub use allocator::{
    Allocation, AllocationConfig, AllocationError, AllocationMetrics, Allocator, Student,
    StudentSuggestions, Suggestion, Supervisor, allocate, set_allocation_metrics,
};
pub use embedding::{
    EmbeddingConfig, EmbeddingError, EmbeddingProvider, RetryConfig, StubEmbedder, build_provider,
};
pub use roster::{
    RosterError, StudentRecord, SupervisorRecord, clean_students, clean_supervisors,
    read_students, read_supervisors,
};

use std::error::Error;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

/// Errors that can occur while turning rosters into an allocation.
#[derive(Debug)]
pub enum PipelineError {
    Roster(RosterError),
    Embedding(EmbeddingError),
    Allocation(AllocationError),
    /// The provider returned a different number of vectors than texts sent.
    EmbeddingCount { expected: usize, found: usize },
    /// The blocking allocation task panicked or was cancelled.
    Task(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Roster(err) => write!(f, "roster failure: {err}"),
            PipelineError::Embedding(err) => write!(f, "embedding failure: {err}"),
            PipelineError::Allocation(err) => write!(f, "allocation failure: {err}"),
            PipelineError::EmbeddingCount { expected, found } => {
                write!(f, "embedding provider returned {found} vectors for {expected} texts")
            }
            PipelineError::Task(msg) => write!(f, "allocation task failed: {msg}"),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::Roster(err) => Some(err),
            PipelineError::Embedding(err) => Some(err),
            PipelineError::Allocation(err) => Some(err),
            PipelineError::EmbeddingCount { .. } | PipelineError::Task(_) => None,
        }
    }
}

impl From<RosterError> for PipelineError {
    fn from(value: RosterError) -> Self {
        PipelineError::Roster(value)
    }
}

impl From<EmbeddingError> for PipelineError {
    fn from(value: EmbeddingError) -> Self {
        PipelineError::Embedding(value)
    }
}

impl From<AllocationError> for PipelineError {
    fn from(value: AllocationError) -> Self {
        PipelineError::Allocation(value)
    }
}

/// Metrics observer for pipeline stages.
pub trait PipelineMetrics: Send + Sync {
    /// One batch embedding call; `texts` is the batch size.
    fn record_embedding(&self, latency: Duration, texts: usize, result: Result<(), EmbeddingError>);
    fn record_allocation(&self, latency: Duration, result: Result<(), AllocationError>);
}

/// Install or clear the global pipeline metrics recorder.
pub fn set_pipeline_metrics(recorder: Option<Arc<dyn PipelineMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn PipelineMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn PipelineMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

fn metrics_recorder() -> Option<Arc<dyn PipelineMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

struct MetricsSpan {
    recorder: Arc<dyn PipelineMetrics>,
    start: Instant,
}

impl MetricsSpan {
    fn start() -> Option<Self> {
        metrics_recorder().map(|recorder| Self {
            recorder,
            start: Instant::now(),
        })
    }

    fn record_embedding(self, texts: usize, result: Result<(), EmbeddingError>) {
        self.recorder
            .record_embedding(self.start.elapsed(), texts, result);
    }

    fn record_allocation(self, result: Result<(), AllocationError>) {
        self.recorder.record_allocation(self.start.elapsed(), result);
    }
}

async fn embed_texts(
    provider: &dyn EmbeddingProvider,
    texts: Vec<String>,
) -> Result<Vec<Vec<f32>>, PipelineError> {
    let span = MetricsSpan::start();
    let count = texts.len();
    let result = provider.embed_batch(&texts).await;
    if let Some(span) = span {
        span.record_embedding(count, result.as_ref().map(|_| ()).map_err(|e| e.clone()));
    }

    let vectors = result?;
    if vectors.len() != count {
        return Err(PipelineError::EmbeddingCount {
            expected: count,
            found: vectors.len(),
        });
    }
    Ok(vectors)
}

/// Embed every student topic and attach the vectors, keeping input order.
pub async fn embed_students(
    provider: &dyn EmbeddingProvider,
    records: Vec<StudentRecord>,
) -> Result<Vec<Student>, PipelineError> {
    let texts = records.iter().map(|r| r.student_topic.clone()).collect();
    let vectors = embed_texts(provider, texts).await?;
    Ok(records
        .into_iter()
        .zip(vectors)
        .map(|(r, v)| Student::new(r.id, r.student_topic, v))
        .collect())
}

/// Embed every supervisor research area and attach the vectors, keeping input order.
pub async fn embed_supervisors(
    provider: &dyn EmbeddingProvider,
    records: Vec<SupervisorRecord>,
) -> Result<Vec<Supervisor>, PipelineError> {
    let texts = records.iter().map(|r| r.research_area.clone()).collect();
    let vectors = embed_texts(provider, texts).await?;
    Ok(records
        .into_iter()
        .zip(vectors)
        .map(|(r, v)| Supervisor::new(r.id, r.research_area, v, r.available_slot))
        .collect())
}

/// Embed both rosters, then run the allocation off the async executor.
///
/// Records are expected to be cleaned already (see [`clean_students`]);
/// [`read_students`] and [`read_supervisors`] do that for file input.
pub async fn suggest_supervisors(
    provider: &dyn EmbeddingProvider,
    students: Vec<StudentRecord>,
    supervisors: Vec<SupervisorRecord>,
    config: AllocationConfig,
) -> Result<Allocation, PipelineError> {
    tracing::info!(
        students = students.len(),
        supervisors = supervisors.len(),
        model = provider.model_name(),
        "embedding rosters"
    );
    let students = embed_students(provider, students).await?;
    let supervisors = embed_supervisors(provider, supervisors).await?;

    let span = MetricsSpan::start();
    let result = tokio::task::spawn_blocking(move || allocate(&students, &supervisors, &config))
        .await
        .map_err(|e| PipelineError::Task(e.to_string()))?;
    if let Some(span) = span {
        span.record_allocation(result.as_ref().map(|_| ()).map_err(|e| e.clone()));
    }
    Ok(result?)
}

/// Load both data files and run [`suggest_supervisors`].
pub async fn suggest_from_files(
    provider: &dyn EmbeddingProvider,
    students_path: impl AsRef<Path>,
    supervisors_path: impl AsRef<Path>,
    config: AllocationConfig,
) -> Result<Allocation, PipelineError> {
    let students = read_students(students_path)?;
    let supervisors = read_supervisors(supervisors_path)?;
    suggest_supervisors(provider, students, supervisors, config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMetrics {
        embeddings: Mutex<Vec<usize>>,
        allocations: Mutex<Vec<bool>>,
    }

    impl PipelineMetrics for RecordingMetrics {
        fn record_embedding(&self, _: Duration, texts: usize, result: Result<(), EmbeddingError>) {
            assert!(result.is_ok());
            self.embeddings.lock().unwrap().push(texts);
        }

        fn record_allocation(&self, _: Duration, result: Result<(), AllocationError>) {
            self.allocations.lock().unwrap().push(result.is_ok());
        }
    }

    fn student(id: &str, topic: &str) -> StudentRecord {
        StudentRecord {
            id: id.into(),
            student_topic: topic.into(),
        }
    }

    fn supervisor(id: &str, area: &str, slots: i64) -> SupervisorRecord {
        SupervisorRecord {
            id: id.into(),
            research_area: area.into(),
            available_slot: slots,
        }
    }

    #[tokio::test]
    async fn pipeline_reports_stage_metrics() {
        let metrics = Arc::new(RecordingMetrics::default());
        set_pipeline_metrics(Some(metrics.clone()));

        let provider = StubEmbedder::new(64, true);
        let result = suggest_supervisors(
            &provider,
            vec![student("s1", "quantum computing")],
            vec![
                supervisor("p1", "quantum computing", 1),
                supervisor("p2", "bad", -1),
            ],
            AllocationConfig::default(),
        )
        .await;
        set_pipeline_metrics(None);

        assert!(matches!(
            result,
            Err(PipelineError::Allocation(AllocationError::InvalidCapacity { .. }))
        ));
        assert_eq!(*metrics.embeddings.lock().unwrap(), vec![1, 2]);
        assert_eq!(*metrics.allocations.lock().unwrap(), vec![false]);
    }

    #[test]
    fn display_wraps_inner_error() {
        let err = PipelineError::from(AllocationError::InvalidCapacity {
            supervisor_id: "p9".into(),
            capacity: -2,
        });
        assert!(err.to_string().starts_with("allocation failure:"));
        assert!(err.source().is_some());
    }

    #[test]
    fn count_mismatch_has_no_source() {
        let err = PipelineError::EmbeddingCount {
            expected: 3,
            found: 2,
        };
        assert!(err.source().is_none());
        assert!(err.to_string().contains("2 vectors for 3 texts"));
    }
}
