//! In-process allocation job runner.
//!
//! Jobs are submitted as futures, run on the tokio runtime behind a
//! semaphore, and tracked in a [`JobStore`] until they are evicted by the
//! retention limit.

use allocator::Allocation;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// Full state of one job, as returned by `GET /api/v1/allocations/{job_id}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub job_id: Uuid,
    /// Submission order within this store; breaks `submitted_at` ties.
    #[serde(skip)]
    pub(crate) seq: u64,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Allocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Listing entry for `GET /api/v1/allocations`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
}

/// Shared job table plus the concurrency and time limits applied to each job.
#[derive(Clone)]
pub struct JobStore {
    jobs: Arc<DashMap<Uuid, JobRecord>>,
    next_seq: Arc<AtomicU64>,
    permits: Arc<Semaphore>,
    timeout: Duration,
    retention: usize,
}

impl JobStore {
    pub fn new(max_concurrent: usize, timeout: Duration, retention: usize) -> Self {
        Self {
            jobs: Arc::new(DashMap::new()),
            next_seq: Arc::new(AtomicU64::new(0)),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            timeout,
            retention,
        }
    }

    /// Register a job and spawn it. Returns immediately with the job id.
    ///
    /// The job waits for a permit, then runs under the store's timeout. Its
    /// outcome is written back to the store when it settles.
    pub fn submit<F>(&self, work: F) -> Uuid
    where
        F: Future<Output = Result<Allocation, String>> + Send + 'static,
    {
        let job_id = Uuid::new_v4();
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.jobs.insert(
            job_id,
            JobRecord {
                job_id,
                seq,
                status: JobStatus::Pending,
                submitted_at: Utc::now(),
                started_at: None,
                finished_at: None,
                result: None,
                error: None,
            },
        );
        metrics::counter!("topicmatch_jobs_submitted_total").increment(1);
        tracing::info!(%job_id, "allocation job submitted");

        let store = self.clone();
        tokio::spawn(async move {
            let outcome = match store.permits.clone().acquire_owned().await {
                Ok(_permit) => {
                    store.mark_running(job_id);
                    match tokio::time::timeout(store.timeout, work).await {
                        Ok(result) => result,
                        Err(_) => Err(format!(
                            "job timed out after {}s",
                            store.timeout.as_secs()
                        )),
                    }
                }
                Err(_) => Err("job runner is shutting down".to_string()),
            };
            store.finish(job_id, outcome);
        });

        job_id
    }

    pub fn get(&self, job_id: &Uuid) -> Option<JobRecord> {
        self.jobs.get(job_id).map(|entry| entry.value().clone())
    }

    /// Most recently submitted jobs first.
    pub fn list(&self, limit: usize) -> Vec<JobSummary> {
        let mut entries: Vec<(u64, JobSummary)> = self
            .jobs
            .iter()
            .map(|entry| {
                let summary = JobSummary {
                    job_id: entry.job_id,
                    status: entry.status,
                    submitted_at: entry.submitted_at,
                };
                (entry.seq, summary)
            })
            .collect();
        entries.sort_by(|a, b| b.0.cmp(&a.0));
        entries
            .into_iter()
            .take(limit)
            .map(|(_, summary)| summary)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Jobs currently pending or running.
    pub fn active(&self) -> usize {
        self.jobs
            .iter()
            .filter(|entry| !entry.status.is_finished())
            .count()
    }

    fn mark_running(&self, job_id: Uuid) {
        if let Some(mut job) = self.jobs.get_mut(&job_id) {
            job.status = JobStatus::Running;
            job.started_at = Some(Utc::now());
        }
    }

    fn finish(&self, job_id: Uuid, outcome: Result<Allocation, String>) {
        if let Some(mut job) = self.jobs.get_mut(&job_id) {
            job.finished_at = Some(Utc::now());
            match outcome {
                Ok(allocation) => {
                    metrics::counter!("topicmatch_jobs_succeeded_total").increment(1);
                    tracing::info!(
                        %job_id,
                        students = allocation.len(),
                        suggestions = allocation.total_suggestions(),
                        "allocation job succeeded"
                    );
                    job.status = JobStatus::Succeeded;
                    job.result = Some(allocation);
                }
                Err(message) => {
                    metrics::counter!("topicmatch_jobs_failed_total").increment(1);
                    tracing::warn!(%job_id, error = %message, "allocation job failed");
                    job.status = JobStatus::Failed;
                    job.error = Some(message);
                }
            }
        }
        self.evict_finished();
    }

    /// Drop the oldest finished jobs until the store is within retention.
    /// Pending and running jobs are never evicted.
    fn evict_finished(&self) {
        let excess = self.jobs.len().saturating_sub(self.retention);
        if excess == 0 {
            return;
        }
        let mut finished: Vec<(DateTime<Utc>, u64, Uuid)> = self
            .jobs
            .iter()
            .filter_map(|entry| {
                entry
                    .finished_at
                    .map(|at| (at, entry.seq, entry.job_id))
            })
            .collect();
        finished.sort();
        for (_, _, job_id) in finished.into_iter().take(excess) {
            self.jobs.remove(&job_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use allocator::{allocate, AllocationConfig, Student, Supervisor};

    fn tiny_allocation() -> Allocation {
        let students = vec![Student::new("s1", "t", vec![1.0, 0.0])];
        let supervisors = vec![Supervisor::new("p1", "a", vec![1.0, 0.0], 1)];
        allocate(&students, &supervisors, &AllocationConfig::default()).unwrap()
    }

    async fn wait_until_finished(store: &JobStore, job_id: Uuid) -> JobRecord {
        for _ in 0..200 {
            if let Some(job) = store.get(&job_id) {
                if job.status.is_finished() {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {job_id} did not finish");
    }

    #[tokio::test]
    async fn successful_job_stores_result() {
        let store = JobStore::new(1, Duration::from_secs(5), 10);
        let job_id = store.submit(async { Ok(tiny_allocation()) });

        let job = wait_until_finished(&store, job_id).await;
        assert_eq!(job.status, JobStatus::Succeeded);
        assert!(job.started_at.is_some());
        assert_eq!(job.result.unwrap().len(), 1);
        assert!(job.error.is_none());
    }

    #[tokio::test]
    async fn failed_job_stores_message() {
        let store = JobStore::new(1, Duration::from_secs(5), 10);
        let job_id = store.submit(async { Err("supervisor p1 has negative capacity".into()) });

        let job = wait_until_finished(&store, job_id).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.unwrap().contains("negative capacity"));
    }

    #[tokio::test]
    async fn slow_job_times_out() {
        let store = JobStore::new(1, Duration::from_millis(20), 10);
        let job_id = store.submit(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(tiny_allocation())
        });

        let job = wait_until_finished(&store, job_id).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn semaphore_serializes_jobs() {
        let store = JobStore::new(1, Duration::from_secs(5), 10);
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let first = store.submit(async move {
            let _ = rx.await;
            Ok(tiny_allocation())
        });
        let second = store.submit(async { Ok(tiny_allocation()) });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.get(&second).unwrap().status, JobStatus::Pending);
        assert_eq!(store.active(), 2);

        tx.send(()).unwrap();
        wait_until_finished(&store, first).await;
        let job = wait_until_finished(&store, second).await;
        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(store.active(), 0);
    }

    #[tokio::test]
    async fn oldest_finished_jobs_are_evicted() {
        let store = JobStore::new(4, Duration::from_secs(5), 2);
        let mut ids = Vec::new();
        for _ in 0..4 {
            let id = store.submit(async { Ok(tiny_allocation()) });
            wait_until_finished(&store, id).await;
            ids.push(id);
        }

        assert_eq!(store.len(), 2);
        assert!(store.get(&ids[0]).is_none());
        assert!(store.get(&ids[1]).is_none());
        assert!(store.get(&ids[3]).is_some());
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = JobStore::new(2, Duration::from_secs(5), 10);
        let a = store.submit(async { Ok(tiny_allocation()) });
        tokio::time::sleep(Duration::from_millis(2)).await;
        let b = store.submit(async { Ok(tiny_allocation()) });

        let listed = store.list(10);
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].job_id, b);
        assert_eq!(listed[1].job_id, a);
        assert_eq!(store.list(1).len(), 1);
    }

    #[tokio::test]
    async fn list_order_survives_same_instant_submissions() {
        let store = JobStore::new(1, Duration::from_secs(5), 100);
        let ids: Vec<Uuid> = (0..50)
            .map(|_| store.submit(async { Ok(tiny_allocation()) }))
            .collect();

        let listed: Vec<Uuid> = store.list(100).into_iter().map(|s| s.job_id).collect();
        let newest_first: Vec<Uuid> = ids.into_iter().rev().collect();
        assert_eq!(listed, newest_first);
    }
}
