use crate::error::{ServerError, ServerResult};
use crate::jobs::{JobRecord, JobStatus, JobSummary};
use crate::state::ServerState;
use allocator::AllocationConfig;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use roster::{
    clean_students, clean_supervisors, read_students, read_supervisors, StudentRecord,
    SupervisorRecord,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use topicmatch::{suggest_supervisors, PipelineError};
use uuid::Uuid;

/// Body of `POST /api/v1/allocations`. Every field is optional; an empty
/// body allocates the configured data files with the server defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AllocationRequest {
    #[serde(default)]
    pub students: Option<Vec<StudentRecord>>,
    #[serde(default)]
    pub supervisors: Option<Vec<SupervisorRecord>>,
    #[serde(default)]
    pub capacity_multiplier: Option<u32>,
    #[serde(default)]
    pub max_suggestions: Option<usize>,
}

impl AllocationRequest {
    /// Server defaults overridden by whatever the request carries.
    pub fn allocation_config(&self, defaults: AllocationConfig) -> AllocationConfig {
        AllocationConfig {
            capacity_multiplier: self
                .capacity_multiplier
                .unwrap_or(defaults.capacity_multiplier),
            max_suggestions: self.max_suggestions.unwrap_or(defaults.max_suggestions),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_list_limit")]
    pub limit: usize,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub jobs: Vec<JobSummary>,
}

fn default_list_limit() -> usize {
    50
}

/// Queue an allocation job.
///
/// The body is validated up front (JSON shape and allocation config) so bad
/// requests fail with 400 instead of producing a failed job. Roster files,
/// embedding, and allocation run inside the job; their errors end up on the
/// job record.
pub async fn submit_allocation(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> ServerResult<(StatusCode, Json<SubmitResponse>)> {
    let request: AllocationRequest = if body.iter().all(u8::is_ascii_whitespace) {
        AllocationRequest::default()
    } else {
        serde_json::from_slice(&body)?
    };

    let cfg = request.allocation_config(state.config.allocation);
    cfg.validate()
        .map_err(|e| ServerError::BadRequest(e.to_string()))?;

    let provider = state.provider.clone();
    let server_cfg = state.config.clone();
    let work = async move {
        let students = match request.students {
            Some(records) => clean_students(records),
            None => read_students(&server_cfg.students_path)?,
        };
        let supervisors = match request.supervisors {
            Some(records) => clean_supervisors(records),
            None => read_supervisors(&server_cfg.supervisors_path)?,
        };
        let allocation = suggest_supervisors(provider.as_ref(), students, supervisors, cfg).await?;
        Ok::<_, PipelineError>(allocation)
    };
    let job_id = state
        .jobs
        .submit(async move { work.await.map_err(|e| e.to_string()) });

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            job_id,
            status: JobStatus::Pending,
        }),
    ))
}

/// Fetch one job by id.
pub async fn get_allocation(
    State(state): State<Arc<ServerState>>,
    Path(job_id): Path<String>,
) -> ServerResult<Json<JobRecord>> {
    let job_id = Uuid::parse_str(&job_id)
        .map_err(|_| ServerError::BadRequest(format!("invalid job id: {job_id}")))?;
    state.jobs.get(&job_id).map(Json).ok_or(ServerError::NotFound)
}

/// List recent jobs, newest first.
pub async fn list_allocations(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<ListQuery>,
) -> ServerResult<Json<ListResponse>> {
    Ok(Json(ListResponse {
        jobs: state.jobs.list(query.limit),
    }))
}
