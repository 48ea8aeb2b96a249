use crate::error::ServerResult;
use crate::state::ServerState;
use allocator::Allocation;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use topicmatch::suggest_from_files;

/// Response body for `/process-data`.
#[derive(Debug, Serialize)]
pub struct ProcessDataResponse {
    pub suggestion: Allocation,
}

/// Allocate over the configured data files and answer in one round trip.
///
/// Loads `students_path` and `supervisors_path`, embeds both rosters, and
/// runs the allocation with the server's `allocation` config. Accepts GET and
/// POST; the request body is ignored.
///
/// # Response
/// ```json
/// {
///   "suggestion": {
///     "101": {
///       "studentTopic": "Reinforcement learning, robotics",
///       "numberOfSuggestions": 2,
///       "supervisorSuggestions": [
///         { "supervisorId": "7", "compatibilityScore": 0.91,
///           "researchArea": "Robotics", "availableSlot": 2 }
///       ]
///     }
///   }
/// }
/// ```
pub async fn process_data(
    State(state): State<Arc<ServerState>>,
) -> ServerResult<Json<ProcessDataResponse>> {
    let config = &state.config;
    let allocation = suggest_from_files(
        state.provider.as_ref(),
        &config.students_path,
        &config.supervisors_path,
        config.allocation,
    )
    .await?;

    Ok(Json(ProcessDataResponse {
        suggestion: allocation,
    }))
}
