use std::collections::HashSet;
use std::time::Instant;

use crate::metrics::metrics_recorder;
use crate::similarity::{Cosine, Similarity};
use crate::types::{
    Allocation, AllocationConfig, AllocationError, Student, StudentSuggestions, Suggestion,
    Supervisor,
};


/// Capacity-bounded supervisor allocator.
///
/// Every call to [`Allocator::run`] starts from fresh per-supervisor
/// counters, so one allocator can be shared across independent jobs.
#[derive(Debug, Clone, Default)]
pub struct Allocator<S = Cosine> {
    similarity: S,
    config: AllocationConfig,
}

impl Allocator<Cosine> {
    /// Allocator scoring with cosine similarity.
    pub fn new(config: AllocationConfig) -> Self {
        Self::with_similarity(Cosine, config)
    }
}

impl<S: Similarity> Allocator<S> {
    /// Allocator with a caller-supplied scoring capability.
    pub fn with_similarity(similarity: S, config: AllocationConfig) -> Self {
        Self { similarity, config }
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    /// Suggest supervisors for every student.
    ///
    /// Students are served in input order and share the suggestion counters,
    /// so earlier students see less contended supervisors.
    pub fn run(
        &self,
        students: &[Student],
        supervisors: &[Supervisor],
    ) -> Result<Allocation, AllocationError> {
        self.config.validate()?;
        validate_inputs(students, supervisors)?;

        let start = Instant::now();
        let max = self.config.max_suggestions;
        let quotas: Vec<u64> = supervisors
            .iter()
            .map(|sup| self.config.quota(sup.available_slot))
            .collect();
        let mut counters = vec![0u64; supervisors.len()];
        let mut allocation = Allocation::with_capacity(students.len());

        for student in students {
            let scores = supervisors
                .iter()
                .map(|sup| self.similarity.score(&student.embedding, &sup.embedding))
                .collect::<Result<Vec<f32>, _>>()?;

            // `sort_by` is stable: equal scores keep supervisor input order.
            let mut ranked: Vec<usize> = (0..supervisors.len()).collect();
            ranked.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

            let mut picked: Vec<usize> = Vec::with_capacity(max);
            for idx in ranked {
                if picked.len() == max {
                    break;
                }
                if counters[idx] < quotas[idx] {
                    counters[idx] += 1;
                    picked.push(idx);
                }
            }

            let ranked_count = picked.len();
            if picked.len() < max {
                for idx in 0..supervisors.len() {
                    if picked.len() == max {
                        break;
                    }
                    if counters[idx] < quotas[idx] && !picked.contains(&idx) {
                        counters[idx] += 1;
                        picked.push(idx);
                    }
                }
            }

            tracing::debug!(
                student_id = %student.id,
                ranked = ranked_count,
                backfilled = picked.len() - ranked_count,
                "suggestions issued"
            );

            let supervisor_suggestions: Vec<Suggestion> = picked
                .into_iter()
                .map(|idx| {
                    let sup = &supervisors[idx];
                    Suggestion {
                        student_id: student.id.clone(),
                        supervisor_id: sup.id.clone(),
                        compatibility_score: scores.get(idx).copied().unwrap_or(0.0),
                        research_area: sup.research_area.clone(),
                        available_slot: sup.available_slot,
                    }
                })
                .collect();

            allocation.push(StudentSuggestions {
                student_id: student.id.clone(),
                student_topic: student.student_topic.clone(),
                number_of_suggestions: supervisor_suggestions.len(),
                supervisor_suggestions,
            });
        }

        let latency = start.elapsed();
        let suggestions = allocation.total_suggestions();
        tracing::info!(
            students = students.len(),
            supervisors = supervisors.len(),
            suggestions,
            latency_ms = latency.as_millis() as u64,
            "allocation finished"
        );

        if let Some(recorder) = metrics_recorder() {
            recorder.record_allocation(latency, students.len(), supervisors.len(), suggestions);
        }

        Ok(allocation)
    }
}

/// Run one allocation with cosine similarity.
pub fn allocate(
    students: &[Student],
    supervisors: &[Supervisor],
    config: &AllocationConfig,
) -> Result<Allocation, AllocationError> {
    Allocator::new(*config).run(students, supervisors)
}

/// Reject bad input before any scoring happens.
fn validate_inputs(students: &[Student], supervisors: &[Supervisor]) -> Result<(), AllocationError> {
    let mut seen = HashSet::with_capacity(supervisors.len());
    for sup in supervisors {
        if sup.available_slot < 0 {
            return Err(AllocationError::InvalidCapacity {
                supervisor_id: sup.id.clone(),
                capacity: sup.available_slot,
            });
        }
        if !seen.insert(sup.id.as_str()) {
            return Err(AllocationError::DuplicateSupervisor(sup.id.clone()));
        }
    }

    let mut seen = HashSet::with_capacity(students.len());
    for student in students {
        if !seen.insert(student.id.as_str()) {
            return Err(AllocationError::DuplicateStudent(student.id.clone()));
        }
    }

    let expected = match supervisors
        .first()
        .map(|s| s.embedding.len())
        .or_else(|| students.first().map(|s| s.embedding.len()))
    {
        Some(dim) => dim,
        None => return Ok(()),
    };

    let records = supervisors
        .iter()
        .map(|s| ("supervisor", s.id.as_str(), s.embedding.as_slice()))
        .chain(
            students
                .iter()
                .map(|s| ("student", s.id.as_str(), s.embedding.as_slice())),
        );
    for (kind, id, embedding) in records {
        if embedding.len() != expected {
            return Err(AllocationError::DimensionMismatch {
                context: format!("{kind} {id}"),
                expected,
                found: embedding.len(),
            });
        }
        if let Some(index) = embedding.iter().position(|v| !v.is_finite()) {
            return Err(AllocationError::NonFiniteEmbedding {
                context: format!("{kind} {id}"),
                index,
            });
        }
    }

    Ok(())
}
