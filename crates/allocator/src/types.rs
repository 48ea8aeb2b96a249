use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// A student record with its topic embedding attached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    /// Opaque identifier; must be unique within one allocation run.
    pub id: String,
    /// Topic text, echoed into the output only.
    pub student_topic: String,
    /// Embedding of `student_topic`.
    pub embedding: Vec<f32>,
}

impl Student {
    pub fn new(id: impl Into<String>, student_topic: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            student_topic: student_topic.into(),
            embedding,
        }
    }
}

/// A supervisor record with its research-area embedding and raw slot count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Supervisor {
    /// Opaque identifier; must be unique within one allocation run.
    pub id: String,
    /// Research-area text, echoed into every suggestion.
    pub research_area: String,
    /// Embedding of `research_area`.
    pub embedding: Vec<f32>,
    /// Raw available slots. Signed so that bad input can be rejected instead
    /// of silently wrapping.
    pub available_slot: i64,
}

impl Supervisor {
    pub fn new(
        id: impl Into<String>,
        research_area: impl Into<String>,
        embedding: Vec<f32>,
        available_slot: i64,
    ) -> Self {
        Self {
            id: id.into(),
            research_area: research_area.into(),
            embedding,
            available_slot,
        }
    }
}

/// Tuning knobs for a single allocation run.
///
/// Embedded in server config and carried on job requests. Field names are
/// camelCase on the wire; snake_case is accepted for config files and env.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AllocationConfig {
    /// Factor applied to a supervisor's `available_slot` to get its
    /// suggestion quota for the run.
    #[serde(
        default = "AllocationConfig::default_capacity_multiplier",
        alias = "capacity_multiplier"
    )]
    pub capacity_multiplier: u32,
    /// Upper bound on suggestions per student.
    #[serde(
        default = "AllocationConfig::default_max_suggestions",
        alias = "max_suggestions"
    )]
    pub max_suggestions: usize,
}

impl AllocationConfig {
    pub(crate) fn default_capacity_multiplier() -> u32 {
        10
    }

    pub(crate) fn default_max_suggestions() -> usize {
        5
    }

    /// Validate the configuration before a run.
    pub fn validate(&self) -> Result<(), AllocationError> {
        if self.capacity_multiplier == 0 {
            return Err(AllocationError::InvalidConfig(
                "capacity_multiplier must be greater than zero".into(),
            ));
        }
        if self.max_suggestions == 0 {
            return Err(AllocationError::InvalidConfig(
                "max_suggestions must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Suggestion quota for a supervisor with the given (validated) slot count.
    pub fn quota(&self, available_slot: i64) -> u64 {
        u64::try_from(available_slot)
            .unwrap_or(0)
            .saturating_mul(u64::from(self.capacity_multiplier))
    }
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            capacity_multiplier: Self::default_capacity_multiplier(),
            max_suggestions: Self::default_max_suggestions(),
        }
    }
}

/// One suggested supervisor for one student.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    /// The student this suggestion belongs to. Implied by the enclosing map
    /// key in serialized output.
    #[serde(skip)]
    pub student_id: String,
    pub supervisor_id: String,
    pub compatibility_score: f32,
    pub research_area: String,
    pub available_slot: i64,
}

/// All suggestions issued to one student.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentSuggestions {
    #[serde(skip)]
    pub student_id: String,
    pub student_topic: String,
    pub number_of_suggestions: usize,
    pub supervisor_suggestions: Vec<Suggestion>,
}

/// Result of an allocation run: one entry per input student, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Allocation {
    entries: Vec<StudentSuggestions>,
}

impl Allocation {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, entry: StudentSuggestions) {
        self.entries.push(entry);
    }

    /// Look up the entry for a student id.
    pub fn get(&self, student_id: &str) -> Option<&StudentSuggestions> {
        self.entries.iter().find(|e| e.student_id == student_id)
    }

    pub fn entries(&self) -> &[StudentSuggestions] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of suggestions issued across all students.
    pub fn total_suggestions(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.supervisor_suggestions.len())
            .sum()
    }

    pub fn into_entries(self) -> Vec<StudentSuggestions> {
        self.entries
    }
}

impl Serialize for Allocation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|e| (&e.student_id, e)))
    }
}

/// Errors produced by the allocation layer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AllocationError {
    /// Two embedding vectors in the same run have different lengths.
    #[error("embedding dimension mismatch for {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        found: usize,
    },
    /// An embedding carries a NaN or infinite component.
    #[error("non-finite embedding component for {context} at index {index}")]
    NonFiniteEmbedding { context: String, index: usize },
    /// A supervisor declared a negative number of available slots.
    #[error("invalid capacity {capacity} for supervisor {supervisor_id}")]
    InvalidCapacity { supervisor_id: String, capacity: i64 },
    /// The same supervisor id appears more than once in the input.
    #[error("duplicate supervisor id: {0}")]
    DuplicateSupervisor(String),
    /// The same student id appears more than once in the input.
    #[error("duplicate student id: {0}")]
    DuplicateStudent(String),
    /// Invalid per-run configuration.
    #[error("invalid allocation config: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = AllocationConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.capacity_multiplier, 10);
        assert_eq!(cfg.max_suggestions, 5);
    }

    #[test]
    fn zero_multiplier_rejected() {
        let cfg = AllocationConfig {
            capacity_multiplier: 0,
            ..Default::default()
        };
        match cfg.validate().expect_err("config should be invalid") {
            AllocationError::InvalidConfig(msg) => assert!(msg.contains("capacity_multiplier")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_max_suggestions_rejected() {
        let cfg = AllocationConfig {
            max_suggestions: 0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(AllocationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn quota_scales_slots() {
        let cfg = AllocationConfig {
            capacity_multiplier: 2,
            ..Default::default()
        };
        assert_eq!(cfg.quota(3), 6);
        assert_eq!(cfg.quota(0), 0);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let cfg: AllocationConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, AllocationConfig::default());

        let cfg: AllocationConfig = serde_json::from_str(r#"{"capacityMultiplier": 2}"#).unwrap();
        assert_eq!(cfg.capacity_multiplier, 2);
        assert_eq!(cfg.max_suggestions, 5);
    }

    #[test]
    fn allocation_serializes_as_map_in_input_order() {
        let mut allocation = Allocation::default();
        for id in ["zeta", "alpha"] {
            allocation.push(StudentSuggestions {
                student_id: id.into(),
                student_topic: format!("topic {id}"),
                number_of_suggestions: 1,
                supervisor_suggestions: vec![Suggestion {
                    student_id: id.into(),
                    supervisor_id: "p1".into(),
                    compatibility_score: 0.5,
                    research_area: "Compilers".into(),
                    available_slot: 2,
                }],
            });
        }

        let json = serde_json::to_string(&allocation).unwrap();
        assert!(json.find("\"zeta\"").unwrap() < json.find("\"alpha\"").unwrap());

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let entry = &value["zeta"];
        assert_eq!(entry["studentTopic"], "topic zeta");
        assert_eq!(entry["numberOfSuggestions"], 1);
        let suggestion = &entry["supervisorSuggestions"][0];
        assert_eq!(suggestion["supervisorId"], "p1");
        assert_eq!(suggestion["researchArea"], "Compilers");
        assert_eq!(suggestion["availableSlot"], 2);
        assert!(suggestion.get("studentId").is_none());
    }

    #[test]
    fn error_messages_carry_context() {
        let err = AllocationError::InvalidCapacity {
            supervisor_id: "p9".into(),
            capacity: -1,
        };
        assert!(err.to_string().contains("p9"));
        assert!(err.to_string().contains("-1"));

        let err = AllocationError::DimensionMismatch {
            context: "student s1".into(),
            expected: 3,
            found: 2,
        };
        assert!(err.to_string().contains("student s1"));
    }
}
