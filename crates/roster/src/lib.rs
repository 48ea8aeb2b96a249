//! Roster loading for topicmatch.
//!
//! Reads the student and supervisor data files (JSON arrays), flattens
//! multi-line topic text, and drops repeated ids. The output is ready to be
//! embedded and handed to the allocator.
//!
//! ```
//! let students = roster::parse_students(
//!     r#"[{"id": 1, "studentTopic": "graph learning\nGNNs"}]"#,
//! ).unwrap();
//! assert_eq!(students[0].id, "1");
//! assert_eq!(students[0].student_topic, "graph learning, GNNs");
//! ```

mod error;
mod types;

pub use crate::error::RosterError;
pub use crate::types::{StudentRecord, SupervisorRecord};

use std::collections::HashSet;
use std::path::Path;

use serde::de::DeserializeOwned;

/// Read and clean the student data file.
pub fn read_students<P: AsRef<Path>>(path: P) -> Result<Vec<StudentRecord>, RosterError> {
    read_records(path.as_ref()).map(clean_students)
}

/// Read and clean the supervisor data file.
pub fn read_supervisors<P: AsRef<Path>>(path: P) -> Result<Vec<SupervisorRecord>, RosterError> {
    read_records(path.as_ref()).map(clean_supervisors)
}

pub fn parse_students(json: &str) -> Result<Vec<StudentRecord>, RosterError> {
    parse_records(json, "inline").map(clean_students)
}

pub fn parse_supervisors(json: &str) -> Result<Vec<SupervisorRecord>, RosterError> {
    parse_records(json, "inline").map(clean_supervisors)
}

/// Flatten topic text and drop repeated ids (first occurrence wins).
pub fn clean_students(records: Vec<StudentRecord>) -> Vec<StudentRecord> {
    let mut records = dedup_by_id(records, "student", |r| r.id.as_str());
    for r in &mut records {
        r.student_topic = flatten_text(&r.student_topic);
    }
    records
}

/// Flatten research-area text and drop repeated ids (first occurrence wins).
pub fn clean_supervisors(records: Vec<SupervisorRecord>) -> Vec<SupervisorRecord> {
    let mut records = dedup_by_id(records, "supervisor", |r| r.id.as_str());
    for r in &mut records {
        r.research_area = flatten_text(&r.research_area);
    }
    records
}

/// Newlines become `", "` so a bulleted list reads as one phrase.
pub fn flatten_text(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\n', ", ")
        .trim()
        .to_string()
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, RosterError> {
    let raw = std::fs::read_to_string(path).map_err(|source| RosterError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records: Vec<T> = parse_records(&raw, &path.display().to_string())?;
    tracing::debug!(path = %path.display(), records = records.len(), "loaded roster file");
    Ok(records)
}

fn parse_records<T: DeserializeOwned>(json: &str, origin: &str) -> Result<Vec<T>, RosterError> {
    serde_json::from_str(json).map_err(|source| RosterError::Parse {
        origin: origin.to_string(),
        source,
    })
}

fn dedup_by_id<T>(records: Vec<T>, kind: &str, id_of: impl Fn(&T) -> &str) -> Vec<T> {
    let mut seen = HashSet::with_capacity(records.len());
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        if seen.insert(id_of(&record).to_string()) {
            out.push(record);
        } else {
            tracing::warn!(kind, id = id_of(&record), "duplicate id in roster, keeping first");
        }
    }
    out
}
