//! # topicmatch Allocator (`allocator`)
//!
//! ## Purpose
//!
//! `allocator` is the core of topicmatch. Given students and supervisors that
//! already carry embedding vectors, it suggests up to five supervisors per
//! student, ranked by cosine similarity, while keeping every supervisor
//! within a bounded suggestion quota for the run.
//!
//! The crate does no I/O. Embedding text and loading rosters happen upstream
//! (`embedding` and `roster` crates); this layer only ranks and books.
//!
//! ## Core Types
//!
//! - [`Student`] / [`Supervisor`]: typed input records with embeddings.
//! - [`AllocationConfig`]: `capacity_multiplier` and `max_suggestions`.
//! - [`Allocator`]: runs the ranked pass plus the input-order backfill.
//! - [`Allocation`]: per-student [`StudentSuggestions`], serialized as a JSON
//!   object keyed by student id in input order.
//! - [`Similarity`]: the scoring capability; [`Cosine`] by default.
//!
//! ## Example Usage
//!
//! ```
//! use allocator::{allocate, AllocationConfig, Student, Supervisor};
//!
//! let students = vec![Student::new("s1", "Graph neural networks", vec![1.0, 0.0])];
//! let supervisors = vec![
//!     Supervisor::new("p1", "Machine learning", vec![1.0, 0.0], 1),
//!     Supervisor::new("p2", "Databases", vec![0.0, 1.0], 1),
//! ];
//!
//! let cfg = AllocationConfig { capacity_multiplier: 2, ..Default::default() };
//! let allocation = allocate(&students, &supervisors, &cfg).expect("allocate");
//!
//! let entry = allocation.get("s1").expect("entry for s1");
//! assert_eq!(entry.supervisor_suggestions[0].supervisor_id, "p1");
//! assert_eq!(entry.supervisor_suggestions.len(), 2);
//! ```
//!
//! ## Observability
//!
//! Install an [`AllocationMetrics`] implementation via
//! [`set_allocation_metrics`] to record per-run latency and suggestion counts.

pub mod engine;
pub mod metrics;
pub mod similarity;
pub mod types;

pub use crate::engine::{allocate, Allocator};
pub use crate::metrics::{set_allocation_metrics, AllocationMetrics};
pub use crate::similarity::{cosine_similarity, Cosine, Similarity};
pub use crate::types::{
    Allocation, AllocationConfig, AllocationError, Student, StudentSuggestions, Suggestion,
    Supervisor,
};
