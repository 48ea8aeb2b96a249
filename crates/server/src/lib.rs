//! topicmatch Server - HTTP REST API for supervisor allocation
//!
//! Exposes the allocation pipeline over HTTP. Rosters come either from the
//! configured data files or from the request body; topics are embedded with
//! the configured provider and supervisors are suggested per student under
//! a capacity-bounded quota.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! ## Public Endpoints (No Authentication)
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics
//! - `GET|POST /process-data` - Synchronous allocation over the data files
//!
//! ## Protected Endpoints (API Key Required when keys are configured)
//!
//! - `POST /api/v1/allocations` - Queue an allocation job (202 + job id)
//! - `GET /api/v1/allocations` - Recent jobs, newest first
//! - `GET /api/v1/allocations/{job_id}` - Job status and result

pub mod config;
pub mod error;
pub mod jobs;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use jobs::{JobRecord, JobStatus, JobStore};
pub use server::{build_router, start_server};
pub use state::ServerState;
