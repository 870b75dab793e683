//! Synchronization engine
//!
//! - `pacing`: randomized delay between remote calls
//! - `client` and `queries`: the authenticated query channel
//! - `extractor`: submission source from rendered pages
//! - `orchestrator`: the run itself

pub mod client;
pub mod extractor;
pub mod orchestrator;
pub mod pacing;
pub mod queries;

pub use client::{QueryClient, QueryError};
pub use extractor::{extract_source, extract_submission_code, unescape_unicode, SourceExtraction};
pub use orchestrator::{partition_new, SyncReport, Synchronizer};
pub use pacing::{pace, Pacer};
pub use queries::AcceptedProblem;
