//! vigil — file-reputation orchestration core.
//!
//! Clients submit a file; the pipeline fingerprints it, stores the bytes
//! content-addressed, runs a local signature scanner (an interactive console
//! executable kept unattended by auto-answering its prompts) and a
//! third-party reputation API, normalizes both outputs into a common verdict
//! shape, deduplicates by fingerprint, and appends the result to a scan
//! history.

/// Injected configuration for every component
pub mod config;
/// Error taxonomy and Result alias
pub mod error;
/// Content-type classification for submitted files
pub mod filetype;
/// Content digests and the file fingerprint
pub mod fingerprint;
/// Analysis records and the dedup/history store
pub mod history;
/// Tracing initialization
pub mod logging;
/// Submission pipeline coordination
pub mod orchestrator;
/// Reputation API client and report parser
pub mod reputation;
/// Local scanner subprocess adapter and diagnostic-text parser
pub mod scanner;
/// Content-addressed file storage
pub mod store;
/// Timeout wrappers for the external legs
pub mod timeout;

pub use config::VigilConfig;
pub use error::{Result, VigilError};
pub use fingerprint::FileFingerprint;
pub use history::{AnalysisRecord, HistoryStore, MemoryHistoryStore};
pub use orchestrator::{Orchestrator, Submission};
