//! Reputation-API integration: the HTTP client that looks files up by
//! fingerprint and the parser that normalizes the provider's report.

pub mod client;
pub mod parser;

pub use client::{HttpReputationClient, LookupOutcome, ReputationClient};
pub use parser::{
    parse, ReputationSeverity, ReputationStats, ReputationVerdict, PERMALINK_TEMPLATE,
};
