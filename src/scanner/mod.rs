//! Local signature-scanner integration: the subprocess adapter that keeps an
//! interactive console scanner running unattended, and the parser that turns
//! its diagnostic text into a structured verdict.

pub mod adapter;
pub mod parser;

pub use adapter::{LocalScanner, ScanOutput, SegavScanner, NEGATIVE_ANSWER};
pub use parser::{
    derive_status, parse, Detection, LocalScanVerdict, ScanCounts, ScanStatus, LOCAL_ENGINE_NAME,
};
