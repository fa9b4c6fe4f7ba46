//! Content-type classification for submitted files.
//!
//! Magic-byte detection first, falling back to the filename extension, then
//! to whatever type the client declared. The label is an uppercase short
//! form ("PE", "PDF", "ZIP", ...) kept on the analysis record.

use tracing::debug;

/// Label used when nothing can be determined.
pub const UNKNOWN_TYPE: &str = "UNKNOWN";

/// Classify file content, preferring magic bytes over names.
pub fn classify(bytes: &[u8], file_name: &str, declared: Option<&str>) -> String {
    if let Some(kind) = infer::get(bytes) {
        let label = label_for_extension(kind.extension());
        debug!(mime = kind.mime_type(), label = %label, "magic-byte match");
        return label;
    }

    if let Some(ext) = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
    {
        let guess = mime_guess::from_ext(ext);
        if guess.first().is_some() {
            return label_for_extension(ext);
        }
    }

    match declared {
        Some(d) if !d.is_empty() => d.to_string(),
        _ => UNKNOWN_TYPE.to_string(),
    }
}

fn label_for_extension(ext: &str) -> String {
    match ext.to_ascii_lowercase().as_str() {
        "exe" | "dll" | "sys" => "PE".to_string(),
        "elf" | "so" => "ELF".to_string(),
        "txt" => "TEXTO".to_string(),
        other => other.to_ascii_uppercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_magic() {
        // Minimal PDF header
        let bytes = b"%PDF-1.4 rest of document";
        assert_eq!(classify(bytes, "whatever.bin", None), "PDF");
    }

    #[test]
    fn test_classify_zip_magic() {
        let bytes = b"PK\x03\x04rest";
        assert_eq!(classify(bytes, "archive", None), "ZIP");
    }

    #[test]
    fn test_classify_falls_back_to_extension() {
        let bytes = b"no recognizable magic here";
        assert_eq!(classify(bytes, "readme.txt", None), "TEXTO");
    }

    #[test]
    fn test_classify_falls_back_to_declared() {
        let bytes = b"\x00\x01\x02\x03";
        assert_eq!(
            classify(bytes, "blob", Some("application/octet-stream")),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(classify(b"\x00\x01", "blob", None), UNKNOWN_TYPE);
    }
}
