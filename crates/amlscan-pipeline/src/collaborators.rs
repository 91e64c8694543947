//! External collaborator interfaces.
//!
//! OCR and ML anomaly detection run outside the core (worker processes in
//! the hosting application); the pipeline only depends on these traits.

use amlscan_core::{Alert, AmlResult, NormalizedTransaction};

/// Minimum extracted characters per page before OCR is attempted.
pub const OCR_MIN_CHARS_PER_PAGE: usize = 50;

/// OCR collaborator: renders the document and reads its text.
pub trait OcrEngine: Send + Sync {
    /// Returns the recognized text and a confidence in 0.0–1.0.
    fn ocr(&self, pdf_bytes: &[u8]) -> AmlResult<(String, f64)>;
}

/// Whether the text layer is too thin and OCR should run.
pub fn needs_ocr(extracted_chars: usize, page_count: usize) -> bool {
    extracted_chars / page_count.max(1) < OCR_MIN_CHARS_PER_PAGE
}

/// Optional ML-based anomaly detector; same output contract as the
/// rule-based detector so alerts merge transparently.
pub trait AnomalyModel: Send + Sync {
    fn detect(&self, transactions: &[NormalizedTransaction]) -> AmlResult<Vec<Alert>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_ocr_threshold() {
        assert!(needs_ocr(0, 1));
        assert!(needs_ocr(49, 1));
        assert!(!needs_ocr(50, 1));
        assert!(needs_ocr(99, 2));
        assert!(!needs_ocr(100, 2));
        // Zero pages must not divide by zero.
        assert!(needs_ocr(0, 0));
    }
}
