//! Document validity gate.

use invext_analysis::DocumentClassification;
use tracing::debug;

use crate::error::ValidityError;

/// Default minimum document classification confidence.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.9;

/// Accepts a document when at least one document-type detection reaches
/// the threshold. A document with no detections is accepted; a detection
/// without a readable confidence never reaches the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidityGate {
    threshold: f64,
}

impl ValidityGate {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn check(&self, classifications: &[DocumentClassification]) -> Result<(), ValidityError> {
        if classifications.is_empty() {
            debug!("No document classifications, accepting");
            return Ok(());
        }

        if classifications
            .iter()
            .any(|c| c.confidence.is_some_and(|conf| conf >= self.threshold))
        {
            return Ok(());
        }

        Err(ValidityError::LowConfidence {
            best: best_confidence(classifications).unwrap_or(0.0),
            threshold: self.threshold,
        })
    }
}

impl Default for ValidityGate {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CONFIDENCE)
    }
}

/// Confidence reported for the document: the best detection, or 1.0 when
/// the service returned none.
///
/// This is the highest confidence over all detections, not the first
/// detection's, so the order the service lists them in does not matter.
/// Detections without a readable confidence count as 0.0.
pub fn document_confidence(classifications: &[DocumentClassification]) -> f64 {
    if classifications.is_empty() {
        return 1.0;
    }
    best_confidence(classifications).unwrap_or(0.0)
}

fn best_confidence(classifications: &[DocumentClassification]) -> Option<f64> {
    classifications
        .iter()
        .filter_map(|c| c.confidence)
        .fold(None, |best, c| Some(best.map_or(c, |b: f64| b.max(c))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn detections(confidences: &[(&str, f64)]) -> Vec<DocumentClassification> {
        confidences
            .iter()
            .map(|(kind, conf)| DocumentClassification::new(*kind, *conf))
            .collect()
    }

    #[test]
    fn test_empty_list_passes() {
        assert_eq!(ValidityGate::default().check(&[]), Ok(()));
        assert_eq!(document_confidence(&[]), 1.0);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let gate = ValidityGate::default();
        assert_eq!(gate.check(&detections(&[("INVOICE", 0.90)])), Ok(()));
        assert_eq!(
            gate.check(&detections(&[("INVOICE", 0.89)])),
            Err(ValidityError::LowConfidence {
                best: 0.89,
                threshold: 0.9,
            })
        );
    }

    #[test]
    fn test_any_detection_may_pass() {
        let gate = ValidityGate::default();
        let mixed = detections(&[("OTHER", 0.3), ("INVOICE", 0.95)]);

        assert_eq!(gate.check(&mixed), Ok(()));
        assert_eq!(document_confidence(&mixed), 0.95);
    }

    #[test]
    fn test_unrelated_type_is_rejected() {
        let err = ValidityGate::default()
            .check(&detections(&[("OTHER", 0.3), ("RECEIPT", 0.5)]))
            .unwrap_err();

        assert_eq!(
            err,
            ValidityError::LowConfidence {
                best: 0.5,
                threshold: 0.9,
            }
        );
        assert_eq!(
            err.to_string(),
            "document classification confidence 0.50 is below 0.90"
        );
    }

    #[test]
    fn test_unreadable_confidence_is_rejected() {
        let tree: invext_analysis::RawFieldTree = serde_json::from_value(serde_json::json!({
            "documentClassification": [
                {"documentType": "OTHER", "confidence": "0.3"},
                {"documentType": "OTHER"}
            ]
        }))
        .unwrap();
        let classifications = &tree.document_classification;

        assert_eq!(classifications.len(), 2);
        assert_eq!(
            ValidityGate::default().check(classifications),
            Err(ValidityError::LowConfidence {
                best: 0.0,
                threshold: 0.9,
            })
        );
        assert_eq!(document_confidence(classifications), 0.0);
    }

    #[test]
    fn test_unreadable_entry_does_not_block_good_one() {
        let classifications = vec![
            DocumentClassification {
                document_type: "OTHER".to_string(),
                confidence: None,
            },
            DocumentClassification::new("INVOICE", 0.93),
        ];

        assert_eq!(ValidityGate::default().check(&classifications), Ok(()));
        assert_eq!(document_confidence(&classifications), 0.93);
    }

    #[test]
    fn test_custom_threshold() {
        let gate = ValidityGate::new(0.5);
        assert_eq!(gate.threshold(), 0.5);
        assert!(gate.check(&detections(&[("INVOICE", 0.5)])).is_ok());
    }
}
