use serde::{Deserialize, Serialize};

use crate::error::{ClaimError, Result};

/// Maximum accepted upload size (10 MB)
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// An uploaded claim document: name, size and raw byte content
#[derive(Debug, Clone)]
pub struct ClaimFile {
    pub name: String,
    pub size: u64,
    pub bytes: Vec<u8>,
}

impl ClaimFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            bytes,
        }
    }
}

/// Operator-entered claim fields plus the uploaded document, prior to
/// extraction and classification
#[derive(Debug, Clone)]
pub struct ClaimDraft {
    pub patient_name: String,
    pub patient_age: String,
    pub claim_amount: String,
    pub claim_description: String,
    pub file: ClaimFile,
}

impl ClaimDraft {
    /// Validate operator input before any pipeline work begins.
    ///
    /// Each failure names the offending field so the caller can surface a
    /// specific message.
    pub fn validate(&self) -> Result<()> {
        if self.patient_name.trim().is_empty() {
            return Err(ClaimError::Validation {
                field: "patientName",
                message: "patient name is required".to_string(),
            });
        }

        let age = self.patient_age.trim();
        if age.is_empty() || age.parse::<f64>().is_err() {
            return Err(ClaimError::Validation {
                field: "patientAge",
                message: "patient age must be a number".to_string(),
            });
        }

        let amount = self.claim_amount.trim().replace(['$', ','], "");
        if amount.is_empty() || amount.parse::<f64>().is_err() {
            return Err(ClaimError::Validation {
                field: "claimAmount",
                message: "claim amount must be a valid monetary value".to_string(),
            });
        }

        if !self.file.name.to_lowercase().ends_with(".pdf") {
            return Err(ClaimError::Validation {
                field: "file",
                message: "only PDF documents are accepted".to_string(),
            });
        }

        if self.file.bytes.is_empty() {
            return Err(ClaimError::Validation {
                field: "file",
                message: "uploaded file is empty".to_string(),
            });
        }

        if self.file.size > MAX_FILE_SIZE {
            return Err(ClaimError::Validation {
                field: "file",
                message: format!(
                    "file size exceeds {} MB limit",
                    MAX_FILE_SIZE / 1024 / 1024
                ),
            });
        }

        Ok(())
    }
}

/// Fraud determination for a single claim
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub is_fraud: bool,
    pub confidence_score: u8,
    pub reasons: Vec<String>,
    pub suggested_actions: Vec<String>,
}

impl Classification {
    /// Build a classification, clamping the confidence score to [0, 100].
    pub fn new(
        is_fraud: bool,
        confidence_score: i64,
        reasons: Vec<String>,
        suggested_actions: Vec<String>,
    ) -> Self {
        Self {
            is_fraud,
            confidence_score: confidence_score.clamp(0, 100) as u8,
            reasons,
            suggested_actions,
        }
    }
}

/// The persisted unit: operator fields, extracted text and classification
/// outcome for one submission. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRecord {
    pub id: String,
    pub patient_name: String,
    pub patient_age: String,
    pub claim_amount: String,
    pub claim_description: String,
    pub file_name: String,
    pub file_size: u64,
    pub extracted_text: String,
    pub is_fraud: bool,
    pub confidence_score: u8,
    pub reasons: Vec<String>,
    pub suggested_actions: Vec<String>,
    pub date: String,
    pub submitted_at: String,
}

/// Dashboard row: a claim record reduced to its display fields, with a
/// human-readable date synthesized from the stored timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSummary {
    pub id: String,
    pub patient_name: String,
    pub date: String,
    pub amount: String,
    pub is_fraud: bool,
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, age: &str, amount: &str, file: ClaimFile) -> ClaimDraft {
        ClaimDraft {
            patient_name: name.to_string(),
            patient_age: age.to_string(),
            claim_amount: amount.to_string(),
            claim_description: String::new(),
            file,
        }
    }

    fn pdf_file(bytes: Vec<u8>) -> ClaimFile {
        ClaimFile::new("claim.pdf", bytes)
    }

    #[test]
    fn valid_draft_passes() {
        let d = draft("Jane Doe", "40", "$500.00", pdf_file(b"%PDF-1.4".to_vec()));
        assert!(d.validate().is_ok());
    }

    #[test]
    fn empty_file_rejected_before_extraction() {
        let d = draft("Jane Doe", "40", "$500.00", pdf_file(Vec::new()));
        let err = d.validate().unwrap_err();
        match err {
            ClaimError::Validation { field, message } => {
                assert_eq!(field, "file");
                assert!(message.contains("empty"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_name_names_the_field() {
        let d = draft("  ", "40", "$500.00", pdf_file(b"%PDF-".to_vec()));
        match d.validate().unwrap_err() {
            ClaimError::Validation { field, .. } => assert_eq!(field, "patientName"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_numeric_age_rejected() {
        let d = draft("Jane Doe", "forty", "$500.00", pdf_file(b"%PDF-".to_vec()));
        match d.validate().unwrap_err() {
            ClaimError::Validation { field, .. } => assert_eq!(field, "patientAge"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn currency_formatting_accepted_in_amount() {
        let d = draft("Jane Doe", "40", "$1,250.00", pdf_file(b"%PDF-".to_vec()));
        assert!(d.validate().is_ok());
    }

    #[test]
    fn non_pdf_extension_rejected() {
        let file = ClaimFile::new("claim.docx", b"content".to_vec());
        let d = draft("Jane Doe", "40", "$500.00", file);
        match d.validate().unwrap_err() {
            ClaimError::Validation { field, .. } => assert_eq!(field, "file"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn confidence_score_is_clamped() {
        let high = Classification::new(true, 150, vec![], vec![]);
        assert_eq!(high.confidence_score, 100);

        let low = Classification::new(false, -5, vec![], vec![]);
        assert_eq!(low.confidence_score, 0);
    }
}
