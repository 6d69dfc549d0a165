//! Flattened submission payload and the server's answer

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Allocation;
use crate::types::{LicensePlateNumberOperationMode, StockId};

/// Document handed to the remote mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub stock_site: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub effective_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub license_plate_number_operation_mode: Option<LicensePlateNumberOperationMode>,
    pub stock_change_lines: Vec<SubmissionLine>,
}

/// One line of the submission; `line_number` only needs to be unique
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionLine {
    pub line_number: u32,
    pub stock_id: StockId,
    pub product: String,
    pub stock_details: Vec<Allocation>,
}

/// Severity of a server diagnosis
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    /// Map the server's 1-4 scale; anything unknown is treated as blocking
    pub fn from_level(level: u8) -> Self {
        match level {
            1 => Severity::Info,
            2 => Severity::Warning,
            3 => Severity::Error,
            _ => Severity::Fatal,
        }
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self, Severity::Error | Severity::Fatal)
    }
}

/// A business diagnosis returned by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub severity: u8,
    pub message: String,
}

impl Diagnosis {
    pub fn severity(&self) -> Severity {
        Severity::from_level(self.severity)
    }
}

/// Raw answer of the submission mutation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub diagnoses: Vec<Diagnosis>,
}

/// What the screen shows after a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Document created; warnings are informational
    Created { id: String, warnings: Vec<Diagnosis> },
    /// Document blocked by at least one severity 3-4 diagnosis
    Rejected { diagnoses: Vec<Diagnosis> },
}

impl SubmissionOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, SubmissionOutcome::Created { .. })
    }
}

impl From<SubmissionResponse> for SubmissionOutcome {
    fn from(response: SubmissionResponse) -> Self {
        let blocking = response
            .diagnoses
            .iter()
            .any(|d| d.severity().is_blocking());

        match response.id {
            Some(id) if !blocking && !id.is_empty() => SubmissionOutcome::Created {
                id,
                warnings: response.diagnoses,
            },
            _ => SubmissionOutcome::Rejected {
                diagnoses: response.diagnoses,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagnosis(severity: u8, message: &str) -> Diagnosis {
        Diagnosis {
            severity,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_created_with_warning() {
        let outcome = SubmissionOutcome::from(SubmissionResponse {
            id: Some("SCH0001".to_string()),
            diagnoses: vec![diagnosis(2, "Stock below minimum")],
        });
        assert_eq!(
            outcome,
            SubmissionOutcome::Created {
                id: "SCH0001".to_string(),
                warnings: vec![diagnosis(2, "Stock below minimum")],
            }
        );
    }

    #[test]
    fn test_blocking_diagnosis_rejects() {
        let outcome = SubmissionOutcome::from(SubmissionResponse {
            id: Some("SCH0001".to_string()),
            diagnoses: vec![diagnosis(1, "ok"), diagnosis(3, "Location is locked")],
        });
        assert!(!outcome.is_created());
    }

    #[test]
    fn test_missing_id_rejects() {
        let outcome = SubmissionOutcome::from(SubmissionResponse::default());
        assert_eq!(outcome, SubmissionOutcome::Rejected { diagnoses: vec![] });
    }

    #[test]
    fn test_severity_scale() {
        assert!(!Severity::from_level(1).is_blocking());
        assert!(!Severity::from_level(2).is_blocking());
        assert!(Severity::from_level(3).is_blocking());
        assert!(Severity::from_level(4).is_blocking());
        assert!(Severity::from_level(9).is_blocking());
    }
}
