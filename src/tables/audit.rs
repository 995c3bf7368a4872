//! Append-only log of validated filter submissions.

use crate::error::HarvestError;
use crate::model::Organization;
use crate::selection::{FilterSelection, LabelledCode};
use csv::QuoteStyle;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRow {
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Industry")]
    pub industry: String,
    /// Goal codes.
    #[serde(rename = "SDG Goal")]
    pub sdg_goal: String,
    #[serde(rename = "Year")]
    pub year: i32,
    /// Document-type labels.
    #[serde(rename = "Document Type")]
    pub document_type: String,
    #[serde(rename = "Frequency")]
    pub frequency: String,
    #[serde(rename = "Matched Organizations")]
    pub matched_organizations: String,
}

impl AuditRow {
    pub fn new(selection: &FilterSelection, matched: &[Organization]) -> Self {
        let codes = |items: &[LabelledCode]| {
            items.iter().map(|c| c.code.as_str()).collect::<Vec<_>>().join(", ")
        };
        Self {
            country: selection.countries_joined(),
            industry: selection.industries().join(", "),
            sdg_goal: codes(selection.sdg_goals()),
            year: selection.start_year(),
            document_type: selection
                .document_types()
                .iter()
                .map(|d| d.label.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            frequency: selection.frequency().code.clone(),
            matched_organizations: matched
                .iter()
                .map(|o| o.organisation_name.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

/// Append one submission to the audit log at `path`.
pub fn append_audit(path: &Path, row: &AuditRow) -> Result<(), HarvestError> {
    super::append_row(path, row, QuoteStyle::Necessary)
}
