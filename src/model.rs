//! Row types shared by the generation and collection passes.
//!
//! Field names are serialised with the exact column headers the CSV tables
//! use, so the generated-URL table written by one pass is read back verbatim
//! by the other.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An organisation loaded from the per-division JSON sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub organisation_name: String,
    /// e.g. `"Division A"`; empty when the file name did not match.
    pub division: String,
    pub industry: String,
}

/// Apparent file type of a URL, judged from its path suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    #[serde(rename = "PDF")]
    Pdf,
    #[serde(rename = "Excel")]
    Excel,
    #[serde(rename = "HTML")]
    Html,
    #[serde(rename = "Other")]
    Other,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "PDF",
            FileType::Excel => "Excel",
            FileType::Html => "HTML",
            FileType::Other => "Other",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a link appears to live on the organisation's own domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkFlag {
    Trusted,
    #[serde(rename = "Third-party")]
    ThirdParty,
}

impl fmt::Display for LinkFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkFlag::Trusted => f.write_str("Trusted"),
            LinkFlag::ThirdParty => f.write_str("Third-party"),
        }
    }
}

/// One row of the generated-URL table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRow {
    #[serde(rename = "Organization")]
    pub organization: String,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "File Type")]
    pub file_type: FileType,
    #[serde(rename = "Flag")]
    pub flag: LinkFlag,
}

/// One row of a per-organisation content archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    #[serde(rename = "URL")]
    pub url: String,
    /// RFC 3339 timestamp.
    #[serde(rename = "Date Collected")]
    pub date_collected: String,
    #[serde(rename = "File Type")]
    pub file_type: FileType,
    /// 0 for anything that is not a PDF.
    #[serde(rename = "Page Count")]
    pub page_count: usize,
    #[serde(rename = "Raw Content")]
    pub raw_content: String,
}

/// One row of the PDF failure log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    #[serde(rename = "Organization")]
    pub organization: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Error")]
    pub error: String,
}
