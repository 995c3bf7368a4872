//! Filter selection: the validated set of criteria a generation run uses.
//!
//! Submission is all-or-nothing. A [`FilterInput`] with any required field
//! missing never turns into a [`FilterSelection`], and only a
//! `FilterSelection` can drive the query builder, so a partial submission
//! cannot produce search queries.

use crate::error::HarvestError;
use crate::model::Organization;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Official short titles of the 17 UN Sustainable Development Goals.
pub const SDG_GOALS: [(&str, &str); 17] = [
    ("1", "No Poverty"),
    ("2", "Zero Hunger"),
    ("3", "Good Health and Well-being"),
    ("4", "Quality Education"),
    ("5", "Gender Equality"),
    ("6", "Clean Water and Sanitation"),
    ("7", "Affordable and Clean Energy"),
    ("8", "Decent Work and Economic Growth"),
    ("9", "Industry, Innovation and Infrastructure"),
    ("10", "Reduced Inequalities"),
    ("11", "Sustainable Cities and Communities"),
    ("12", "Responsible Consumption and Production"),
    ("13", "Climate Action"),
    ("14", "Life Below Water"),
    ("15", "Life on Land"),
    ("16", "Peace, Justice and Strong Institutions"),
    ("17", "Partnerships for the Goals"),
];

/// Code → label maps for each selectable field.
///
/// Codes without a label display as themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionLabels {
    pub country: BTreeMap<String, String>,
    pub industry: BTreeMap<String, String>,
    pub sdg: BTreeMap<String, String>,
    pub document_type: BTreeMap<String, String>,
    pub frequency: BTreeMap<String, String>,
}

impl Default for OptionLabels {
    fn default() -> Self {
        Self {
            country: BTreeMap::new(),
            industry: BTreeMap::new(),
            sdg: SDG_GOALS
                .iter()
                .map(|(code, label)| (code.to_string(), label.to_string()))
                .collect(),
            document_type: BTreeMap::new(),
            frequency: BTreeMap::new(),
        }
    }
}

impl OptionLabels {
    /// Load labels from a JSON file, layered over the built-in defaults.
    ///
    /// ```json
    /// { "country": { "AU": "Australia" }, "sdg": { "13": "Climate Action" } }
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, HarvestError> {
        let raw = std::fs::read_to_string(path).map_err(|e| HarvestError::io(path, e))?;
        let overrides: OptionLabels =
            serde_json::from_str(&raw).map_err(|e| HarvestError::InvalidOptions {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        let mut labels = OptionLabels::default();
        labels.country.extend(overrides.country);
        labels.industry.extend(overrides.industry);
        labels.sdg.extend(overrides.sdg);
        labels.document_type.extend(overrides.document_type);
        labels.frequency.extend(overrides.frequency);
        Ok(labels)
    }
}

/// A selected code paired with its display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelledCode {
    pub code: String,
    pub label: String,
}

impl LabelledCode {
    fn resolve(code: &str, labels: &BTreeMap<String, String>) -> Self {
        Self {
            code: code.to_string(),
            label: labels.get(code).cloned().unwrap_or_else(|| code.to_string()),
        }
    }
}

/// Raw user input, as collected from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterInput {
    pub countries: Vec<String>,
    /// Industry division codes, e.g. `"Division A"`.
    pub industries: Vec<String>,
    pub sdgs: Vec<String>,
    pub year: Option<i32>,
    pub document_types: Vec<String>,
    pub frequency: Option<String>,
}

impl FilterInput {
    /// Names of required fields that are empty, in form order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if is_blank(&self.countries) {
            fields.push("Country");
        }
        if is_blank(&self.industries) {
            fields.push("Industry");
        }
        if is_blank(&self.sdgs) {
            fields.push("SDG Goal");
        }
        if self.year.is_none() {
            fields.push("Year");
        }
        if is_blank(&self.document_types) {
            fields.push("Document Type");
        }
        if self
            .frequency
            .as_deref()
            .map(|f| f.trim().is_empty())
            .unwrap_or(true)
        {
            fields.push("Frequency");
        }
        fields
    }

    /// Validate the input and resolve labels.
    pub fn validate(self, labels: &OptionLabels) -> Result<FilterSelection, HarvestError> {
        let fields = self.missing_fields();
        if !fields.is_empty() {
            return Err(HarvestError::MissingFilters { fields });
        }
        let (Some(start_year), Some(frequency)) = (self.year, self.frequency) else {
            return Err(HarvestError::Internal("validated input lost a field".into()));
        };

        Ok(FilterSelection {
            countries: dedup(&self.countries),
            industries: dedup(&self.industries),
            sdg_goals: dedup(&self.sdgs)
                .iter()
                .map(|c| LabelledCode::resolve(c, &labels.sdg))
                .collect(),
            start_year,
            document_types: dedup(&self.document_types)
                .iter()
                .map(|c| LabelledCode::resolve(c, &labels.document_type))
                .collect(),
            frequency: LabelledCode::resolve(frequency.trim(), &labels.frequency),
        })
    }
}

/// A complete, validated filter selection. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    countries: Vec<String>,
    industries: Vec<String>,
    sdg_goals: Vec<LabelledCode>,
    start_year: i32,
    document_types: Vec<LabelledCode>,
    frequency: LabelledCode,
}

impl FilterSelection {
    pub fn countries(&self) -> &[String] {
        &self.countries
    }

    pub fn industries(&self) -> &[String] {
        &self.industries
    }

    pub fn sdg_goals(&self) -> &[LabelledCode] {
        &self.sdg_goals
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn document_types(&self) -> &[LabelledCode] {
        &self.document_types
    }

    pub fn frequency(&self) -> &LabelledCode {
        &self.frequency
    }

    /// Countries joined the way they appear in a query string.
    pub fn countries_joined(&self) -> String {
        self.countries.join(", ")
    }

    /// An organisation matches iff its division is a selected industry code.
    pub fn matches(&self, org: &Organization) -> bool {
        self.industries.iter().any(|d| *d == org.division)
    }

    /// Organisations matching this selection, in source order.
    pub fn matched_organizations(&self, orgs: &[Organization]) -> Vec<Organization> {
        orgs.iter().filter(|o| self.matches(o)).cloned().collect()
    }
}

fn is_blank(values: &[String]) -> bool {
    values.iter().all(|v| v.trim().is_empty())
}

/// Trim, drop blanks and duplicates, keep first-seen order.
fn dedup(values: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && seen.insert(v.to_string()))
        .map(str::to_string)
        .collect()
}
