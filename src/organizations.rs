//! Organisation loader: a directory of per-division JSON files.
//!
//! Each file holds `{"data": [{"organisation_name": "..."}, ...]}`, sometimes
//! still wrapped in a Markdown ```` ```json ```` fence. The division and
//! industry come from the file name, e.g.
//! `ANZSIC_A_Agriculture,_Forestry_&_Fishing_2025.json`.

use crate::error::HarvestError;
use crate::model::Organization;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

static DIVISION_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"ANZSIC_([A-Z])_(.+?)_\d{4}").expect("valid regex"));

/// Result of scanning a source directory.
#[derive(Debug, Clone, Default)]
pub struct LoadedOrganizations {
    pub organizations: Vec<Organization>,
    /// Files that could not be read or parsed.
    pub skipped_files: Vec<PathBuf>,
}

#[derive(Deserialize)]
struct SourceFile {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

/// Load every organisation from the `*.json` files in `dir`.
///
/// Files are visited in file-name order. Malformed files are skipped with a
/// warning; only a missing directory is fatal.
pub fn load_organizations(dir: &Path) -> Result<LoadedOrganizations, HarvestError> {
    if !dir.is_dir() {
        return Err(HarvestError::SourceDirNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| HarvestError::io(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map(|x| x == "json").unwrap_or(false))
        .collect();
    files.sort();

    let mut loaded = LoadedOrganizations::default();
    for path in files {
        match load_file(&path) {
            Ok(orgs) => {
                debug!("{}: {} organisations", path.display(), orgs.len());
                loaded.organizations.extend(orgs);
            }
            Err(reason) => {
                warn!("Skipping {}: {}", path.display(), reason);
                loaded.skipped_files.push(path);
            }
        }
    }

    info!(
        "Loaded {} organisations from {} ({} files skipped)",
        loaded.organizations.len(),
        dir.display(),
        loaded.skipped_files.len()
    );
    Ok(loaded)
}

fn load_file(path: &Path) -> Result<Vec<Organization>, String> {
    let raw = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let body = strip_json_fence(&raw);
    let source: SourceFile = serde_json::from_str(body).map_err(|e| e.to_string())?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (division, industry) = parse_division(&file_name);

    Ok(source
        .data
        .iter()
        .filter_map(|entry| entry.get("organisation_name")?.as_str())
        .filter(|name| !name.trim().is_empty())
        .map(|name| Organization {
            organisation_name: name.to_string(),
            division: division.clone(),
            industry: industry.clone(),
        })
        .collect())
}

fn strip_json_fence(raw: &str) -> &str {
    let s = raw.trim();
    let s = s.strip_prefix("```json").unwrap_or(s);
    let s = s.strip_suffix("```").unwrap_or(s);
    s.trim()
}

/// Parse `(division, industry)` from a source file name.
///
/// Returns `("", "Unknown")` when the name does not follow the pattern.
pub fn parse_division(file_name: &str) -> (String, String) {
    match DIVISION_FILE.captures(file_name) {
        Some(caps) => {
            let division = format!("Division {}", &caps[1]);
            let industry = caps[2].replace('_', " ").replace(',', "").replace('&', "and");
            (division, title_case(&industry))
        }
        None => (String::new(), "Unknown".to_string()),
    }
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
