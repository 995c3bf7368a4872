//! Link classifier: file type from the URL path, trust from the host name.
//!
//! Both checks are pure string heuristics. Trust is a guess at whether a
//! link lives on the organisation's own site; false positives and negatives
//! are expected.

use crate::model::FileType;
use url::Url;

/// Classify a URL by the suffix of its path.
///
/// `.pdf` is PDF, `.xls`/`.xlsx` is Excel, `.htm`/`.html` or a last path
/// segment without any `.` is HTML, anything else is Other.
pub fn detect_file_type(url: &str) -> FileType {
    let path = url_path(url).to_lowercase();
    let last_segment = path.rsplit('/').next().unwrap_or("");

    if path.ends_with(".pdf") {
        FileType::Pdf
    } else if path.ends_with(".xls") || path.ends_with(".xlsx") {
        FileType::Excel
    } else if path.ends_with(".html") || path.ends_with(".htm") || !last_segment.contains('.') {
        FileType::Html
    } else {
        FileType::Other
    }
}

/// Whether `url` appears to belong to `org_name`.
///
/// Trusted when the normalised name is a substring of the host (`www.`
/// stripped), or when at least two of the name's words each are.
pub fn is_trusted_link(url: &str, org_name: &str) -> bool {
    let Some(host) = host_of(url) else {
        return false;
    };

    let normalised = normalise_name(org_name);
    if !normalised.is_empty() && host.contains(&normalised) {
        return true;
    }

    let lowered = org_name.to_lowercase();
    let matches = lowered
        .split_whitespace()
        .filter(|word| host.contains(word))
        .count();
    matches >= 2
}

/// Lower-case, drop spaces and parentheses, `&` becomes `and`.
pub fn normalise_name(org_name: &str) -> String {
    org_name
        .to_lowercase()
        .replace('&', "and")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '(' && *c != ')')
        .collect()
}

fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

/// Path component of `url`, or the raw string minus query and fragment when
/// it does not parse.
fn url_path(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}
