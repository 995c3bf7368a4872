//! Per-organisation content archives, kept newest-first on disk.
//!
//! Every field is quoted. After each append the collection pass calls
//! [`sort_archive`], which rewrites the file ordered by `Date Collected`
//! descending. [`is_newest_first`] checks that ordering on its own.

use crate::error::HarvestError;
use crate::model::ContentRecord;
use crate::pipeline::fetch::FetchedContent;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use csv::{QuoteStyle, StringRecord, WriterBuilder};
use std::cmp::Reverse;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of each organisation's archive.
pub const ARCHIVE_FILE: &str = "content.csv";

const DATE_COLUMN: &str = "Date Collected";

/// Directory name for an organisation: path separators become `_`.
pub fn org_dir_name(organization: &str) -> String {
    let name: String = organization
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    match name.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => name,
    }
}

/// Neutralise characters that would break the tabular layout.
///
/// `\n` and `\r` become spaces; `"` becomes `''`.
pub fn sanitize_content(text: &str) -> String {
    text.replace(['\n', '\r'], " ").replace('"', "''")
}

/// Timestamp in the archive's `Date Collected` format.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Build the archive row for freshly fetched content.
pub fn content_record(url: &str, content: &FetchedContent, at: DateTime<Utc>) -> ContentRecord {
    ContentRecord {
        url: url.to_string(),
        date_collected: format_timestamp(at),
        file_type: content.file_type,
        page_count: content.page_count,
        raw_content: sanitize_content(&content.text),
    }
}

/// Writes archives under one output root.
#[derive(Debug, Clone)]
pub struct ArchiveWriter {
    root: PathBuf,
}

impl ArchiveWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn org_dir(&self, organization: &str) -> PathBuf {
        self.root.join(org_dir_name(organization))
    }

    pub fn archive_path(&self, organization: &str) -> PathBuf {
        self.org_dir(organization).join(ARCHIVE_FILE)
    }

    /// Append `record`, creating the archive with a header when absent.
    pub fn append(&self, organization: &str, record: &ContentRecord) -> Result<PathBuf, HarvestError> {
        let path = self.archive_path(organization);
        super::append_row(&path, record, QuoteStyle::Always)?;
        debug!("Saved entry to {}", path.display());
        Ok(path)
    }
}

/// Parse a `Date Collected` value.
///
/// Accepts RFC 3339 and offset-less ISO 8601 (read as UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn read_archive(path: &Path) -> Result<(StringRecord, Vec<StringRecord>, usize), HarvestError> {
    let read_err = |source| HarvestError::TableRead {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::Reader::from_path(path).map_err(read_err)?;
    let headers = reader.headers().map_err(read_err)?.clone();
    let date_idx = headers
        .iter()
        .position(|h| h == DATE_COLUMN)
        .ok_or_else(|| HarvestError::MalformedTable {
            path: path.to_path_buf(),
            detail: format!("no '{}' column", DATE_COLUMN),
        })?;
    let rows = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_err)?;
    Ok((headers, rows, date_idx))
}

/// Rewrite the archive at `path` newest-first. Returns the row count.
///
/// The sort is stable and rows with unparseable dates go last. Columns and
/// cell contents are carried through untouched.
pub fn sort_archive(path: &Path) -> Result<usize, HarvestError> {
    let (headers, mut rows, date_idx) = read_archive(path)?;
    rows.sort_by_key(|row| Reverse(row.get(date_idx).and_then(parse_timestamp)));

    let parent = super::ensure_parent(path)?;
    let mut tmp =
        tempfile::NamedTempFile::new_in(parent).map_err(|e| HarvestError::io(parent, e))?;
    {
        let write_err = |source| HarvestError::TableWrite {
            path: path.to_path_buf(),
            source,
        };
        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .from_writer(tmp.as_file_mut());
        writer.write_record(&headers).map_err(write_err)?;
        for row in &rows {
            writer.write_record(row).map_err(write_err)?;
        }
        writer.flush().map_err(|e| HarvestError::io(path, e))?;
    }
    tmp.persist(path).map_err(|e| HarvestError::io(path, e.error))?;
    Ok(rows.len())
}

/// `true` when `Date Collected` never increases from one row to the next.
pub fn is_newest_first(path: &Path) -> Result<bool, HarvestError> {
    let (_, rows, date_idx) = read_archive(path)?;
    let keys: Vec<Option<DateTime<Utc>>> = rows
        .iter()
        .map(|row| row.get(date_idx).and_then(parse_timestamp))
        .collect();
    Ok(keys.windows(2).all(|w| w[0] >= w[1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileType;
    use chrono::TimeZone;

    fn record(url: &str, at: DateTime<Utc>) -> ContentRecord {
        content_record(
            url,
            &FetchedContent {
                file_type: FileType::Html,
                page_count: 0,
                text: format!("text for {url}"),
            },
            at,
        )
    }

    #[test]
    fn sanitising_neutralises_breaks_and_quotes() {
        assert_eq!(sanitize_content("a\nb\r\nc \"q\""), "a b  c ''q''");
    }

    #[test]
    fn org_dir_replaces_separators() {
        assert_eq!(org_dir_name("A/B\\C Ltd"), "A_B_C Ltd");
        assert_eq!(org_dir_name(".."), "_");
    }

    #[test]
    fn timestamps_have_micros_and_z() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        assert_eq!(format_timestamp(at), "2024-05-01T08:30:00.000000Z");
    }

    #[test]
    fn naive_iso_timestamps_parse() {
        assert!(parse_timestamp("2025-03-04T10:11:12.123456").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn append_then_sort_is_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArchiveWriter::new(dir.path());
        let t = |h| Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap();

        for (url, hour) in [("https://a.org/1", 9), ("https://a.org/2", 11), ("https://a.org/3", 10)] {
            let path = writer.append("GreenCo", &record(url, t(hour))).unwrap();
            sort_archive(&path).unwrap();
            assert!(is_newest_first(&path).unwrap());
        }

        let path = writer.archive_path("GreenCo");
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let urls: Vec<String> = reader
            .deserialize::<ContentRecord>()
            .map(|r| r.unwrap().url)
            .collect();
        assert_eq!(urls, vec!["https://a.org/2", "https://a.org/3", "https://a.org/1"]);
    }

    #[test]
    fn every_field_is_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArchiveWriter::new(dir.path());
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let path = writer.append("GreenCo", &record("https://a.org", at)).unwrap();
        sort_archive(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            r#""URL","Date Collected","File Type","Page Count","Raw Content""#
        );
        assert!(lines.next().unwrap().contains(r#","HTML","0","#));
    }

    #[test]
    fn unparseable_dates_sort_last() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ARCHIVE_FILE);
        std::fs::write(
            &path,
            "URL,Date Collected,File Type,Page Count,Raw Content\n\
             a,garbage,HTML,,x\n\
             b,2024-01-01T00:00:00Z,HTML,0,y\n\
             c,2025-01-01T00:00:00.5,PDF,3,z\n",
        )
        .unwrap();
        assert!(!is_newest_first(&path).unwrap());
        assert_eq!(sort_archive(&path).unwrap(), 3);
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let order: Vec<String> = reader
            .records()
            .map(|r| r.unwrap()[0].to_string())
            .collect();
        assert_eq!(order, vec!["c", "b", "a"]);
        assert!(is_newest_first(&path).unwrap());
    }

    #[test]
    fn archive_without_date_column_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ARCHIVE_FILE);
        std::fs::write(&path, "URL,When\na,b\n").unwrap();
        assert!(matches!(
            sort_archive(&path),
            Err(HarvestError::MalformedTable { .. })
        ));
    }
}
