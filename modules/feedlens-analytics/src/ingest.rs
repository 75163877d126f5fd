// Ingestion: a directory of dated JSON batch files → one in-memory dataset.
//
// Each file is one batch. The batch timestamp comes from the filename, or the
// file's mtime when no date pattern parses. Every record in a batch shares it.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use feedlens_common::{FeedlensError, RawPost, Record, Result};

const BATCH_EXTENSION: &str = "json";

// =============================================================================
// Filename timestamp patterns
// =============================================================================

static RE_DASHED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("valid regex"));
static RE_UNDERSCORED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}_\d{2}_\d{2}").expect("valid regex"));
static RE_COMPACT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{8}").expect("valid regex"));
static RE_DATETIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}_\d{2}-\d{2}-\d{2}").expect("valid regex")
});

/// Pattern attempts in priority order. The first match that also parses wins.
fn timestamp_patterns() -> [(&'static Regex, &'static str, bool); 4] {
    [
        (&*RE_DASHED, "%Y-%m-%d", false),
        (&*RE_UNDERSCORED, "%Y_%m_%d", false),
        (&*RE_COMPACT, "%Y%m%d", false),
        (&*RE_DATETIME, "%Y-%m-%d_%H-%M-%S", true),
    ]
}

/// Extract a timestamp from a filename stem, e.g. `batch_2024-03-01`.
pub fn timestamp_from_filename(stem: &str) -> Option<NaiveDateTime> {
    for (re, format, has_time) in timestamp_patterns() {
        let Some(m) = re.find(stem) else {
            continue;
        };
        let parsed = if has_time {
            NaiveDateTime::parse_from_str(m.as_str(), format).ok()
        } else {
            NaiveDate::parse_from_str(m.as_str(), format)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        };
        if parsed.is_some() {
            return parsed;
        }
    }
    None
}

/// Timestamp for a batch file: filename first, then last-modified time.
pub fn batch_timestamp(path: &Path) -> NaiveDateTime {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    if let Some(ts) = timestamp_from_filename(stem) {
        return ts;
    }

    match std::fs::metadata(path).and_then(|m| m.modified()) {
        Ok(mtime) => {
            debug!(file = %path.display(), "No date in filename, using mtime");
            DateTime::<Local>::from(mtime).naive_local()
        }
        Err(e) => {
            warn!(file = %path.display(), error = %e, "No date in filename and mtime unavailable, using now");
            Local::now().naive_local()
        }
    }
}

// =============================================================================
// Batches
// =============================================================================

/// One file's worth of records.
#[derive(Debug, Clone)]
pub struct Batch {
    pub path: PathBuf,
    pub timestamp: NaiveDateTime,
    pub records: Vec<Record>,
    pub skipped: usize,
    pub quarantined: usize,
}

/// Loose truthiness for the `skip` flag: false, null, zero and empty
/// strings or collections keep the post, anything else skips it.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

/// Parse one batch file. Errors only when the file as a whole is unusable;
/// individual bad posts are quarantined and counted.
pub fn load_batch(path: &Path, timestamp: NaiveDateTime) -> Result<Batch> {
    let ingest_err = |reason: String| FeedlensError::Ingest {
        file: path.to_path_buf(),
        reason,
    };

    let content = std::fs::read_to_string(path).map_err(|e| ingest_err(e.to_string()))?;
    let posts: Vec<Value> =
        serde_json::from_str(&content).map_err(|e| ingest_err(format!("not a JSON array of posts: {e}")))?;

    let mut batch = Batch {
        path: path.to_path_buf(),
        timestamp,
        records: Vec::with_capacity(posts.len()),
        skipped: 0,
        quarantined: 0,
    };

    for (index, post) in posts.into_iter().enumerate() {
        if post.get("skip").is_some_and(is_truthy) {
            batch.skipped += 1;
            continue;
        }
        match serde_json::from_value::<RawPost>(post) {
            Ok(raw) => batch.records.push(Record::from_raw(raw, timestamp)),
            Err(e) => {
                batch.quarantined += 1;
                warn!(file = %path.display(), index, error = %e, "Quarantined post with missing or invalid fields");
            }
        }
    }

    Ok(batch)
}

// =============================================================================
// Dataset
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub files_read: u32,
    pub files_skipped: u32,
    pub records_loaded: usize,
    pub records_skipped: usize,
    pub records_quarantined: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub records: Vec<Record>,
    pub stats: IngestStats,
}

impl Dataset {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// `*.json` files directly inside `dir`, sorted by name.
pub fn batch_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some(BATCH_EXTENSION))
        .collect();
    files.sort();
    Ok(files)
}

/// Load every batch in `dir`. Never fails: unreadable directories and
/// malformed files are logged and contribute nothing.
pub fn load_dataset(dir: &Path) -> Dataset {
    let mut dataset = Dataset::default();

    let files = match batch_files(dir) {
        Ok(files) => files,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Cannot read data directory");
            return dataset;
        }
    };

    for path in files {
        let timestamp = batch_timestamp(&path);
        match load_batch(&path, timestamp) {
            Ok(batch) => {
                dataset.stats.files_read += 1;
                dataset.stats.records_skipped += batch.skipped;
                dataset.stats.records_quarantined += batch.quarantined;
                dataset.stats.records_loaded += batch.records.len();
                debug!(
                    file = %path.display(),
                    %timestamp,
                    records = batch.records.len(),
                    "Loaded batch"
                );
                dataset.records.extend(batch.records);
            }
            Err(e) => {
                dataset.stats.files_skipped += 1;
                warn!(error = %e, "Skipping batch file");
            }
        }
    }

    info!(
        dir = %dir.display(),
        files = dataset.stats.files_read,
        files_skipped = dataset.stats.files_skipped,
        records = dataset.stats.records_loaded,
        skipped = dataset.stats.records_skipped,
        quarantined = dataset.stats.records_quarantined,
        "Ingestion complete"
    );

    dataset
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32, ss: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(hh, mm, ss)
            .unwrap()
    }

    #[test]
    fn dashed_date() {
        assert_eq!(
            timestamp_from_filename("tweets_2024-03-15"),
            Some(at(2024, 3, 15, 0, 0, 0))
        );
    }

    #[test]
    fn underscored_date() {
        assert_eq!(
            timestamp_from_filename("2024_03_15_batch"),
            Some(at(2024, 3, 15, 0, 0, 0))
        );
    }

    #[test]
    fn compact_date() {
        assert_eq!(timestamp_from_filename("run20240315"), Some(at(2024, 3, 15, 0, 0, 0)));
    }

    #[test]
    fn dashed_date_wins_over_datetime_pattern() {
        // The date-only pattern is tried first and matches the prefix.
        assert_eq!(
            timestamp_from_filename("2024-03-15_10-30-00"),
            Some(at(2024, 3, 15, 0, 0, 0))
        );
    }

    #[test]
    fn unparseable_match_falls_through_to_next_pattern() {
        // 2024-13-45 matches the dashed shape but is not a date; 20240315 is.
        assert_eq!(
            timestamp_from_filename("2024-13-45_20240315"),
            Some(at(2024, 3, 15, 0, 0, 0))
        );
    }

    #[test]
    fn no_date_in_name() {
        assert_eq!(timestamp_from_filename("tweets"), None);
        assert_eq!(timestamp_from_filename("1234567"), None);
    }

    #[test]
    fn mtime_fallback_for_undated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        std::fs::write(&path, "[]").unwrap();
        let ts = batch_timestamp(&path);
        let now = Local::now().naive_local();
        assert!((now - ts).num_seconds().abs() < 120);
    }

    #[test]
    fn load_batch_filters_skip_and_quarantines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2024-03-15.json");
        std::fs::write(
            &path,
            r#"[
                {"topic": "AI tools", "emotion": "joy", "humor": true, "political_alignment": "none"},
                {"topic": "Taxes", "emotion": "anger", "skip": true},
                {"topic": "Gym", "emotion": "neutral", "skip": false, "political_alignment": ["left"]},
                {"emotion": "sadness"},
                {"topic": "Coffee", "emotion": "joy", "humor": "yes"}
            ]"#,
        )
        .unwrap();

        let ts = at(2024, 3, 15, 0, 0, 0);
        let batch = load_batch(&path, ts).unwrap();
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.skipped, 1);
        assert_eq!(batch.quarantined, 2);
        assert!(batch.records.iter().all(|r| r.timestamp == ts));
        assert!(batch.records[1].is_political());
    }

    #[test]
    fn skip_flag_follows_truthiness() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2024-03-15.json");
        std::fs::write(
            &path,
            r#"[
                {"topic": "a", "emotion": "joy", "skip": 1},
                {"topic": "b", "emotion": "joy", "skip": "yes"},
                {"topic": "c", "emotion": "joy", "skip": 0},
                {"topic": "d", "emotion": "joy", "skip": ""},
                {"topic": "e", "emotion": "joy", "skip": null},
                {"topic": "f", "emotion": "joy", "skip": [0]}
            ]"#,
        )
        .unwrap();

        let batch = load_batch(&path, at(2024, 3, 15, 0, 0, 0)).unwrap();
        assert_eq!(batch.skipped, 3);
        assert_eq!(batch.quarantined, 0);
        let topics: Vec<_> = batch.records.iter().map(|r| r.topic.as_str()).collect();
        assert_eq!(topics, vec!["c", "d", "e"]);
    }

    #[test]
    fn load_batch_rejects_non_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2024-03-15.json");
        std::fs::write(&path, r#"{"topic": "x"}"#).unwrap();
        let err = load_batch(&path, at(2024, 3, 15, 0, 0, 0)).unwrap_err();
        assert!(matches!(err, FeedlensError::Ingest { .. }));
    }

    #[test]
    fn batch_files_only_json_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b_2024-01-02.json", "a_2024-01-01.json", "notes.txt", "data.JSONL"] {
            std::fs::write(dir.path().join(name), "[]").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.json")).unwrap();

        let files = batch_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a_2024-01-01.json", "b_2024-01-02.json"]);
    }

    #[test]
    fn missing_directory_yields_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = load_dataset(&dir.path().join("does-not-exist"));
        assert!(dataset.is_empty());
        assert_eq!(dataset.stats, IngestStats::default());
    }
}
