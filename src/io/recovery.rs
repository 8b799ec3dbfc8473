use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Logs above this size are trimmed before the next append.
const MAX_LOG_SIZE: u64 = 1_048_576;

/// Default age cutoff for pruning, in days.
pub const PRUNE_AGE_DAYS: i64 = 30;

/// Self-documenting header written at the top of a new recovery log.
const FILE_HEADER: &str = "\
<!-- docket recovery log: append-only
     Holds list data docket could not load or save normally.
     If something went missing, check here.
     View with: dk recovery
     Prune with: dk recovery prune -->

---
";

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// Category of a recovery entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryCategory {
    /// Saved data that could not be decoded
    Decode,
    /// A snapshot that could not be written
    Write,
    /// A task removed by the user
    Delete,
}

impl fmt::Display for RecoveryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryCategory::Decode => write!(f, "decode"),
            RecoveryCategory::Write => write!(f, "write"),
            RecoveryCategory::Delete => write!(f, "delete"),
        }
    }
}

/// A single entry in the recovery log.
#[derive(Debug, Clone)]
pub struct RecoveryEntry {
    pub timestamp: DateTime<Utc>,
    pub category: RecoveryCategory,
    pub description: String,
    pub fields: Vec<(String, String)>,
    pub body: String,
}

impl RecoveryEntry {
    pub fn new(category: RecoveryCategory, description: impl Into<String>, body: impl Into<String>) -> Self {
        RecoveryEntry {
            timestamp: Utc::now(),
            category,
            description: description.into(),
            fields: Vec::new(),
            body: body.into(),
        }
    }

    pub fn field(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields.push((key.to_string(), value.into()));
        self
    }

    /// Format this entry as a markdown block for the recovery log.
    fn to_markdown(&self) -> String {
        let mut out = format!(
            "## {} | {}: {}\n\n",
            self.timestamp
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            self.category,
            self.description,
        );

        for (key, value) in &self.fields {
            out.push_str(&format!("{}: {}\n", key, value));
        }

        if !self.body.is_empty() {
            out.push('\n');
            out.push_str("```text\n");
            out.push_str(&self.body);
            if !self.body.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("```\n");
        }

        out.push('\n');
        out.push_str("---\n");
        out
    }
}

// ---------------------------------------------------------------------------
// Paths and writes
// ---------------------------------------------------------------------------

/// Return the path to the recovery log file.
pub fn recovery_log_path(dir: &Path) -> PathBuf {
    dir.join(".recovery.log")
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Append a recovery entry to the log. Errors are swallowed and reported
/// through `tracing`.
pub fn log_recovery(dir: &Path, entry: RecoveryEntry) {
    if let Err(e) = log_recovery_inner(dir, &entry) {
        warn!(error = %e, category = %entry.category, "could not write to recovery log");
    }
}

fn log_recovery_inner(dir: &Path, entry: &RecoveryEntry) -> io::Result<()> {
    let path = recovery_log_path(dir);
    trim_if_oversized(&path, MAX_LOG_SIZE);

    let needs_header = std::fs::metadata(&path).map_or(true, |m| m.len() == 0);

    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    if needs_header {
        file.write_all(FILE_HEADER.as_bytes())?;
    }
    file.write_all(entry.to_markdown().as_bytes())?;
    Ok(())
}

/// Raw recovery log text, if any has been written
pub fn read_recovery_log(dir: &Path) -> Option<String> {
    std::fs::read_to_string(recovery_log_path(dir)).ok()
}

/// Number of entries in the log
pub fn count_entries(log: &str) -> usize {
    log.lines().filter(|l| l.starts_with("## ")).count()
}

// ---------------------------------------------------------------------------
// Pruning
// ---------------------------------------------------------------------------

/// Timestamp from an entry header line (without the leading `## `)
fn entry_timestamp(header: &str) -> Option<DateTime<Utc>> {
    let (ts, _) = header.split_once(" | ")?;
    DateTime::parse_from_rfc3339(ts.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Split raw log text into the file header and its entries, oldest first.
/// Everything up to the first `---` line is header.
fn split_log(content: &str) -> (String, Vec<(Option<DateTime<Utc>>, String)>) {
    let mut header = String::new();
    let mut entries: Vec<(Option<DateTime<Utc>>, String)> = Vec::new();
    let mut in_header = true;

    for line in content.lines() {
        if in_header {
            header.push_str(line);
            header.push('\n');
            if line == "---" {
                in_header = false;
            }
            continue;
        }
        match line.strip_prefix("## ") {
            Some(rest) => entries.push((entry_timestamp(rest), format!("{}\n", line))),
            None => match entries.last_mut() {
                Some((_, text)) => {
                    text.push_str(line);
                    text.push('\n');
                }
                // Stray text between the header and the first entry
                None => {
                    header.push_str(line);
                    header.push('\n');
                }
            },
        }
    }
    (header, entries)
}

/// Drop entries older than `cutoff`. Entries with an unreadable timestamp
/// are dropped too. The file header is kept.
fn prune_entries_before(content: &str, cutoff: &DateTime<Utc>) -> String {
    let (mut out, entries) = split_log(content);
    for (ts, text) in entries {
        if ts.is_some_and(|ts| ts >= *cutoff) {
            out.push_str(&text);
        }
    }
    out
}

/// Age-prune, then drop the oldest entries until the log fits in `max`
/// bytes. The newest entry is always kept.
fn trim_to_size(content: &str, max: usize) -> String {
    let cutoff = Utc::now() - chrono::Duration::days(PRUNE_AGE_DAYS);
    let pruned = prune_entries_before(content, &cutoff);
    if pruned.len() <= max {
        return pruned;
    }

    let (header, entries) = split_log(&pruned);
    let mut size = pruned.len();
    let mut skip = 0;
    while size > max && skip + 1 < entries.len() {
        size -= entries[skip].1.len();
        skip += 1;
    }
    let mut out = header;
    for (_, text) in entries.into_iter().skip(skip) {
        out.push_str(&text);
    }
    out
}

/// Rewrite the log in place when it has grown past `max` bytes. Failures
/// leave the log as it was.
fn trim_if_oversized(path: &Path, max: u64) {
    let Ok(meta) = std::fs::metadata(path) else {
        return;
    };
    if meta.len() <= max {
        return;
    }
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "could not read recovery log for trimming");
            return;
        }
    };
    let limit = usize::try_from(max).unwrap_or(usize::MAX);
    let trimmed = trim_to_size(&content, limit);
    if trimmed.len() < content.len() {
        match atomic_write(path, trimmed.as_bytes()) {
            Ok(()) => debug!(
                before = content.len(),
                after = trimmed.len(),
                "trimmed recovery log"
            ),
            Err(e) => warn!(error = %e, "could not trim recovery log"),
        }
    }
}

/// Prune entries from the recovery log. With `all` only the header is left;
/// otherwise entries older than `before` (default: `PRUNE_AGE_DAYS` ago)
/// are removed. Returns the number of entries removed.
pub fn prune_recovery(dir: &Path, before: Option<DateTime<Utc>>, all: bool) -> io::Result<usize> {
    let path = recovery_log_path(dir);
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };
    let original = count_entries(&content);

    if all {
        atomic_write(&path, FILE_HEADER.as_bytes())?;
        return Ok(original);
    }

    let cutoff = before.unwrap_or_else(|| Utc::now() - chrono::Duration::days(PRUNE_AGE_DAYS));
    let trimmed = prune_entries_before(&content, &cutoff);
    let removed = original - count_entries(&trimmed);
    if removed > 0 {
        atomic_write(&path, trimmed.as_bytes())?;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn first_entry_writes_header() {
        let dir = TempDir::new().unwrap();
        log_recovery(
            dir.path(),
            RecoveryEntry::new(RecoveryCategory::Decode, "unreadable snapshot", "not json {{")
                .field("Source", "lists.json"),
        );
        let log = read_recovery_log(dir.path()).unwrap();
        assert!(log.starts_with("<!-- docket recovery log"));
        assert!(log.contains("decode: unreadable snapshot"));
        assert!(log.contains("Source: lists.json"));
        assert!(log.contains("```text\nnot json {{\n```"));
        assert_eq!(count_entries(&log), 1);
    }

    #[test]
    fn entries_append() {
        let dir = TempDir::new().unwrap();
        for i in 0..3 {
            log_recovery(
                dir.path(),
                RecoveryEntry::new(RecoveryCategory::Write, format!("save {}", i), ""),
            );
        }
        let log = read_recovery_log(dir.path()).unwrap();
        assert_eq!(count_entries(&log), 3);
        assert_eq!(log.matches("<!-- docket").count(), 1);
    }

    #[test]
    fn missing_log_reads_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_recovery_log(dir.path()).is_none());
    }

    #[test]
    fn atomic_write_replaces_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lists.json");
        atomic_write(&path, b"one").unwrap();
        atomic_write(&path, b"two").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "two");
    }

    #[test]
    fn unwritable_dir_is_swallowed() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope").join("deeper");
        log_recovery(
            &missing,
            RecoveryEntry::new(RecoveryCategory::Delete, "x", "y"),
        );
        assert!(read_recovery_log(&missing).is_none());
    }

    fn entry_at(days_ago: i64, description: &str) -> RecoveryEntry {
        let mut entry = RecoveryEntry::new(RecoveryCategory::Delete, description, "{\"id\":\"t\"}");
        entry.timestamp = Utc::now() - chrono::Duration::days(days_ago);
        entry
    }

    fn write_entries(dir: &Path, entries: Vec<RecoveryEntry>) {
        for entry in entries {
            log_recovery(dir, entry);
        }
    }

    #[test]
    fn prune_drops_entries_before_cutoff() {
        let dir = TempDir::new().unwrap();
        write_entries(
            dir.path(),
            vec![entry_at(40, "old one"), entry_at(35, "old two"), entry_at(1, "recent")],
        );

        assert_eq!(prune_recovery(dir.path(), None, false).unwrap(), 2);
        let log = read_recovery_log(dir.path()).unwrap();
        assert!(log.starts_with("<!-- docket recovery log"));
        assert_eq!(count_entries(&log), 1);
        assert!(log.contains("delete: recent"));
        assert!(!log.contains("old one"));
    }

    #[test]
    fn prune_with_explicit_cutoff() {
        let dir = TempDir::new().unwrap();
        write_entries(dir.path(), vec![entry_at(5, "five"), entry_at(2, "two")]);
        let cutoff = Utc::now() - chrono::Duration::days(3);
        assert_eq!(prune_recovery(dir.path(), Some(cutoff), false).unwrap(), 1);
        let log = read_recovery_log(dir.path()).unwrap();
        assert!(log.contains("delete: two"));
        assert!(!log.contains("delete: five"));
    }

    #[test]
    fn prune_all_keeps_only_header() {
        let dir = TempDir::new().unwrap();
        write_entries(dir.path(), vec![entry_at(0, "a"), entry_at(0, "b")]);
        assert_eq!(prune_recovery(dir.path(), None, true).unwrap(), 2);
        assert_eq!(read_recovery_log(dir.path()).unwrap(), FILE_HEADER);

        log_recovery(dir.path(), entry_at(0, "after"));
        let log = read_recovery_log(dir.path()).unwrap();
        assert_eq!(log.matches("<!-- docket").count(), 1);
        assert_eq!(count_entries(&log), 1);
    }

    #[test]
    fn prune_missing_log_is_zero() {
        let dir = TempDir::new().unwrap();
        assert_eq!(prune_recovery(dir.path(), None, true).unwrap(), 0);
        assert!(read_recovery_log(dir.path()).is_none());
    }

    #[test]
    fn oversized_log_drops_oldest_entries() {
        let dir = TempDir::new().unwrap();
        write_entries(
            dir.path(),
            vec![entry_at(60, "stale"), entry_at(2, "first"), entry_at(1, "second"), entry_at(0, "third")],
        );
        let path = recovery_log_path(dir.path());
        let full = std::fs::read_to_string(&path).unwrap();
        let stale_len = split_log(&full).1[0].1.len();
        let first_len = split_log(&full).1[1].1.len();

        // Room for everything but the stale entry and one more
        let max = full.len() - stale_len - first_len;
        trim_if_oversized(&path, max as u64);

        let log = std::fs::read_to_string(&path).unwrap();
        assert!(log.len() <= max);
        assert!(log.starts_with("<!-- docket recovery log"));
        assert!(!log.contains("delete: stale"));
        assert!(!log.contains("delete: first"));
        assert!(log.contains("delete: second"));
        assert!(log.contains("delete: third"));
    }

    #[test]
    fn log_under_cap_is_left_alone() {
        let dir = TempDir::new().unwrap();
        write_entries(dir.path(), vec![entry_at(90, "ancient")]);
        let path = recovery_log_path(dir.path());
        trim_if_oversized(&path, MAX_LOG_SIZE);
        assert!(read_recovery_log(dir.path()).unwrap().contains("delete: ancient"));
    }

    #[test]
    fn trim_keeps_newest_entry_even_if_too_big() {
        let log = format!("{}{}", FILE_HEADER, entry_at(0, "huge").to_markdown());
        let trimmed = trim_to_size(&log, 10);
        assert_eq!(trimmed, log);
    }
}
