//! Per-run participant session.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::keys::KeyMapping;

/// Whether the participant's first language is the stimulus language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LanguageGroup {
    L1,
    L2,
}

impl LanguageGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            LanguageGroup::L1 => "L1",
            LanguageGroup::L2 => "L2",
        }
    }
}

impl fmt::Display for LanguageGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State that lives for one participant's run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub participant_id: u64,
    pub language_group: LanguageGroup,
    pub key_mapping: KeyMapping,
}

/// Why the participant id fell back to 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdFallback {
    /// The log could not be read
    Unreadable(String),
    /// The log has no lines
    Empty,
    /// The last line does not start with a usable id
    Malformed(String),
}

/// Where a participant id came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdSource {
    /// Last persisted id plus one
    Persisted(u64),
    /// Default id after a failed lookup
    Fallback(IdFallback),
}

impl IdSource {
    /// The id to use for the new participant.
    pub fn next_id(&self) -> u64 {
        match self {
            IdSource::Persisted(last) => last.checked_add(1).unwrap_or(1),
            IdSource::Fallback(_) => 1,
        }
    }
}

/// Derive the next participant id from the contents of a data log.
///
/// Reads the first comma-separated field of the last line. A header-only
/// log falls back like any other non-numeric line.
pub fn participant_id_from_log(contents: &str) -> IdSource {
    let Some(last) = contents.lines().last() else {
        return IdSource::Fallback(IdFallback::Empty);
    };
    let field = last.split(',').next().unwrap_or("").trim();
    // The largest id has no successor, so it is treated like a bad line.
    match field.parse::<u64>() {
        Ok(id) if id < u64::MAX => IdSource::Persisted(id),
        _ => IdSource::Fallback(IdFallback::Malformed(last.to_string())),
    }
}

/// Derive the next participant id from a data log on disk.
pub fn participant_id_from_path(path: impl AsRef<Path>) -> IdSource {
    match std::fs::read_to_string(path.as_ref()) {
        Ok(contents) => participant_id_from_log(&contents),
        Err(e) => IdSource::Fallback(IdFallback::Unreadable(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_log_starts_at_one() {
        let source = participant_id_from_log("");
        assert_eq!(source, IdSource::Fallback(IdFallback::Empty));
        assert_eq!(source.next_id(), 1);
    }

    #[test]
    fn test_last_row_id_is_incremented() {
        let log = "participant,language_group\n6,L1,x\n7,L2,y\n";
        assert_eq!(participant_id_from_log(log), IdSource::Persisted(7));
        assert_eq!(participant_id_from_log(log).next_id(), 8);
    }

    #[test]
    fn test_header_only_log_falls_back() {
        let log = "participant,language_group,context\n";
        assert_eq!(participant_id_from_log(log).next_id(), 1);
    }

    #[test]
    fn test_unparseable_last_line_falls_back() {
        let log = "1,L1,a\nseven,L1,b\n";
        let source = participant_id_from_log(log);
        assert!(matches!(source, IdSource::Fallback(IdFallback::Malformed(_))));
        assert_eq!(source.next_id(), 1);
    }

    #[test]
    fn test_largest_id_falls_back_instead_of_overflowing() {
        let log = "participant\n18446744073709551615,L1,x\n";
        let source = participant_id_from_log(log);
        assert!(matches!(source, IdSource::Fallback(IdFallback::Malformed(_))));
        assert_eq!(source.next_id(), 1);
        assert_eq!(IdSource::Persisted(u64::MAX).next_id(), 1);
    }

    #[test]
    fn test_trailing_blank_line_falls_back() {
        let log = "1,L1,a\n\n";
        assert_eq!(participant_id_from_log(log).next_id(), 1);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let source = participant_id_from_path("/nonexistent/dir/experiment_data.csv");
        assert!(matches!(source, IdSource::Fallback(IdFallback::Unreadable(_))));
        assert_eq!(source.next_id(), 1);
    }
}
