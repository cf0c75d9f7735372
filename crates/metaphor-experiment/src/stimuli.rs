//! Stimulus files and the built-in practice block.
//!
//! Stimulus sets come as CSV (header row naming `context`, `stimulus`,
//! `stimulus_type` and `condition`, in any order) or as a JSON array of
//! objects with the same fields. Rows whose fields are all empty are dropped.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use reading_kernel::{Condition, StimulusRecord};

const COLUMNS: [&str; 4] = ["context", "stimulus", "stimulus_type", "condition"];

/// A row as read from disk, before validation.
#[derive(Debug, Default, Deserialize)]
struct RawRow {
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    stimulus: Option<String>,
    #[serde(default)]
    stimulus_type: Option<String>,
    #[serde(default)]
    condition: Option<String>,
}

impl RawRow {
    fn is_blank(&self) -> bool {
        [&self.context, &self.stimulus, &self.stimulus_type, &self.condition]
            .iter()
            .all(|f| f.as_deref().is_none_or(|s| s.trim().is_empty()))
    }

    fn into_record(self, row: usize) -> Result<StimulusRecord> {
        let stimulus = self
            .stimulus
            .filter(|s| !s.trim().is_empty())
            .with_context(|| format!("row {}: missing stimulus", row))?;
        let condition: Condition = self
            .condition
            .as_deref()
            .unwrap_or("")
            .parse()
            .with_context(|| format!("row {}: bad condition", row))?;
        Ok(StimulusRecord::new(
            self.context.unwrap_or_default().trim(),
            stimulus.trim(),
            self.stimulus_type.unwrap_or_default().trim(),
            condition,
        ))
    }
}

/// Load a stimulus set, choosing the format by file extension.
pub fn load_stimuli(path: impl AsRef<Path>) -> Result<Vec<StimulusRecord>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading stimuli {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let records = if is_json {
        parse_json(&text)
    } else {
        parse_csv_stimuli(&text)
    }
    .with_context(|| format!("parsing stimuli {}", path.display()))?;

    info!(path = %path.display(), count = records.len(), "Loaded stimuli");
    Ok(records)
}

fn parse_json(text: &str) -> Result<Vec<StimulusRecord>> {
    let rows: Vec<RawRow> = serde_json::from_str(text)?;
    collect_rows(rows)
}

/// Parse CSV stimulus text with a header row.
pub fn parse_csv_stimuli(text: &str) -> Result<Vec<StimulusRecord>> {
    let mut table = parse_csv(text)?.into_iter();
    let header = table.next().context("stimulus file is empty")?;

    let mut index = [0usize; 4];
    for (slot, name) in index.iter_mut().zip(COLUMNS) {
        *slot = header
            .iter()
            .position(|h| h.trim().trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
            .with_context(|| format!("missing column {:?}", name))?;
    }

    let field = |row: &[String], i: usize| row.get(i).cloned();
    let rows = table.map(|row| RawRow {
        context: field(&row, index[0]),
        stimulus: field(&row, index[1]),
        stimulus_type: field(&row, index[2]),
        condition: field(&row, index[3]),
    });
    collect_rows(rows)
}

fn collect_rows(rows: impl IntoIterator<Item = RawRow>) -> Result<Vec<StimulusRecord>> {
    let mut records = Vec::new();
    let mut dropped = 0;
    // Row numbers count data rows from 1.
    for (i, row) in rows.into_iter().enumerate() {
        if row.is_blank() {
            dropped += 1;
            continue;
        }
        records.push(row.into_record(i + 1)?);
    }
    if dropped > 0 {
        debug!(dropped = dropped, "Dropped blank stimulus rows");
    }
    Ok(records)
}

/// Split CSV text into rows of fields.
///
/// Handles double-quoted fields with embedded commas, doubled quotes and
/// line breaks. Lines that are entirely empty are skipped.
pub fn parse_csv(text: &str) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                if !(row.len() == 1 && row[0].is_empty()) {
                    rows.push(std::mem::take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        anyhow::bail!("unterminated quoted field");
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    Ok(rows)
}

/// The seven practice items shown before the main block.
pub fn practice_stimuli() -> Vec<StimulusRecord> {
    use Condition::{Meaningful, Meaningless};

    [
        (
            "The river sparkled in the sunlight, its surface dotted with tiny bubbles. The light shimmered on the water, making it look bright and lively.",
            "this river is champagne",
            "novel_metaphor",
            Meaningful,
        ),
        (
            "The lamp stood quietly in the corner, giving off a dim yellow glow. It flickered slightly as the evening grew darker.",
            "that lamp is a floor",
            "anomalous",
            Meaningless,
        ),
        (
            "The device rested on the desk, its buttons arranged in neat rows. The case felt cool to the touch.",
            "this device is a laptop",
            "conventional_metaphor",
            Meaningful,
        ),
        (
            "The package looked perfectly wrapped and clean from the outside. Inside, the contents were broken and missing pieces.",
            "appearance is a deceiver",
            "novel_metaphor",
            Meaningful,
        ),
        (
            "The pool stretched out in the backyard, its water a deep blue. Leaves floated slowly along the edges of the surface.",
            "this pool is a mirror",
            "conventional_metaphor",
            Meaningful,
        ),
        (
            "His fingers glided across the paper, leaving smooth strokes behind. Every movement traced soft lines in perfect shapes.",
            "his hand is brush",
            "novel_metaphor",
            Meaningful,
        ),
        (
            "After rereading the letter, the meaning suddenly became clear. Everything else fell into place like pieces of a puzzle.",
            "understanding is a key",
            "conventional_metaphor",
            Meaningful,
        ),
    ]
    .into_iter()
    .map(|(context, stimulus, ty, condition)| StimulusRecord::new(context, stimulus, ty, condition))
    .collect()
}

/// Remove main-set rows whose phrase is also a practice phrase.
pub fn exclude_practice(
    main: Vec<StimulusRecord>,
    practice: &[StimulusRecord],
) -> Vec<StimulusRecord> {
    let before = main.len();
    let kept: Vec<StimulusRecord> = main
        .into_iter()
        .filter(|r| !practice.iter().any(|p| p.stimulus == r.stimulus))
        .collect();
    if kept.len() < before {
        debug!(removed = before - kept.len(), "Removed practice items from main set");
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_quotes_and_commas() {
        let text = "a,b\n\"one, two\",\"say \"\"hi\"\"\"\r\nx,\"multi\nline\"\n";
        let rows = parse_csv(text).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec!["one, two".to_string(), "say \"hi\"".to_string()]);
        assert_eq!(rows[2], vec!["x".to_string(), "multi\nline".to_string()]);
    }

    #[test]
    fn test_parse_csv_without_trailing_newline() {
        let rows = parse_csv("a,b\n1,2").unwrap();
        assert_eq!(rows, vec![vec!["a", "b"], vec!["1", "2"]]);
    }

    #[test]
    fn test_parse_csv_rejects_unterminated_quote() {
        assert!(parse_csv("a,\"b\n").is_err());
    }

    #[test]
    fn test_stimuli_columns_in_any_order_and_blank_rows_dropped() {
        let text = "condition,stimulus_type,stimulus,context,notes\n\
                    meaningful,single_x,time is a thief,\"Hours slipped, unnoticed.\",n1\n\
                    ,,,,\n\
                    meaningless,anomalous,that lamp is a floor,The lamp stood.,n2\n";
        let records = parse_csv_stimuli(text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].context, "Hours slipped, unnoticed.");
        assert_eq!(records[0].stimulus, "time is a thief");
        assert_eq!(records[0].stimulus_type.as_str(), "single_x");
        assert_eq!(records[1].condition, Condition::Meaningless);
    }

    #[test]
    fn test_stimuli_missing_column_is_an_error() {
        let err = parse_csv_stimuli("context,stimulus,condition\na,b,meaningful\n").unwrap_err();
        assert!(err.to_string().contains("stimulus_type"));
    }

    #[test]
    fn test_stimuli_bad_condition_reports_row() {
        let text = "context,stimulus,stimulus_type,condition\nc,s,literal,perhaps\n";
        let err = parse_csv_stimuli(text).unwrap_err();
        assert!(format!("{:#}", err).contains("row 1"));
    }

    #[test]
    fn test_json_stimuli() {
        let json = r#"[
            {"context": "c", "stimulus": "life is a journey", "stimulus_type": "extended_a", "condition": "meaningful"},
            {}
        ]"#;
        let records = parse_json(json).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].stimulus_type.is_paired());
    }

    #[test]
    fn test_practice_set() {
        let practice = practice_stimuli();
        assert_eq!(practice.len(), 7);
        assert_eq!(practice[1].stimulus, "that lamp is a floor");
        assert_eq!(practice[1].condition, Condition::Meaningless);
        assert!(practice.iter().all(|p| !p.stimulus_type.is_paired()));
    }

    #[test]
    fn test_exclude_practice() {
        let practice = practice_stimuli();
        let main = vec![
            StimulusRecord::new(
                "c",
                "this pool is a mirror",
                "conventional_metaphor",
                Condition::Meaningful,
            ),
            StimulusRecord::new("c", "time is a thief", "single_x", Condition::Meaningful),
        ];
        let kept = exclude_practice(main, &practice);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].stimulus, "time is a thief");
    }
}
