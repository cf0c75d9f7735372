//! Append-only CSV data log.
//!
//! One row per main-block trial. The file is opened in append mode for every
//! write, so a crash mid-trial loses only that trial's row.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use reading_kernel::TrialOutcome;
use reading_kernel::session::{IdSource, participant_id_from_path};

/// Column header, written once when the file is created.
pub const HEADER: &str =
    "participant,language_group,context,stimulus,stimulus_type,condition,response,accuracy,response_time,key_mapping";

/// Literal written for a missing value.
pub const MISSING: &str = "NA";

/// Handle to the data log file.
#[derive(Debug, Clone)]
pub struct DataLog {
    path: PathBuf,
}

impl DataLog {
    /// Open the log, creating it with a header if it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            std::fs::write(&path, format!("{}\n", HEADER))
                .with_context(|| format!("creating data log {}", path.display()))?;
            info!(path = %path.display(), "Created data log");
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Id for the next participant, derived from the last row.
    pub fn next_participant_id(&self) -> IdSource {
        let source = participant_id_from_path(&self.path);
        if let IdSource::Fallback(reason) = &source {
            debug!(reason = ?reason, "Participant id lookup fell back to 1");
        }
        source
    }

    /// Append one outcome as a row.
    pub fn append(&self, outcome: &TrialOutcome) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .with_context(|| format!("opening data log {}", self.path.display()))?;
        writeln!(file, "{}", format_row(outcome))
            .with_context(|| format!("writing data log {}", self.path.display()))?;
        Ok(())
    }
}

/// Make free text safe for the unquoted log format.
///
/// Commas become semicolons; line breaks become spaces.
pub fn clean_field(text: &str) -> String {
    text.replace(',', ";").replace(['\r', '\n'], " ")
}

/// Render an outcome as a log row (without the trailing newline).
pub fn format_row(outcome: &TrialOutcome) -> String {
    let response = outcome
        .response
        .map(|k| k.name())
        .unwrap_or_else(|| MISSING.to_string());
    let accuracy = outcome
        .accuracy
        .map(|a| a.to_string())
        .unwrap_or_else(|| MISSING.to_string());
    let response_time = outcome
        .response_time
        .map(|rt| rt.as_secs_f64().to_string())
        .unwrap_or_else(|| MISSING.to_string());

    [
        outcome.participant_id.to_string(),
        outcome.language_group.to_string(),
        clean_field(&outcome.stimulus.context),
        clean_field(&outcome.stimulus.stimulus),
        outcome.stimulus.stimulus_type.to_string(),
        outcome.stimulus.condition.to_string(),
        response,
        accuracy,
        response_time,
        outcome.key_mapping.serialize_for_log(),
    ]
    .join(",")
}
