//! Session summary for the main block.
//!
//! Captures:
//! - trial, response and timeout counts
//! - scored accuracy (timeouts count as incorrect)
//! - mean and median latency of answered trials
//! - the same breakdown per stimulus type

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use reading_kernel::TrialOutcome;

/// Aggregates for a group of trials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockStats {
    pub trials: usize,
    pub responses: usize,
    pub timeouts: usize,
    /// Mean of scored accuracy over all trials
    pub accuracy: f64,
    /// Mean latency of answered trials, in milliseconds
    pub mean_rt_ms: Option<f64>,
    /// Median latency of answered trials, in milliseconds
    pub median_rt_ms: Option<f64>,
}

impl BlockStats {
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a TrialOutcome>) -> Self {
        let mut trials = 0;
        let mut correct = 0usize;
        let mut rts: Vec<f64> = Vec::new();

        for outcome in outcomes {
            trials += 1;
            correct += outcome.scored_accuracy() as usize;
            if let Some(rt) = outcome.response_time {
                rts.push(rt.as_secs_f64() * 1000.0);
            }
        }

        let responses = rts.len();
        let accuracy = if trials > 0 {
            correct as f64 / trials as f64
        } else {
            0.0
        };
        let mean_rt_ms = (responses > 0).then(|| rts.iter().sum::<f64>() / responses as f64);
        rts.sort_by(f64::total_cmp);
        let median_rt_ms = match responses {
            0 => None,
            n if n % 2 == 1 => Some(rts[n / 2]),
            n => Some((rts[n / 2 - 1] + rts[n / 2]) / 2.0),
        };

        Self {
            trials,
            responses,
            timeouts: trials - responses,
            accuracy,
            mean_rt_ms,
            median_rt_ms,
        }
    }
}

/// Summary written at the end of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Unique id for this run
    pub run_id: Uuid,
    pub participant_id: u64,
    pub language_group: String,
    pub key_mapping: String,
    pub scoring_rule: String,
    /// Seed that reproduces the trial order
    pub seed: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Whether the participant aborted before the end
    pub aborted: bool,
    pub overall: BlockStats,
    pub by_type: BTreeMap<String, BlockStats>,
}

impl SessionSummary {
    /// Group outcomes by stimulus type and compute the aggregates.
    pub fn by_type(outcomes: &[TrialOutcome]) -> BTreeMap<String, BlockStats> {
        let mut grouped: BTreeMap<String, Vec<&TrialOutcome>> = BTreeMap::new();
        for outcome in outcomes {
            grouped
                .entry(outcome.stimulus.stimulus_type.to_string())
                .or_default()
                .push(outcome);
        }
        grouped
            .into_iter()
            .map(|(ty, group)| (ty, BlockStats::from_outcomes(group)))
            .collect()
    }

    /// Save the summary as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a summary from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let summary = serde_json::from_str(&json)?;
        Ok(summary)
    }
}

/// Generate a timestamped output path from the given path.
/// e.g., "summary.json" -> "summary-20260108-010530.json"
pub fn timestamped_path(path: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d-%H%M%S");
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("summary");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("json");
    let parent = path.parent().unwrap_or(Path::new("."));
    parent.join(format!("{}-{}.{}", stem, timestamp, ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use reading_kernel::{Condition, Key, KeyMapping, LanguageGroup, StimulusRecord};

    fn outcome(ty: &str, response: Option<(u8, u64)>) -> TrialOutcome {
        TrialOutcome {
            participant_id: 1,
            language_group: LanguageGroup::L1,
            stimulus: StimulusRecord::new("c", "a is b", ty, Condition::Meaningful),
            response: response.map(|_| Key::Char('d')),
            accuracy: response.map(|(a, _)| a),
            response_time: response.map(|(_, ms)| Duration::from_millis(ms)),
            key_mapping: KeyMapping::new(Key::Char('d'), Key::Char('k'), Condition::Meaningful),
        }
    }

    #[test]
    fn test_block_stats_counts_timeouts_as_incorrect() {
        let outcomes = vec![
            outcome("anomalous", Some((1, 400))),
            outcome("anomalous", Some((0, 800))),
            outcome("anomalous", None),
            outcome("anomalous", Some((1, 600))),
        ];
        let stats = BlockStats::from_outcomes(&outcomes);

        assert_eq!(stats.trials, 4);
        assert_eq!(stats.responses, 3);
        assert_eq!(stats.timeouts, 1);
        assert!((stats.accuracy - 0.5).abs() < 1e-9);
        assert!((stats.mean_rt_ms.unwrap() - 600.0).abs() < 1e-9);
        assert!((stats.median_rt_ms.unwrap() - 600.0).abs() < 1e-9);
    }

    #[test]
    fn test_block_stats_empty() {
        let stats = BlockStats::from_outcomes(&[]);
        assert_eq!(stats.trials, 0);
        assert_eq!(stats.mean_rt_ms, None);
        assert_eq!(stats.median_rt_ms, None);
    }

    #[test]
    fn test_even_median() {
        let outcomes = vec![outcome("x", Some((1, 100))), outcome("x", Some((1, 300)))];
        let stats = BlockStats::from_outcomes(&outcomes);
        assert!((stats.median_rt_ms.unwrap() - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_by_type_groups() {
        let outcomes = vec![
            outcome("single_x", Some((1, 500))),
            outcome("literal", None),
            outcome("single_x", Some((0, 700))),
        ];
        let by_type = SessionSummary::by_type(&outcomes);
        assert_eq!(by_type.len(), 2);
        assert_eq!(by_type["single_x"].trials, 2);
        assert_eq!(by_type["literal"].timeouts, 1);
    }

    #[test]
    fn test_timestamped_path_keeps_stem_and_ext() {
        let path = timestamped_path(Path::new("out/summary.json"));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("summary-"));
        assert!(name.ends_with(".json"));
        assert_eq!(path.parent(), Some(Path::new("out")));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let outcomes = vec![outcome("anomalous", Some((1, 450)))];
        let summary = SessionSummary {
            run_id: Uuid::new_v4(),
            participant_id: 2,
            language_group: "L2".to_string(),
            key_mapping: "D = meaningful, K = meaningless".to_string(),
            scoring_rule: "legacy".to_string(),
            seed: 42,
            started_at: Utc::now(),
            ended_at: Utc::now(),
            aborted: false,
            overall: BlockStats::from_outcomes(&outcomes),
            by_type: SessionSummary::by_type(&outcomes),
        };
        summary.save(&path).unwrap();
        let loaded = SessionSummary::load(&path).unwrap();
        assert_eq!(loaded.run_id, summary.run_id);
        assert_eq!(loaded.overall, summary.overall);
    }
}
