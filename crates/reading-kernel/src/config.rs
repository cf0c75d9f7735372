//! Configuration types for a reading experiment.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::keys::Key;
use crate::scoring::ScoringRule;

/// Top-level experiment configuration.
///
/// Every field has a default, so a config file only needs the values it
/// changes. Loaded from JSON at runtime.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Phase durations
    pub timing: TimingConfig,
    /// Input surface
    pub keys: KeyConfig,
    /// Trial ordering constraints
    pub sequencer: SequencerConfig,
    /// Rest break cadence
    pub breaks: BreakConfig,
    /// How responses are scored
    pub scoring: ScoringRule,
    /// Run the built-in practice block before the main block
    pub practice: bool,
    /// Random seed (None draws one and logs it)
    pub seed: Option<u64>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            timing: TimingConfig::default(),
            keys: KeyConfig::default(),
            sequencer: SequencerConfig::default(),
            breaks: BreakConfig::default(),
            scoring: ScoringRule::Legacy,
            practice: true,
            seed: None,
        }
    }
}

impl ExperimentConfig {
    /// Load a config file, filling unspecified fields with defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&json)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the runner cannot honor.
    pub fn validate(&self) -> Result<()> {
        self.timing.validate()?;
        self.keys.validate()?;
        if self.breaks.every == 0 {
            anyhow::bail!("breaks.every must be at least 1");
        }
        Ok(())
    }
}

/// Phase durations in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Lower bound of the fixation jitter
    pub fixation_min_ms: u64,
    /// Upper bound of the fixation jitter
    pub fixation_max_ms: u64,
    /// Display time per word of the target phrase
    pub word_ms: u64,
    /// Length of the response window
    pub response_window_ms: u64,
    /// Lower bound of the post-response pause
    pub post_response_min_ms: u64,
    /// Upper bound of the post-response pause
    pub post_response_max_ms: u64,
    /// How long the "respond faster" message stays up after a timeout
    pub timeout_feedback_ms: u64,
    /// Duration of each step of the 3-2-1 countdown
    pub countdown_step_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            fixation_min_ms: 1_000,
            fixation_max_ms: 2_000,
            word_ms: 500,
            response_window_ms: 2_000,
            post_response_min_ms: 1_000,
            post_response_max_ms: 2_000,
            timeout_feedback_ms: 3_000,
            countdown_step_ms: 1_000,
        }
    }
}

impl TimingConfig {
    pub fn word(&self) -> Duration {
        Duration::from_millis(self.word_ms)
    }

    pub fn response_window(&self) -> Duration {
        Duration::from_millis(self.response_window_ms)
    }

    pub fn timeout_feedback(&self) -> Duration {
        Duration::from_millis(self.timeout_feedback_ms)
    }

    pub fn countdown_step(&self) -> Duration {
        Duration::from_millis(self.countdown_step_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.fixation_min_ms > self.fixation_max_ms {
            anyhow::bail!(
                "timing.fixation_min_ms ({}) exceeds fixation_max_ms ({})",
                self.fixation_min_ms,
                self.fixation_max_ms
            );
        }
        if self.post_response_min_ms > self.post_response_max_ms {
            anyhow::bail!(
                "timing.post_response_min_ms ({}) exceeds post_response_max_ms ({})",
                self.post_response_min_ms,
                self.post_response_max_ms
            );
        }
        if self.response_window_ms == 0 {
            anyhow::bail!("timing.response_window_ms must be positive");
        }
        Ok(())
    }
}

/// Keys the participant uses.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    pub first_response: Key,
    pub second_response: Key,
    /// Advances every self-paced screen
    pub continue_key: Key,
    /// Ends the session from a response window
    pub abort: Key,
    /// Answers "English is my first language"
    pub first_language: Key,
    /// Answers "English is my second language"
    pub second_language: Key,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            first_response: Key::Char('d'),
            second_response: Key::Char('k'),
            continue_key: Key::Space,
            abort: Key::Escape,
            first_language: Key::Char('1'),
            second_language: Key::Char('2'),
        }
    }
}

impl KeyConfig {
    fn validate(&self) -> Result<()> {
        let window_keys = [self.first_response, self.second_response, self.abort];
        for (i, a) in window_keys.iter().enumerate() {
            if window_keys[i + 1..].contains(a) {
                anyhow::bail!("keys: {} is assigned twice in the response window", a);
            }
        }
        if self.first_language == self.second_language {
            anyhow::bail!("keys: both language answers use {}", self.first_language);
        }
        Ok(())
    }
}

/// Ordering constraints for the main block.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Fillers placed between the two members of a critical pair
    pub buffer_min: usize,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self { buffer_min: 20 }
    }
}

/// Rest break cadence.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BreakConfig {
    /// Offer a break after every `every` trials
    pub every: usize,
}

impl Default for BreakConfig {
    fn default() -> Self {
        Self { every: 10 }
    }
}
