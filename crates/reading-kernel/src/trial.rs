//! The per-trial state machine.
//!
//! A trial walks a fixed phase sequence with no loops back:
//!
//! ```text
//! ContextDisplay -> AwaitContinue -> Fixation -> WordStream -> ResponseWindow
//!     -> (Timeout | Responded) -> PostTrialCooldown -> Complete
//! ```
//!
//! Only the response window captures a classification; the abort key pressed
//! there ends the whole session with [`Aborted`].

use std::fmt;
use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use crate::config::{ExperimentConfig, KeyConfig, TimingConfig};
use crate::error::Aborted;
use crate::keys::{Key, KeyMapping};
use crate::presenter::Presenter;
use crate::scoring::ScoringRule;
use crate::session::{LanguageGroup, Session};
use crate::stimulus::{Condition, StimulusRecord};

/// Shown for the feedback period after an unanswered response window.
pub const TIMEOUT_MESSAGE: &str = "Please respond faster next time.";

/// Phases of a single trial, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrialPhase {
    ContextDisplay,
    AwaitContinue,
    Fixation,
    WordStream,
    ResponseWindow,
    Timeout,
    Responded,
    PostTrialCooldown,
    Complete,
}

impl TrialPhase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ContextDisplay => "context_display",
            Self::AwaitContinue => "await_continue",
            Self::Fixation => "fixation",
            Self::WordStream => "word_stream",
            Self::ResponseWindow => "response_window",
            Self::Timeout => "timeout",
            Self::Responded => "responded",
            Self::PostTrialCooldown => "post_trial_cooldown",
            Self::Complete => "complete",
        }
    }

    /// The phase that follows this one.
    ///
    /// `responded` only matters when leaving `ResponseWindow`. `Complete` is
    /// terminal.
    pub fn successor(self, responded: bool) -> Option<Self> {
        match self {
            Self::ContextDisplay => Some(Self::AwaitContinue),
            Self::AwaitContinue => Some(Self::Fixation),
            Self::Fixation => Some(Self::WordStream),
            Self::WordStream => Some(Self::ResponseWindow),
            Self::ResponseWindow if responded => Some(Self::Responded),
            Self::ResponseWindow => Some(Self::Timeout),
            Self::Timeout | Self::Responded => Some(Self::PostTrialCooldown),
            Self::PostTrialCooldown => Some(Self::Complete),
            Self::Complete => None,
        }
    }
}

impl fmt::Display for TrialPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one trial. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialOutcome {
    pub participant_id: u64,
    pub language_group: LanguageGroup,
    pub stimulus: StimulusRecord,
    /// Key pressed inside the window, `None` on timeout
    pub response: Option<Key>,
    /// 1 correct, 0 incorrect, `None` on timeout
    pub accuracy: Option<u8>,
    /// Time from window open to key press
    pub response_time: Option<Duration>,
    pub key_mapping: KeyMapping,
}

impl TrialOutcome {
    /// Accuracy as counted downstream: a timeout scores 0.
    pub fn scored_accuracy(&self) -> u8 {
        self.accuracy.unwrap_or(0)
    }

    /// Label the participant chose, if any.
    pub fn response_label(&self) -> Option<Condition> {
        self.response.and_then(|key| self.key_mapping.label_of(key))
    }
}

/// Draw a duration uniformly from `[min_ms, max_ms]`.
pub fn jitter(min_ms: u64, max_ms: u64, rng: &mut impl Rng) -> Duration {
    let min = min_ms as f64 / 1000.0;
    let max = max_ms as f64 / 1000.0;
    Duration::from_secs_f64(rng.random_range(min..=max))
}

/// Drives stimuli through the trial phases.
pub struct TrialRunner {
    timing: TimingConfig,
    keys: KeyConfig,
    scoring: ScoringRule,
    rng: ChaCha8Rng,
}

impl TrialRunner {
    /// Create a runner whose jitter draws come from `rng`.
    pub fn new(config: &ExperimentConfig, rng: ChaCha8Rng) -> Self {
        Self {
            timing: config.timing.clone(),
            keys: config.keys.clone(),
            scoring: config.scoring,
            rng,
        }
    }

    /// Run one stimulus from context display to completion.
    ///
    /// Returns `Err(Aborted)` if the abort key is pressed in the response
    /// window; no outcome is produced for that trial.
    pub async fn run<P: Presenter>(
        &mut self,
        presenter: &mut P,
        session: &Session,
        stimulus: &StimulusRecord,
    ) -> Result<TrialOutcome> {
        let mapping = session.key_mapping;
        let mut phase = TrialPhase::ContextDisplay;
        let mut response: Option<(Key, Duration)> = None;
        let mut accuracy: Option<u8> = None;

        loop {
            presenter.enter_phase(phase);
            match phase {
                TrialPhase::ContextDisplay => {
                    presenter.show_text(&stimulus.context).await?;
                }
                TrialPhase::AwaitContinue => {
                    presenter.wait_for_key(&[self.keys.continue_key]).await?;
                }
                TrialPhase::Fixation => {
                    let hold = jitter(
                        self.timing.fixation_min_ms,
                        self.timing.fixation_max_ms,
                        &mut self.rng,
                    );
                    presenter.show_fixation().await?;
                    sleep(hold).await;
                }
                TrialPhase::WordStream => {
                    for word in stimulus.words() {
                        presenter.show_word(word).await?;
                        sleep(self.timing.word()).await;
                    }
                }
                TrialPhase::ResponseWindow => {
                    response = self.response_window(presenter, &mapping).await?;
                }
                TrialPhase::Timeout => {
                    debug!(stimulus = %stimulus.stimulus, "No response before deadline");
                }
                TrialPhase::Responded => {
                    if let Some((key, _)) = response {
                        accuracy = Some(self.scoring.score(stimulus, &mapping, key));
                    }
                }
                TrialPhase::PostTrialCooldown => {
                    if response.is_some() {
                        let hold = jitter(
                            self.timing.post_response_min_ms,
                            self.timing.post_response_max_ms,
                            &mut self.rng,
                        );
                        presenter.show_answered().await?;
                        sleep(hold).await;
                    } else {
                        presenter.show_text(TIMEOUT_MESSAGE).await?;
                        sleep(self.timing.timeout_feedback()).await;
                    }
                }
                TrialPhase::Complete => break,
            }
            match phase.successor(response.is_some()) {
                Some(next) => phase = next,
                None => break,
            }
        }

        let outcome = TrialOutcome {
            participant_id: session.participant_id,
            language_group: session.language_group,
            stimulus: stimulus.clone(),
            response: response.map(|(key, _)| key),
            accuracy,
            response_time: response.map(|(_, rt)| rt),
            key_mapping: mapping,
        };

        info!(
            stimulus_type = %stimulus.stimulus_type,
            response = %outcome.response.map(|k| k.name()).unwrap_or_else(|| "NA".to_string()),
            accuracy = outcome.accuracy,
            rt_ms = outcome.response_time.map(|rt| rt.as_millis() as u64),
            "Trial complete"
        );

        Ok(outcome)
    }

    /// Open the window and wait for the first accepted key.
    async fn response_window<P: Presenter>(
        &self,
        presenter: &mut P,
        mapping: &KeyMapping,
    ) -> Result<Option<(Key, Duration)>> {
        let window = self.timing.response_window();
        let [first, second] = mapping.response_keys();
        let accepted = [first, second, self.keys.abort];

        presenter.open_response_window().await?;
        let opened = Instant::now();

        match presenter.poll_key(&accepted, window).await? {
            Some(key) if key == self.keys.abort => Err(Aborted.into()),
            Some(key) if key == first || key == second => {
                let latency = opened.elapsed().min(window);
                Ok(Some((key, latency)))
            }
            // A presenter that ignores `accepted` gets treated as silent.
            _ => Ok(None),
        }
    }
}
