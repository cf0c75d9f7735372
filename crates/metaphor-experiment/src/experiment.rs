//! Session driver for the metaphor reading experiment.
//!
//! Orchestrates the session lifecycle:
//! 1. Derive the participant id and ask for the language group
//! 2. Show instructions and draw the key assignment
//! 3. Run the practice block (nothing persisted)
//! 4. Sequence and run the main block, persisting each trial and offering breaks
//! 5. Summarize the main block

use anyhow::Result;
use chrono::Utc;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use reading_kernel::scoring::spelling_mismatches;
use reading_kernel::{
    BreakScheduler, ExperimentConfig, KeyMapping, LanguageGroup, Presenter, ScoringRule,
    SequenceReport, Session, StimulusRecord, TrialOutcome, TrialRunner, TrialSequencer, is_aborted,
};

use crate::data_log::DataLog;
use crate::results::{BlockStats, SessionSummary};
use crate::screens;
use crate::stimuli::exclude_practice;

/// ChaCha stream reserved for ordering the main block.
const ORDER_STREAM: u64 = 1;

/// The main-block order `seed` produces.
///
/// Practice phrases are removed first. The order is drawn from its own
/// stream of the seed, so the key mapping and jitter draws never shift it.
pub fn main_order(
    config: &ExperimentConfig,
    seed: u64,
    main_stimuli: Vec<StimulusRecord>,
    practice: &[StimulusRecord],
) -> Vec<StimulusRecord> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(ORDER_STREAM);
    TrialSequencer::new(config.sequencer.buffer_min)
        .sequence(exclude_practice(main_stimuli, practice), &mut rng)
}

/// Which block a trial belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    /// Full trials, nothing persisted, no breaks
    Practice,
    /// Persisted trials with rest breaks
    Main,
}

impl Block {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Practice => "practice",
            Self::Main => "main",
        }
    }
}

/// Everything a finished (or aborted) session produced.
#[derive(Debug, Clone)]
pub struct SessionRun {
    pub session: Session,
    /// Main-block outcomes in trial order
    pub outcomes: Vec<TrialOutcome>,
    pub aborted: bool,
    pub summary: SessionSummary,
}

/// Runs one participant through the experiment.
pub struct Experiment<P> {
    config: ExperimentConfig,
    presenter: P,
    log: DataLog,
    seed: u64,
    rng: ChaCha8Rng,
    runner: TrialRunner,
    breaks: BreakScheduler,
}

impl<P: Presenter> Experiment<P> {
    /// Create a driver. A missing seed is drawn at random and logged.
    pub fn new(config: ExperimentConfig, presenter: P, log: DataLog) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let runner = TrialRunner::new(&config, ChaCha8Rng::seed_from_u64(rng.random()));
        let breaks = BreakScheduler::new(config.breaks.every);

        Self {
            config,
            presenter,
            log,
            seed,
            rng,
            runner,
            breaks,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Run a full session over `main_stimuli` with the given practice items.
    ///
    /// An abort in any response window ends the session early; the outcomes
    /// persisted up to that point are still summarized.
    pub async fn run(
        &mut self,
        practice: &[StimulusRecord],
        main_stimuli: Vec<StimulusRecord>,
    ) -> Result<SessionRun> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        info!(run_id = %run_id, seed = self.seed, "Starting session");

        if self.config.scoring == ScoringRule::Legacy {
            let mismatched = spelling_mismatches(practice.iter().chain(main_stimuli.iter()));
            if !mismatched.is_empty() {
                let types: Vec<&str> = mismatched.iter().map(|t| t.as_str()).collect();
                warn!(
                    types = ?types,
                    "Legacy scoring compares against space-separated type names; \
                     these types never match and are scored as meaningless"
                );
            }
        }

        let session = self.start_session().await?;
        let mut outcomes = Vec::new();
        let result = self
            .run_blocks(&session, practice, main_stimuli, &mut outcomes)
            .await;

        let aborted = match result {
            Ok(()) => false,
            Err(e) if is_aborted(&e) => {
                warn!(completed = outcomes.len(), "Session aborted by participant");
                true
            }
            Err(e) => return Err(e),
        };

        let summary = SessionSummary {
            run_id,
            participant_id: session.participant_id,
            language_group: session.language_group.to_string(),
            key_mapping: session.key_mapping.serialize_for_log(),
            scoring_rule: self.config.scoring.name().to_string(),
            seed: self.seed,
            started_at,
            ended_at: Utc::now(),
            aborted,
            overall: BlockStats::from_outcomes(&outcomes),
            by_type: SessionSummary::by_type(&outcomes),
        };
        info!(
            participant = summary.participant_id,
            trials = summary.overall.trials,
            timeouts = summary.overall.timeouts,
            accuracy = summary.overall.accuracy,
            mean_rt_ms = summary.overall.mean_rt_ms,
            aborted = aborted,
            "Session summary"
        );

        Ok(SessionRun {
            session,
            outcomes,
            aborted,
            summary,
        })
    }

    async fn run_blocks(
        &mut self,
        session: &Session,
        practice: &[StimulusRecord],
        main_stimuli: Vec<StimulusRecord>,
        outcomes: &mut Vec<TrialOutcome>,
    ) -> Result<()> {
        let keys = self.config.keys.clone();

        if self.config.practice && !practice.is_empty() {
            self.gate(&screens::practice_intro(keys.continue_key)).await?;
            self.countdown().await?;
            let mut discarded = Vec::new();
            self.run_block(session, practice, Block::Practice, &mut discarded)
                .await?;
            self.gate(&screens::practice_complete(keys.continue_key)).await?;
        }

        let ordered = self.sequence(main_stimuli, practice);
        self.countdown().await?;
        self.run_block(session, &ordered, Block::Main, outcomes).await?;

        self.presenter.show_text(&screens::goodbye(keys.abort)).await?;
        self.presenter.wait_for_key(&[keys.abort]).await?;
        info!(trials = outcomes.len(), "Session complete");
        Ok(())
    }

    /// Derive the participant id, ask for the language group, show the
    /// instructions and draw the key mapping.
    pub async fn start_session(&mut self) -> Result<Session> {
        let keys = self.config.keys.clone();
        let participant_id = self.log.next_participant_id().next_id();

        self.presenter
            .show_text(&screens::language_prompt(keys.first_language, keys.second_language))
            .await?;
        let answer = self
            .presenter
            .wait_for_key(&[keys.first_language, keys.second_language])
            .await?;
        let language_group = if answer == keys.first_language {
            LanguageGroup::L1
        } else {
            LanguageGroup::L2
        };

        self.gate(&screens::welcome(keys.continue_key, self.config.breaks.every))
            .await?;
        let window_secs = self.config.timing.response_window_ms as f64 / 1000.0;
        self.gate(&screens::procedure(keys.continue_key, window_secs)).await?;
        self.gate(&screens::risks(keys.continue_key)).await?;

        let key_mapping =
            KeyMapping::random(keys.first_response, keys.second_response, &mut self.rng);
        self.gate(&screens::key_assignment(&key_mapping, keys.continue_key)).await?;

        let session = Session {
            participant_id,
            language_group,
            key_mapping,
        };
        info!(
            participant = session.participant_id,
            language_group = %session.language_group,
            key_mapping = %session.key_mapping.serialize_for_log(),
            "Session started"
        );
        Ok(session)
    }

    /// Order the main block and log how well pairs are separated.
    pub fn sequence(
        &self,
        main_stimuli: Vec<StimulusRecord>,
        practice: &[StimulusRecord],
    ) -> Vec<StimulusRecord> {
        let buffer_min = self.config.sequencer.buffer_min;
        let ordered = main_order(&self.config, self.seed, main_stimuli, practice);
        let report = SequenceReport::from_order(&ordered);
        info!(
            trials = report.total,
            pairs = report.pairs.len(),
            singles = report.singles,
            min_gap = report.min_gap(),
            "Main block sequenced"
        );
        let short = report.short_pairs(buffer_min);
        if !short.is_empty() {
            warn!(
                pairs = short.len(),
                buffer_min = buffer_min,
                "Not enough fillers to fully separate every pair"
            );
        }
        ordered
    }

    /// Run `trials` in order, appending outcomes as they complete.
    pub async fn run_block(
        &mut self,
        session: &Session,
        trials: &[StimulusRecord],
        block: Block,
        outcomes: &mut Vec<TrialOutcome>,
    ) -> Result<()> {
        let total = trials.len();
        let continue_key = self.config.keys.continue_key;
        info!(block = block.name(), trials = total, "Starting block");

        for (i, stimulus) in trials.iter().enumerate() {
            let trial_num = i + 1;
            debug!(
                block = block.name(),
                trial = trial_num,
                total = total,
                "Running trial"
            );
            let outcome = self.runner.run(&mut self.presenter, session, stimulus).await?;

            if block == Block::Main {
                self.log.append(&outcome)?;
            }
            outcomes.push(outcome);

            if block == Block::Main {
                self.breaks
                    .maybe_break(&mut self.presenter, continue_key, trial_num, total)
                    .await?;
            }
        }
        Ok(())
    }

    /// 3-2-1 countdown before a block.
    pub async fn countdown(&mut self) -> Result<()> {
        let step = self.config.timing.countdown_step();
        for count in [3, 2, 1] {
            self.presenter.show_text(&count.to_string()).await?;
            sleep(step).await;
        }
        Ok(())
    }

    /// Show `text` and block until the continue key.
    async fn gate(&mut self, text: &str) -> Result<()> {
        self.presenter.show_text(text).await?;
        self.presenter
            .wait_for_key(&[self.config.keys.continue_key])
            .await?;
        Ok(())
    }
}
