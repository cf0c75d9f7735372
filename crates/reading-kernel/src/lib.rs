//! Reading Kernel: trial sequencing and timed trial presentation.
//!
//! This crate holds the parts of a reading-time experiment that do not depend
//! on how screens are drawn:
//! - a constrained randomizer that separates paired critical items with fillers
//! - a per-trial state machine with a timed response window
//! - response scoring, rest-break scheduling and participant bookkeeping
//!
//! Drawing and key input go through the [`Presenter`] trait.

pub mod breaks;
pub mod config;
pub mod error;
pub mod keys;
pub mod presenter;
pub mod scoring;
#[cfg(any(test, feature = "testing"))]
pub mod scripted;
pub mod sequencer;
pub mod session;
pub mod stimulus;
pub mod trial;

pub use breaks::BreakScheduler;
pub use config::ExperimentConfig;
pub use error::{Aborted, is_aborted};
pub use keys::{Key, KeyMapping};
pub use presenter::Presenter;
pub use scoring::ScoringRule;
pub use sequencer::{SequenceReport, TrialSequencer};
pub use session::{IdSource, LanguageGroup, Session};
pub use stimulus::{Condition, StimulusRecord, StimulusType};
pub use trial::{TrialOutcome, TrialPhase, TrialRunner};
