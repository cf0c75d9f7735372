//! The presentation seam.
//!
//! The kernel decides what is shown and for how long; a `Presenter` decides
//! how it is drawn and how keys are read. Timed holds are done by the caller
//! with `tokio::time`, so presenters only draw and read input.

use std::time::Duration;

use anyhow::Result;

use crate::keys::Key;
use crate::trial::TrialPhase;

/// Draws screens and reads keys for a single participant.
///
/// Implementations must be cancel-safe in `poll_key`: a timed-out poll may
/// not swallow a key press that arrives afterwards.
#[allow(async_fn_in_trait)]
pub trait Presenter {
    /// Show a block of text (instructions, context passages, feedback).
    async fn show_text(&mut self, text: &str) -> Result<()>;

    /// Show the central fixation marker.
    async fn show_fixation(&mut self) -> Result<()>;

    /// Show one word of the target phrase.
    async fn show_word(&mut self, word: &str) -> Result<()>;

    /// Clear the screen for the response window.
    async fn open_response_window(&mut self) -> Result<()>;

    /// Switch to the visually distinct "answered" display.
    async fn show_answered(&mut self) -> Result<()>;

    /// Show a rest screen with a progress bar filled to `fraction` (0.0..=1.0).
    async fn show_progress(&mut self, text: &str, fraction: f64) -> Result<()>;

    /// Block until one of `accepted` is pressed.
    async fn wait_for_key(&mut self, accepted: &[Key]) -> Result<Key>;

    /// Wait up to `timeout` for one of `accepted`; `None` when time runs out.
    async fn poll_key(&mut self, accepted: &[Key], timeout: Duration) -> Result<Option<Key>>;

    /// Called on every trial phase transition.
    fn enter_phase(&mut self, _phase: TrialPhase) {}
}
