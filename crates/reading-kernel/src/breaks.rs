//! Self-paced rest breaks between main-block trials.

use anyhow::Result;
use tracing::info;

use crate::keys::Key;
use crate::presenter::Presenter;

/// Decides when to pause the main block and shows the rest screen.
#[derive(Debug, Clone, Copy)]
pub struct BreakScheduler {
    every: usize,
}

impl BreakScheduler {
    /// `every` is clamped to at least 1.
    pub fn new(every: usize) -> Self {
        Self { every: every.max(1) }
    }

    /// Whether a break follows trial `trial` (1-based) of `total`.
    ///
    /// Never after the final trial.
    pub fn is_due(&self, trial: usize, total: usize) -> bool {
        trial % self.every == 0 && trial != total
    }

    /// Fraction of the block completed after `trial`.
    pub fn progress(trial: usize, total: usize) -> f64 {
        if total == 0 {
            return 1.0;
        }
        trial as f64 / total as f64
    }

    /// Rest screen text with the completed percentage rounded down.
    pub fn message(trial: usize, total: usize, continue_key: Key) -> String {
        let percent = (Self::progress(trial, total) * 100.0).floor() as u32;
        format!(
            "Take a short break!\n\nYou have completed {}%.\nPress {} to continue.",
            percent,
            continue_key.name().to_uppercase()
        )
    }

    /// Show the rest screen if one is due and block until `continue_key`.
    ///
    /// Returns whether a break was taken.
    pub async fn maybe_break<P: Presenter>(
        &self,
        presenter: &mut P,
        continue_key: Key,
        trial: usize,
        total: usize,
    ) -> Result<bool> {
        if !self.is_due(trial, total) {
            return Ok(false);
        }
        info!(trial = trial, total = total, "Offering rest break");
        let text = Self::message(trial, total, continue_key);
        presenter
            .show_progress(&text, Self::progress(trial, total))
            .await?;
        presenter.wait_for_key(&[continue_key]).await?;
        Ok(true)
    }
}
