//! A presenter that replays scripted key presses and records what it drew.
//!
//! Built for tests running on paused tokio time: each reply sleeps for its
//! latency before returning, so measured response times are exact.

use std::collections::VecDeque;
use std::time::Duration;

use anyhow::Result;
use tokio::time::sleep;

use crate::keys::Key;
use crate::presenter::Presenter;
use crate::trial::TrialPhase;

/// One scripted participant action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Press `key` after `after` has elapsed
    Press { key: Key, after: Duration },
    /// Let the response window run out
    Silent,
}

impl Reply {
    pub fn press(c: char, after_ms: u64) -> Self {
        Reply::Press {
            key: Key::Char(c),
            after: Duration::from_millis(after_ms),
        }
    }
}

/// Everything the presenter was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Text(String),
    Fixation,
    Word(String),
    ResponseWindow,
    Answered,
    Progress { text: String, fraction: f64 },
    Waited(Key),
    Polled(Option<Key>),
    Phase(TrialPhase),
}

/// Presenter driven by a queue of [`Reply`] values.
///
/// Continue gates take the next reply only when it presses an accepted key;
/// otherwise they return the first accepted key immediately. Response
/// windows consume one reply each, and an empty queue behaves like
/// [`Reply::Silent`].
#[derive(Debug, Default)]
pub struct ScriptedPresenter {
    replies: VecDeque<Reply>,
    events: Vec<Event>,
}

impl ScriptedPresenter {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: replies.into_iter().collect(),
            events: Vec::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.replies.len()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Phase transitions seen so far.
    pub fn phases(&self) -> Vec<TrialPhase> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Phase(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    /// Words shown during word streams, in order.
    pub fn words(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Word(w) => Some(w.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Texts shown, in order.
    pub fn texts(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Presenter for ScriptedPresenter {
    async fn show_text(&mut self, text: &str) -> Result<()> {
        self.events.push(Event::Text(text.to_string()));
        Ok(())
    }

    async fn show_fixation(&mut self) -> Result<()> {
        self.events.push(Event::Fixation);
        Ok(())
    }

    async fn show_word(&mut self, word: &str) -> Result<()> {
        self.events.push(Event::Word(word.to_string()));
        Ok(())
    }

    async fn open_response_window(&mut self) -> Result<()> {
        self.events.push(Event::ResponseWindow);
        Ok(())
    }

    async fn show_answered(&mut self) -> Result<()> {
        self.events.push(Event::Answered);
        Ok(())
    }

    async fn show_progress(&mut self, text: &str, fraction: f64) -> Result<()> {
        self.events.push(Event::Progress {
            text: text.to_string(),
            fraction,
        });
        Ok(())
    }

    async fn wait_for_key(&mut self, accepted: &[Key]) -> Result<Key> {
        let scripted = match self.replies.front() {
            Some(Reply::Press { key, after }) if accepted.contains(key) => Some((*key, *after)),
            _ => None,
        };
        let key = match scripted {
            Some((key, after)) => {
                self.replies.pop_front();
                sleep(after).await;
                key
            }
            None => match accepted.first() {
                Some(key) => *key,
                None => anyhow::bail!("wait_for_key called with no accepted keys"),
            },
        };
        self.events.push(Event::Waited(key));
        Ok(key)
    }

    async fn poll_key(&mut self, accepted: &[Key], timeout: Duration) -> Result<Option<Key>> {
        let pressed = match self.replies.pop_front().unwrap_or(Reply::Silent) {
            Reply::Press { key, after } if after < timeout && accepted.contains(&key) => {
                sleep(after).await;
                Some(key)
            }
            _ => {
                sleep(timeout).await;
                None
            }
        };
        self.events.push(Event::Polled(pressed));
        Ok(pressed)
    }

    fn enter_phase(&mut self, phase: TrialPhase) {
        self.events.push(Event::Phase(phase));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_gate_skips_non_matching_reply() {
        let mut presenter = ScriptedPresenter::new([Reply::press('d', 100)]);
        let key = presenter.wait_for_key(&[Key::Space]).await.unwrap();
        assert_eq!(key, Key::Space);
        assert_eq!(presenter.remaining(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gate_consumes_matching_reply() {
        let mut presenter = ScriptedPresenter::new([Reply::press('2', 0)]);
        let key = presenter
            .wait_for_key(&[Key::Char('1'), Key::Char('2')])
            .await
            .unwrap();
        assert_eq!(key, Key::Char('2'));
        assert_eq!(presenter.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_times_out_on_empty_queue() {
        let mut presenter = ScriptedPresenter::default();
        let start = tokio::time::Instant::now();
        let key = presenter
            .poll_key(&[Key::Char('d')], Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(key, None);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }
}
