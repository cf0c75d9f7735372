//! Terminal presenter.
//!
//! Screens are drawn with ANSI clear codes; keys are read a line at a time.
//! An empty line (just Enter) counts as SPACE, `esc` as ESCAPE, and any
//! single character as that key.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::time::{Instant, timeout};
use tracing::debug;

use reading_kernel::{Key, Presenter};

const CLEAR: &str = "\x1b[0m\x1b[2J\x1b[H";
const ANSWERED_BACKGROUND: &str = "\x1b[47m\x1b[2J\x1b[H";
const SCREEN_WIDTH: usize = 80;
const TEXT_WIDTH: usize = 72;
const BAR_WIDTH: usize = 50;
const TOP_PADDING: usize = 6;

/// Interpret one line of input as a key press.
pub fn parse_line(line: &str) -> Option<Key> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Some(Key::Space);
    }
    trimmed.parse().ok()
}

/// Greedy word wrap at `width` columns, keeping explicit line breaks.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        lines.push(line);
    }
    lines
}

fn centered(text: &str) -> String {
    let len = text.chars().count();
    let pad = SCREEN_WIDTH.saturating_sub(len) / 2;
    format!("{}{}", " ".repeat(pad), text)
}

/// Render a progress bar filled to `fraction`.
pub fn progress_bar(fraction: f64) -> String {
    let filled = ((fraction.clamp(0.0, 1.0) * BAR_WIDTH as f64).round()) as usize;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

/// Presenter over any line-based reader and byte writer.
pub struct ConsolePresenter<R, W> {
    lines: Lines<R>,
    out: W,
}

impl ConsolePresenter<BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    /// Presenter on the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> ConsolePresenter<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, out: W) -> Self {
        Self {
            lines: reader.lines(),
            out,
        }
    }

    /// Consume the presenter and return the writer.
    pub fn into_writer(self) -> W {
        self.out
    }

    async fn draw(&mut self, prefix: &str, body: &[String]) -> Result<()> {
        let mut screen = String::from(prefix);
        screen.push_str(&"\n".repeat(TOP_PADDING));
        for line in body {
            screen.push_str(&centered(line));
            screen.push('\n');
        }
        self.out
            .write_all(screen.as_bytes())
            .await
            .context("writing to terminal")?;
        self.out.flush().await.context("flushing terminal")?;
        Ok(())
    }

    async fn read_key(&mut self) -> Result<Option<Key>> {
        let line = self
            .lines
            .next_line()
            .await
            .context("reading terminal input")?
            .context("terminal input closed")?;
        let key = parse_line(&line);
        debug!(line = %line, key = ?key, "Read input line");
        Ok(key)
    }
}

impl<R, W> Presenter for ConsolePresenter<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    async fn show_text(&mut self, text: &str) -> Result<()> {
        let body = wrap(text, TEXT_WIDTH);
        self.draw(CLEAR, &body).await
    }

    async fn show_fixation(&mut self) -> Result<()> {
        self.draw(CLEAR, &["+".to_string()]).await
    }

    async fn show_word(&mut self, word: &str) -> Result<()> {
        self.draw(CLEAR, &[word.to_string()]).await
    }

    async fn open_response_window(&mut self) -> Result<()> {
        self.draw(CLEAR, &[]).await
    }

    async fn show_answered(&mut self) -> Result<()> {
        self.draw(ANSWERED_BACKGROUND, &[]).await
    }

    async fn show_progress(&mut self, text: &str, fraction: f64) -> Result<()> {
        let mut body = wrap(text, TEXT_WIDTH);
        body.push(String::new());
        body.push(progress_bar(fraction));
        self.draw(CLEAR, &body).await
    }

    async fn wait_for_key(&mut self, accepted: &[Key]) -> Result<Key> {
        loop {
            if let Some(key) = self.read_key().await?
                && accepted.contains(&key)
            {
                return Ok(key);
            }
        }
    }

    async fn poll_key(&mut self, accepted: &[Key], limit: Duration) -> Result<Option<Key>> {
        let deadline = Instant::now() + limit;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            // `next_line` is cancel-safe, so a timed-out read keeps its bytes.
            match timeout(remaining, self.read_key()).await {
                Err(_) => return Ok(None),
                Ok(result) => {
                    if let Some(key) = result?
                        && accepted.contains(&key)
                    {
                        return Ok(Some(key));
                    }
                }
            }
        }
    }
}
