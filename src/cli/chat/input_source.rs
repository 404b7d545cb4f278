use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event};
use crossterm::terminal;
use crossterm::tty::IsTty;
use eyre::{Result, eyre};
use rustyline::Editor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tracing::debug;

use super::prompt;

struct StampedLine {
    arrived: Instant,
    text: String,
}

enum Inner {
    /// Interactive terminal, read through the line editor.
    Editor(Editor<()>),
    /// Piped input, read on its own thread so every line carries the
    /// moment it arrived.
    Lines {
        rx: mpsc::UnboundedReceiver<StampedLine>,
        held: VecDeque<StampedLine>,
    },
}

/// Where the shell gets its lines from.
pub struct InputSource(Inner);

impl InputSource {
    pub fn new() -> Result<Self> {
        if io::stdin().is_tty() {
            Ok(Self(Inner::Editor(prompt::rl()?)))
        } else {
            Ok(Self::from_reader(BufReader::new(io::stdin())))
        }
    }

    pub fn from_reader<R>(reader: R) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        thread::spawn(move || {
            for line in reader.lines() {
                let Ok(text) = line else { break };
                let stamped = StampedLine {
                    arrived: Instant::now(),
                    text,
                };
                if tx.send(stamped).is_err() {
                    break;
                }
            }
        });
        Self::from_channel(rx)
    }

    fn from_channel(rx: mpsc::UnboundedReceiver<StampedLine>) -> Self {
        Self(Inner::Lines {
            rx,
            held: VecDeque::new(),
        })
    }

    /// Next line, or `None` once input is over (EOF, Ctrl-C, Ctrl-D).
    pub async fn read_line(&mut self, prompt_text: &str) -> Result<Option<String>> {
        match &mut self.0 {
            Inner::Editor(rl) => match rl.readline(prompt_text) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str());
                    }
                    Ok(Some(line))
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
                Err(e) => Err(eyre!("Failed to read input: {}", e)),
            },
            Inner::Lines { rx, held } => {
                if let Some(line) = held.pop_front() {
                    return Ok(Some(line.text));
                }
                Ok(rx.recv().await.map(|line| line.text))
            }
        }
    }

    /// Throw away input that arrived after `since`, returning how much was dropped.
    ///
    /// On a terminal there is no arrival time to go by, so everything still
    /// buffered is discarded.
    pub fn discard_since(&mut self, since: Instant) -> Result<usize> {
        match &mut self.0 {
            Inner::Editor(_) => drain_terminal(),
            Inner::Lines { rx, held } => {
                while let Ok(line) = rx.try_recv() {
                    held.push_back(line);
                }
                let before = held.len();
                held.retain(|line| line.arrived <= since);
                let dropped = before - held.len();
                if dropped > 0 {
                    debug!(dropped, "Discarded lines that arrived while busy");
                }
                Ok(dropped)
            }
        }
    }
}

fn drain_terminal() -> Result<usize> {
    // Raw mode makes a half-typed line readable as key events.
    terminal::enable_raw_mode()?;
    let drained = drain_events();
    terminal::disable_raw_mode()?;
    let dropped = drained?;
    if dropped > 0 {
        debug!(dropped, "Discarded keystrokes typed while busy");
    }
    Ok(dropped)
}

fn drain_events() -> io::Result<usize> {
    let mut dropped = 0;
    while event::poll(Duration::ZERO)? {
        if let Event::Key(_) = event::read()? {
            dropped += 1;
        }
    }
    Ok(dropped)
}


#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::testing::channel;
    use super::*;

    #[tokio::test]
    async fn reads_piped_lines_until_eof() {
        let mut input = InputSource::from_reader(Cursor::new("Hello\n/help\n"));

        assert_eq!(input.read_line("› ").await.unwrap().as_deref(), Some("Hello"));
        assert_eq!(input.read_line("› ").await.unwrap().as_deref(), Some("/help"));
        assert_eq!(input.read_line("› ").await.unwrap(), None);
    }

    #[tokio::test]
    async fn discards_only_lines_newer_than_the_cutoff() {
        let (feed, mut input) = channel();
        feed.send("queued before");
        let cutoff = Instant::now();
        std::thread::sleep(Duration::from_millis(5));
        feed.send("typed while busy");
        feed.send("also typed while busy");

        assert_eq!(input.discard_since(cutoff).unwrap(), 2);

        assert_eq!(
            input.read_line("› ").await.unwrap().as_deref(),
            Some("queued before")
        );
        drop(feed);
        assert_eq!(input.read_line("› ").await.unwrap(), None);
    }

    #[tokio::test]
    async fn nothing_to_discard_is_not_an_error() {
        let (_feed, mut input) = channel();
        assert_eq!(input.discard_since(Instant::now()).unwrap(), 0);
    }
}
