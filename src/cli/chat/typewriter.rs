use std::time::Duration;

use eyre::Result;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::view::ChatView;

/// Per-character delay used when nothing else is configured.
pub const DEFAULT_TYPING_DELAY: Duration = Duration::from_millis(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Completed,
    Cancelled,
}

/// Reveals a model message one character per tick.
///
/// Each call to [`Typewriter::render`] is one timed-repeat task. It stops
/// early only when its cancellation token fires; the message is still
/// closed off in the view so the log stays well formed.
#[derive(Debug, Clone)]
pub struct Typewriter {
    delay: Duration,
}

impl Typewriter {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub async fn render(
        &self,
        view: &mut dyn ChatView,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<RenderOutcome> {
        view.begin_model_message()?;
        view.scroll_to_bottom()?;

        let outcome = if self.delay.is_zero() {
            Self::render_immediately(view, text, cancel)?
        } else {
            self.render_ticking(view, text, cancel).await?
        };

        view.end_model_message()?;
        debug!(chars = text.chars().count(), ?outcome, "Typewriter render finished");
        Ok(outcome)
    }

    fn render_immediately(
        view: &mut dyn ChatView,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<RenderOutcome> {
        for c in text.chars() {
            if cancel.is_cancelled() {
                return Ok(RenderOutcome::Cancelled);
            }
            view.push_model_char(c)?;
            view.scroll_to_bottom()?;
        }
        Ok(RenderOutcome::Completed)
    }

    async fn render_ticking(
        &self,
        view: &mut dyn ChatView,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<RenderOutcome> {
        let mut ticker = time::interval(self.delay);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; characters start one delay in.
        ticker.tick().await;

        for c in text.chars() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(RenderOutcome::Cancelled),
                _ = ticker.tick() => {}
            }
            view.push_model_char(c)?;
            view.scroll_to_bottom()?;
        }
        Ok(RenderOutcome::Completed)
    }
}

impl Default for Typewriter {
    fn default() -> Self {
        Self::new(DEFAULT_TYPING_DELAY)
    }
}
