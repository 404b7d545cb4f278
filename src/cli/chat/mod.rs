pub mod context;
pub mod conversation_state;
pub mod input_source;
pub mod prompt;
pub mod scheduling;
pub mod typewriter;
pub mod view;

use std::process::ExitCode;
use std::time::Instant;

use color_print::cstr;
use conversation_state::{ConversationState, Turn};
use eyre::Result;
use input_source::InputSource;
use prompt::generate_prompt;
use scheduling::{LinkOpener, SchedulingLink};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use typewriter::{RenderOutcome, Typewriter};
use view::{ChatView, PendingId};

use crate::config::GateConfig;
use crate::gate_client::GateClient;

/// Shown in place of any failed exchange. Technical details never reach the visitor.
pub const FALLBACK_MESSAGE: &str = "Unstable connection with the secure server. To preserve the \
integrity of the diagnosis, please proceed directly to our priority channel: board@evangelista.co";

const HELP_TEXT: &str = cstr!(
    "
<bold>Evangelista & Co. Vetting Gate</bold>

<green>/open</green>         Open the conversation panel
<green>/close</green>        Minimise the conversation panel
<green>/toggle</green>       Flip the panel between open and minimised
<green>/schedule</green>     Book a session (once the agenda is unlocked)
<green>/help</green>         Show this help dialogue
<green>/quit</green>         Leave the session
"
);

const CLOSED_HINT: &str = "The panel is minimised. Type /open to continue the conversation.";
const LOCKED_HINT: &str = "The agenda is not available yet.";

/// What a call to [`ChatContext::submit`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input, or a previous reply is still being written.
    Dropped,
    Replied,
    Fallback,
}

/// A message that is on screen and in the history but not yet sent.
struct Submission {
    text: String,
    prior: Vec<Turn>,
    pending: PendingId,
}

/// The vetting gate widget: one owned instance per session.
pub struct ChatContext {
    view: Box<dyn ChatView>,
    client: GateClient,
    typewriter: Typewriter,
    conversation_state: ConversationState,
    scheduling: SchedulingLink,
    cancel: CancellationToken,
    input: Option<String>,
    interactive: bool,
}

impl ChatContext {
    /// Build the widget on top of `view`.
    ///
    /// Returns `None` when the view has no panel to draw into; in that case
    /// nothing is wired up and nothing is drawn.
    pub fn mount(
        mut view: Box<dyn ChatView>,
        opener: Box<dyn LinkOpener>,
        config: &GateConfig,
        input: Option<String>,
        interactive: bool,
    ) -> Result<Option<Self>> {
        if !view.has_panel() {
            warn!("No chat panel available, vetting gate not mounted");
            return Ok(None);
        }

        view.set_trigger_visible(true)?;

        info!(endpoint = %config.endpoint, "Evangelista Vetting Gate: ONLINE");

        Ok(Some(Self {
            view,
            client: GateClient::new(config.endpoint.clone()),
            typewriter: Typewriter::new(config.typing_delay),
            conversation_state: ConversationState::new(),
            scheduling: SchedulingLink::new(config.scheduling_url.clone(), opener),
            cancel: CancellationToken::new(),
            input,
            interactive,
        }))
    }

    #[cfg(test)]
    pub fn state(&self) -> &ConversationState {
        &self.conversation_state
    }

    #[cfg(test)]
    pub fn scheduling(&self) -> &SchedulingLink {
        &self.scheduling
    }

    /// Parent token for every typewriter render. Cancelling it cuts the
    /// current render short and makes later ones return immediately.
    #[cfg(test)]
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn run(&mut self) -> Result<ExitCode> {
        // Handle non-interactive mode (single message)
        if let Some(input) = self.input.take() {
            self.toggle(Some(true))?;
            let outcome = self.submit(&input).await?;
            return Ok(match outcome {
                SubmitOutcome::Fallback => ExitCode::FAILURE,
                SubmitOutcome::Replied | SubmitOutcome::Dropped => ExitCode::SUCCESS,
            });
        }

        if self.interactive {
            self.run_interactive().await?;
        }

        Ok(ExitCode::SUCCESS)
    }

    async fn run_interactive(&mut self) -> Result<()> {
        let mut input = InputSource::new()?;

        // Launching the session counts as pressing the trigger.
        self.toggle(Some(true))?;

        self.run_with_input(&mut input).await
    }

    async fn run_with_input(&mut self, input: &mut InputSource) -> Result<()> {
        loop {
            let prompt_text = generate_prompt(self.conversation_state.is_open());
            let Some(line) = input.read_line(&prompt_text).await? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line == "/quit" {
                break;
            }

            let busy_since = Instant::now();
            match self.handle_input(line).await {
                Ok(Some(SubmitOutcome::Replied | SubmitOutcome::Fallback)) => {
                    // Whatever was typed while the reply was on its way is dropped.
                    input.discard_since(busy_since)?;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Failed to handle input: {:?}", e);
                    self.view.notice(&format!("Error: {}", e))?;
                }
            }
        }

        Ok(())
    }

    async fn handle_input(&mut self, input: &str) -> Result<Option<SubmitOutcome>> {
        match input {
            "/help" => self.view.notice(HELP_TEXT)?,
            "/open" => self.toggle(Some(true))?,
            "/close" => self.toggle(Some(false))?,
            "/toggle" => self.toggle(None)?,
            "/schedule" => {
                if !self.activate_call_to_action()? {
                    self.view.notice(LOCKED_HINT)?;
                }
            }
            _ => {
                if !self.conversation_state.is_open() {
                    self.view.notice(CLOSED_HINT)?;
                } else {
                    return self.submit(input).await.map(Some);
                }
            }
        }

        Ok(None)
    }

    /// Open or close the panel; `None` flips the current state.
    pub fn toggle(&mut self, force_open: Option<bool>) -> Result<()> {
        let open = force_open.unwrap_or(!self.conversation_state.is_open());
        self.conversation_state.set_open(open);
        debug!(open, "Toggling chat panel");

        self.view.set_panel_visible(open)?;
        self.view.set_trigger_visible(!open)?;
        if open {
            self.view.focus_input()?;
        }
        Ok(())
    }

    /// Send a visitor message and show the reply.
    ///
    /// Blank input and input that arrives while a reply is still being
    /// written are dropped without a trace. Failures of any kind are shown
    /// as [`FALLBACK_MESSAGE`] and never enter the history.
    pub async fn submit(&mut self, text: &str) -> Result<SubmitOutcome> {
        match self.begin_submit(text)? {
            Some(submission) => self.complete_submit(submission).await,
            None => Ok(SubmitOutcome::Dropped),
        }
    }

    /// Everything that happens before the request: the user bubble, the
    /// user turn and the pending indicator.
    fn begin_submit(&mut self, text: &str) -> Result<Option<Submission>> {
        let text = text.trim();
        if text.is_empty() || self.conversation_state.is_typing() {
            debug!(typing = self.conversation_state.is_typing(), "Dropping submission");
            return Ok(None);
        }

        // The request carries the turns that came before this message.
        let prior = self.conversation_state.history().to_vec();

        self.view.append_user_message(text)?;
        self.view.scroll_to_bottom()?;
        self.conversation_state.push_turn(Turn::user(text));

        let pending = self.view.show_pending()?;
        Ok(Some(Submission {
            text: text.to_string(),
            prior,
            pending,
        }))
    }

    async fn complete_submit(&mut self, submission: Submission) -> Result<SubmitOutcome> {
        let result = self.client.send(&submission.text, &submission.prior).await;
        self.view.remove_pending(submission.pending)?;

        match result {
            Ok(reply) => {
                self.conversation_state.push_turn(Turn::model(&reply.response));
                self.render_model_turn(&reply.response).await?;

                if let Some(audit) = reply.silent_audit {
                    if audit.unlocks_scheduling() {
                        self.unlock_scheduling(audit.score)?;
                    } else {
                        debug!(action = %audit.action, score = audit.score, "Audit signal without unlock");
                    }
                }
                Ok(SubmitOutcome::Replied)
            }
            Err(e) => {
                error!(kind = e.kind(), endpoint = %self.client.endpoint(), "Vetting gate failure: {}", e);
                self.render_model_turn(FALLBACK_MESSAGE).await?;
                Ok(SubmitOutcome::Fallback)
            }
        }
    }

    /// Write a model message through the typewriter, holding the typing
    /// flag for exactly as long as the render runs.
    pub async fn render_model_turn(&mut self, text: &str) -> Result<RenderOutcome> {
        self.conversation_state.set_typing(true);
        self.view.typing_changed(true)?;

        let render_cancel = self.cancel.child_token();
        let rendered = self
            .typewriter
            .render(self.view.as_mut(), text, &render_cancel)
            .await;

        self.conversation_state.set_typing(false);
        self.view.typing_changed(false)?;
        rendered
    }

    fn unlock_scheduling(&mut self, score: f64) -> Result<()> {
        if !self.scheduling.reveal() {
            debug!(score, "Scheduling already unlocked");
            return Ok(());
        }
        self.view.reveal_call_to_action(self.scheduling.url().as_str())?;
        info!(score, "Qualified lead (score: {}). Agenda unlocked.", score);
        Ok(())
    }

    /// The click on the scheduling call-to-action.
    pub fn activate_call_to_action(&mut self) -> Result<bool> {
        self.scheduling.activate()
    }
}
