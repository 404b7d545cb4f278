use std::io::Write;

use crossterm::cursor::{Hide, MoveToColumn, Show};
use crossterm::queue;
use crossterm::style::{Print, PrintStyledContent, Stylize};
use crossterm::terminal::{Clear, ClearType};
use eyre::Result;

const USER_LABEL: &str = "YOU";
const MODEL_LABEL: &str = "DIGITAL PARTNER";

/// Handle for a pending indicator, so the exact one that was shown gets removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingId(u64);

/// Everything the chat widget needs from the surface it draws on.
///
/// The widget never touches the terminal directly; it only speaks to this
/// trait, which keeps the interaction logic testable without a TTY.
pub trait ChatView {
    /// Whether the panel container exists. Without one the widget does nothing.
    fn has_panel(&self) -> bool {
        true
    }

    fn set_panel_visible(&mut self, visible: bool) -> Result<()>;

    fn set_trigger_visible(&mut self, visible: bool) -> Result<()>;

    fn focus_input(&mut self) -> Result<()>;

    fn append_user_message(&mut self, text: &str) -> Result<()>;

    fn begin_model_message(&mut self) -> Result<()>;

    fn push_model_char(&mut self, c: char) -> Result<()>;

    fn end_model_message(&mut self) -> Result<()>;

    fn scroll_to_bottom(&mut self) -> Result<()>;

    fn typing_changed(&mut self, _typing: bool) -> Result<()> {
        Ok(())
    }

    fn show_pending(&mut self) -> Result<PendingId>;

    fn remove_pending(&mut self, id: PendingId) -> Result<()>;

    fn reveal_call_to_action(&mut self, url: &str) -> Result<()>;

    /// Out-of-band text from the shell itself (help, hints).
    fn notice(&mut self, text: &str) -> Result<()>;
}

pub struct TerminalView {
    output: Box<dyn Write>,
    trigger_visible: bool,
    next_pending: u64,
    pending: Option<PendingId>,
}

impl TerminalView {
    pub fn new(output: Box<dyn Write>) -> Self {
        Self {
            output,
            trigger_visible: false,
            next_pending: 0,
            pending: None,
        }
    }
}

impl ChatView for TerminalView {
    fn set_panel_visible(&mut self, visible: bool) -> Result<()> {
        if visible {
            queue!(
                self.output,
                Print("\n"),
                PrintStyledContent("━━ EVANGELISTA & CO. · VETTING GATE ━━".bold()),
                Print("\n")
            )?;
        } else {
            queue!(
                self.output,
                PrintStyledContent("━━ session minimised ━━".dark_grey()),
                Print("\n")
            )?;
        }
        self.output.flush()?;
        Ok(())
    }

    fn set_trigger_visible(&mut self, visible: bool) -> Result<()> {
        if visible && !self.trigger_visible {
            queue!(
                self.output,
                PrintStyledContent("  ▸ /open to speak with a digital partner".dark_grey()),
                Print("\n")
            )?;
            self.output.flush()?;
        }
        self.trigger_visible = visible;
        Ok(())
    }

    fn focus_input(&mut self) -> Result<()> {
        // The line editor owns the input; all that is left is making sure
        // the log is fully drawn before its prompt appears.
        self.output.flush()?;
        Ok(())
    }

    fn append_user_message(&mut self, text: &str) -> Result<()> {
        queue!(
            self.output,
            PrintStyledContent(USER_LABEL.dark_grey()),
            Print("\n"),
            PrintStyledContent(text.white()),
            Print("\n\n")
        )?;
        Ok(())
    }

    fn begin_model_message(&mut self) -> Result<()> {
        queue!(
            self.output,
            PrintStyledContent(MODEL_LABEL.dark_green()),
            Print("\n")
        )?;
        Ok(())
    }

    fn push_model_char(&mut self, c: char) -> Result<()> {
        queue!(self.output, Print(c))?;
        Ok(())
    }

    fn end_model_message(&mut self) -> Result<()> {
        queue!(self.output, Print("\n\n"))?;
        self.output.flush()?;
        Ok(())
    }

    fn scroll_to_bottom(&mut self) -> Result<()> {
        // The terminal follows the cursor on its own once the bytes are out.
        self.output.flush()?;
        Ok(())
    }

    fn typing_changed(&mut self, typing: bool) -> Result<()> {
        if typing {
            queue!(self.output, Hide)?;
        } else {
            queue!(self.output, Show)?;
        }
        self.output.flush()?;
        Ok(())
    }

    fn show_pending(&mut self) -> Result<PendingId> {
        let id = PendingId(self.next_pending);
        self.next_pending += 1;
        queue!(self.output, PrintStyledContent("· · ·".dark_green().dim()))?;
        self.output.flush()?;
        self.pending = Some(id);
        Ok(id)
    }

    fn remove_pending(&mut self, id: PendingId) -> Result<()> {
        if self.pending != Some(id) {
            return Ok(());
        }
        queue!(self.output, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        self.output.flush()?;
        self.pending = None;
        Ok(())
    }

    fn reveal_call_to_action(&mut self, url: &str) -> Result<()> {
        queue!(
            self.output,
            PrintStyledContent("▌ Agenda unlocked. ".black().on_dark_green()),
            PrintStyledContent("Type /schedule to book a session".black().on_dark_green()),
            Print("\n"),
            PrintStyledContent(format!("  {url}").dark_grey()),
            Print("\n\n")
        )?;
        self.output.flush()?;
        Ok(())
    }

    fn notice(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{}", text)?;
        self.output.flush()?;
        Ok(())
    }
}
