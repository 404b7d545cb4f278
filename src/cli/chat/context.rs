use std::env;
use std::process::{Command, Stdio};

/// Knows how to hand a URL to the desktop on the current platform.
pub struct PlatformContext {
    pub os_type: String,
    /// Program from `$BROWSER`, used instead of the platform opener.
    pub browser: Option<String>,
}

impl PlatformContext {
    pub fn new() -> Self {
        let os_type = if cfg!(target_os = "windows") {
            "windows".to_string()
        } else if cfg!(target_os = "macos") {
            "macos".to_string()
        } else if cfg!(target_os = "linux") {
            "linux".to_string()
        } else {
            "unknown".to_string()
        };

        let browser = env::var("BROWSER").ok().filter(|b| !b.trim().is_empty());

        Self { os_type, browser }
    }

    /// Command that opens `target` in a new browser context.
    pub fn open_command(&self, target: &str) -> Command {
        let mut command = match (self.browser.as_deref(), self.os_type.as_str()) {
            (Some(browser), _) => {
                let mut command = Command::new(browser.trim());
                command.arg(target);
                command
            }
            (None, "windows") => {
                let mut command = Command::new("cmd");
                // The empty string is the window title `start` expects first.
                command.args(["/C", "start", ""]).arg(target);
                command
            }
            (None, "macos") => {
                let mut command = Command::new("open");
                command.arg(target);
                command
            }
            (None, _) => {
                let mut command = Command::new("xdg-open");
                command.arg(target);
                command
            }
        };
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        command
    }
}

impl Default for PlatformContext {
    fn default() -> Self {
        Self::new()
    }
}
