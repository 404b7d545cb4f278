use eyre::{Result, eyre};
use tracing::{debug, info};
use url::Url;

use super::context::PlatformContext;

/// Opens an external link outside the chat session.
pub trait LinkOpener {
    fn open(&self, url: &Url) -> Result<()>;
}

/// Hands links to the system browser.
pub struct SystemBrowser {
    platform: PlatformContext,
}

impl SystemBrowser {
    pub fn new() -> Self {
        Self {
            platform: PlatformContext::new(),
        }
    }
}

impl Default for SystemBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkOpener for SystemBrowser {
    fn open(&self, url: &Url) -> Result<()> {
        debug!(os = %self.platform.os_type, %url, "Opening link in system browser");
        let status = self
            .platform
            .open_command(url.as_str())
            .status()
            .map_err(|e| eyre!("Failed to open {}: {}", url, e))?;
        if !status.success() {
            return Err(eyre!("Browser exited with {} while opening {}", status, url));
        }
        Ok(())
    }
}

/// The scheduling call-to-action. Hidden until a qualified lead is
/// detected, and once shown it stays shown for the rest of the session.
pub struct SchedulingLink {
    url: Url,
    revealed: bool,
    opener: Box<dyn LinkOpener>,
}

impl SchedulingLink {
    pub fn new(url: Url, opener: Box<dyn LinkOpener>) -> Self {
        Self {
            url,
            revealed: false,
            opener,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Returns `true` only on the hidden-to-visible transition.
    pub fn reveal(&mut self) -> bool {
        if self.is_revealed() {
            return false;
        }
        self.revealed = true;
        true
    }

    /// The click. Returns `false` without doing anything while hidden.
    pub fn activate(&self) -> Result<bool> {
        if !self.is_revealed() {
            return Ok(false);
        }
        info!(url = %self.url, "Opening scheduling link");
        self.opener.open(&self.url)?;
        Ok(true)
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Opener that remembers what it was asked to open.
    #[derive(Clone, Default)]
    pub struct RecordingOpener {
        opened: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingOpener {
        pub fn opened(&self) -> Vec<String> {
            self.opened.lock().unwrap().clone()
        }
    }

    impl LinkOpener for RecordingOpener {
        fn open(&self, url: &Url) -> Result<()> {
            self.opened.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingOpener;
    use super::*;

    fn link() -> (SchedulingLink, RecordingOpener) {
        let opener = RecordingOpener::default();
        let url = Url::parse("https://calendly.com/evangelista").unwrap();
        (SchedulingLink::new(url, Box::new(opener.clone())), opener)
    }

    #[test]
    fn reveal_happens_once() {
        let (mut link, _) = link();
        assert!(!link.is_revealed());
        assert!(link.reveal());
        assert!(!link.reveal());
        assert!(!link.reveal());
        assert!(link.is_revealed());
    }

    #[test]
    fn hidden_link_does_not_open() {
        let (link, opener) = link();
        assert!(!link.activate().unwrap());
        assert!(opener.opened().is_empty());
    }

    #[test]
    fn revealed_link_opens_each_click() {
        let (mut link, opener) = link();
        link.reveal();
        assert!(link.activate().unwrap());
        assert!(link.activate().unwrap());
        assert_eq!(
            opener.opened(),
            vec!["https://calendly.com/evangelista", "https://calendly.com/evangelista"]
        );
    }

    #[cfg(unix)]
    fn browser(program: &str) -> SystemBrowser {
        SystemBrowser {
            platform: PlatformContext {
                os_type: "linux".to_string(),
                browser: Some(program.to_string()),
            },
        }
    }

    #[cfg(unix)]
    #[test]
    fn system_browser_waits_for_the_opener() {
        let url = Url::parse("https://calendly.com/evangelista").unwrap();
        assert!(browser("true").open(&url).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn system_browser_reports_a_failed_opener() {
        let url = Url::parse("https://calendly.com/evangelista").unwrap();
        let err = browser("false").open(&url).unwrap_err();
        assert!(err.to_string().contains("Browser exited"));
    }
}
