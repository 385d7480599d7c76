//! The browser capability set the extraction engine depends on.
//!
//! Extractors never talk to a specific automation engine. They navigate, query
//! elements through declarative [`Locator`]s, wait with bounded timeouts, read
//! the page source and run scripts, all through [`BrowserDriver`]. The live
//! implementation is [`ChromeDriver`]; [`SnapshotDriver`] serves static HTML.

mod chrome;
mod snapshot;

pub use chrome::{ChromeDriver, ChromeLauncher};
pub use snapshot::{SnapshotDriver, SnapshotLauncher};

use std::fmt;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Interval between presence checks in [`poll_until_present`]
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("no element matches {0}")]
    NotFound(String),

    #[error("script execution failed: {0}")]
    Script(String),

    #[error("browser session is closed")]
    Closed,

    #[error("browser connection lost: {0}")]
    Disconnected(String),

    #[error("{0}")]
    Protocol(String),
}

impl DriverError {
    /// The browser is gone and every later call will fail too.
    pub fn is_session_lost(&self) -> bool {
        matches!(self, DriverError::Closed | DriverError::Disconnected(_))
    }
}

/// A declarative element query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// Plain CSS selector
    Css(String),
    /// `item_tag` elements inside the parent of the first h2-h5 heading whose
    /// text contains `heading_text` (case-insensitive)
    UnderHeading {
        heading_text: String,
        item_tag: String,
    },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn under_heading(heading_text: impl Into<String>, item_tag: impl Into<String>) -> Self {
        Locator::UnderHeading {
            heading_text: heading_text.into(),
            item_tag: item_tag.into(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "`{selector}`"),
            Locator::UnderHeading {
                heading_text,
                item_tag,
            } => write!(f, "<{item_tag}> under heading \"{heading_text}\""),
        }
    }
}

/// The parts of a matched element the engine reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementSnapshot {
    pub tag: String,
    /// Rendered text, as the browser would report it
    pub text: String,
    pub attributes: Vec<(String, String)>,
}

impl ElementSnapshot {
    pub fn new(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: text.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// One live browser context. A driver services a single extraction at a time.
pub trait BrowserDriver {
    fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    /// All elements matching `locator`, in document order.
    fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementSnapshot>, DriverError>;

    /// Wait until `locator` matches something, giving up after `timeout`.
    ///
    /// Returns `Ok(false)` on timeout; errors are reserved for a broken session.
    fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<bool, DriverError> {
        poll_until_present(self, locator, timeout)
    }

    fn page_source(&self) -> Result<String, DriverError>;

    fn execute_script(&mut self, script: &str) -> Result<(), DriverError>;

    /// Tear the browser down. Calling it twice must be harmless.
    fn quit(&mut self) -> Result<(), DriverError>;
}

/// Bounded polling wait built on [`BrowserDriver::find_elements`].
pub fn poll_until_present<D>(
    driver: &D,
    locator: &Locator,
    timeout: Duration,
) -> Result<bool, DriverError>
where
    D: BrowserDriver + ?Sized,
{
    let started = Instant::now();
    loop {
        match driver.find_elements(locator) {
            Ok(elements) if !elements.is_empty() => return Ok(true),
            Ok(_) | Err(DriverError::NotFound(_)) => {}
            Err(err) if err.is_session_lost() => return Err(err),
            Err(err) => log::debug!("Waiting for {}: {}", locator, err),
        }

        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return Ok(false);
        }
        thread::sleep(POLL_INTERVAL.min(timeout - elapsed));
    }
}

/// How to start a browser for one session.
#[derive(Debug, Clone)]
pub struct LaunchSpec<'a> {
    /// Persistent browser data directory; cookies and logins live here
    pub profile_dir: &'a Path,
    pub headless: bool,
    pub args: &'a [String],
    pub user_agent: Option<&'a str>,
    /// How long the browser may sit without protocol traffic, such as while
    /// an operator signs in, before the connection is dropped
    pub idle_timeout: Duration,
}

/// Starts browser processes. One call, one new browser.
pub trait DriverLauncher {
    fn launch(&self, spec: &LaunchSpec<'_>) -> Result<Box<dyn BrowserDriver>, DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_lookup_is_case_insensitive() {
        let element = ElementSnapshot::new("img", "").with_attribute("SRC", "a.jpg");
        assert_eq!(element.attribute("src"), Some("a.jpg"));
        assert_eq!(element.attribute("alt"), None);
    }

    #[test]
    fn test_locator_display() {
        assert_eq!(Locator::css("main").to_string(), "`main`");
        assert_eq!(
            Locator::under_heading("Ingredients", "li").to_string(),
            "<li> under heading \"Ingredients\""
        );
    }

    #[test]
    fn test_session_lost_errors() {
        assert!(DriverError::Closed.is_session_lost());
        assert!(DriverError::Disconnected("websocket closed".to_string()).is_session_lost());
        assert!(!DriverError::NotFound("`main`".to_string()).is_session_lost());
        assert!(!DriverError::Protocol("bad selector".to_string()).is_session_lost());
    }

    #[test]
    fn test_poll_stops_when_session_is_lost() {
        let mut driver = SnapshotDriver::new().with_page("https://a.test/", "<p>hi</p>");
        driver.navigate("https://a.test/").unwrap();
        driver.quit().unwrap();

        let result = poll_until_present(&driver, &Locator::css("p"), Duration::from_secs(5));
        assert!(matches!(result, Err(DriverError::Closed)));
    }

    #[test]
    fn test_poll_gives_up_after_timeout() {
        let mut driver = SnapshotDriver::new().with_page("https://a.test/", "<p>hi</p>");
        driver.navigate("https://a.test/").unwrap();

        let found = poll_until_present(&driver, &Locator::css("article"), Duration::ZERO).unwrap();
        assert!(!found);
        let found = poll_until_present(&driver, &Locator::css("p"), Duration::ZERO).unwrap();
        assert!(found);
    }
}
