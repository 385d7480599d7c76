use std::collections::HashMap;
use std::time::Duration;

use log::debug;
use scraper::{ElementRef, Html, Node, Selector};

use super::{BrowserDriver, DriverError, DriverLauncher, ElementSnapshot, LaunchSpec, Locator};

/// Elements that start a new line in rendered text
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li",
    "main", "nav", "ol", "p", "pre", "section", "table", "tr", "ul",
];

/// Elements whose contents never render as text
const HIDDEN_TAGS: &[&str] = &["head", "noscript", "script", "style", "template"];

const HEADING_SELECTOR: &str = "h2, h3, h4, h5";

/// A browser stand-in over saved HTML pages.
///
/// Navigation looks pages up by exact URL. Rendering is static, so waits
/// resolve immediately. Useful for replaying a captured page offline.
#[derive(Debug, Default)]
pub struct SnapshotDriver {
    pages: HashMap<String, String>,
    current: Option<(String, Html)>,
    closed: bool,
}

impl SnapshotDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    fn document(&self) -> Result<&Html, DriverError> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        self.current
            .as_ref()
            .map(|(_, document)| document)
            .ok_or_else(|| DriverError::Protocol("no page loaded".to_string()))
    }
}

impl BrowserDriver for SnapshotDriver {
    fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        let html = self
            .pages
            .get(url)
            .ok_or_else(|| DriverError::Navigation {
                url: url.to_string(),
                reason: "page not in snapshot".to_string(),
            })?;
        self.current = Some((html.clone(), Html::parse_document(html)));
        Ok(())
    }

    fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementSnapshot>, DriverError> {
        let document = self.document()?;
        match locator {
            Locator::Css(selector) => {
                let selector = parse_selector(selector)?;
                Ok(document.select(&selector).map(snapshot).collect())
            }
            Locator::UnderHeading {
                heading_text,
                item_tag,
            } => {
                let headings = parse_selector(HEADING_SELECTOR)?;
                let needle = heading_text.to_lowercase();
                let section = document
                    .select(&headings)
                    .find(|heading| render_text(*heading).to_lowercase().contains(&needle))
                    .and_then(|heading| heading.parent())
                    .and_then(ElementRef::wrap)
                    .ok_or_else(|| DriverError::NotFound(locator.to_string()))?;

                let items = parse_selector(item_tag)?;
                Ok(section.select(&items).map(snapshot).collect())
            }
        }
    }

    fn wait_for(&self, locator: &Locator, _timeout: Duration) -> Result<bool, DriverError> {
        match self.find_elements(locator) {
            Ok(elements) => Ok(!elements.is_empty()),
            Err(DriverError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn page_source(&self) -> Result<String, DriverError> {
        self.document()?;
        Ok(self
            .current
            .as_ref()
            .map(|(source, _)| source.clone())
            .unwrap_or_default())
    }

    fn execute_script(&mut self, script: &str) -> Result<(), DriverError> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        debug!("Snapshot driver ignoring script ({} bytes)", script.len());
        Ok(())
    }

    fn quit(&mut self) -> Result<(), DriverError> {
        self.closed = true;
        self.current = None;
        Ok(())
    }
}

/// Launches a fresh [`SnapshotDriver`] over the same page set each time.
#[derive(Debug, Clone, Default)]
pub struct SnapshotLauncher {
    pages: HashMap<String, String>,
}

impl SnapshotLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    /// A driver over this launcher's pages, without going through a launch spec.
    pub fn driver(&self) -> SnapshotDriver {
        SnapshotDriver {
            pages: self.pages.clone(),
            ..SnapshotDriver::default()
        }
    }
}

impl DriverLauncher for SnapshotLauncher {
    fn launch(&self, spec: &LaunchSpec<'_>) -> Result<Box<dyn BrowserDriver>, DriverError> {
        debug!(
            "Opening snapshot session (profile {})",
            spec.profile_dir.display()
        );
        Ok(Box::new(self.driver()))
    }
}

fn parse_selector(selector: &str) -> Result<Selector, DriverError> {
    Selector::parse(selector)
        .map_err(|e| DriverError::Protocol(format!("invalid selector `{selector}`: {e:?}")))
}

fn snapshot(element: ElementRef<'_>) -> ElementSnapshot {
    ElementSnapshot {
        tag: element.value().name().to_string(),
        text: render_text(element),
        attributes: element
            .value()
            .attrs()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
    }
}

/// Approximates `innerText`: whitespace collapsed, block elements and `<br>`
/// on their own lines, blank lines dropped.
fn render_text(element: ElementRef<'_>) -> String {
    let mut rendered = String::new();
    push_text(element, &mut rendered);
    rendered
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => push_collapsed(text, out),
            Node::Element(el) => {
                let name = el.name();
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                if HIDDEN_TAGS.contains(&name) {
                    continue;
                }
                if let Some(child_element) = ElementRef::wrap(child) {
                    let block = BLOCK_TAGS.contains(&name);
                    if block {
                        out.push('\n');
                    }
                    push_text(child_element, out);
                    if block {
                        out.push('\n');
                    }
                }
            }
            _ => {}
        }
    }
}

fn push_collapsed(text: &str, out: &mut String) {
    if text.starts_with(char::is_whitespace) && !out.ends_with(char::is_whitespace) {
        out.push(' ');
    }
    let mut words = text.split_whitespace().peekable();
    while let Some(word) = words.next() {
        out.push_str(word);
        if words.peek().is_some() {
            out.push(' ');
        }
    }
    if text.ends_with(char::is_whitespace) && !text.trim().is_empty() {
        out.push(' ');
    }
}
