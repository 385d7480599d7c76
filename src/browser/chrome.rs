use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use log::{debug, info};

use super::{
    poll_until_present, BrowserDriver, DriverError, DriverLauncher, ElementSnapshot, LaunchSpec,
    Locator,
};

/// Chrome adds this by default; it shows the automation infobar and sets
/// `navigator.webdriver`
const AUTOMATION_SWITCH: &str = "--enable-automation";

/// Launches a local Chrome/Chromium through the DevTools protocol.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeLauncher;

impl DriverLauncher for ChromeLauncher {
    fn launch(&self, spec: &LaunchSpec<'_>) -> Result<Box<dyn BrowserDriver>, DriverError> {
        Ok(Box::new(ChromeDriver::launch(spec)?))
    }
}

pub struct ChromeDriver {
    browser: Option<Browser>,
    tab: Option<Arc<Tab>>,
}

impl ChromeDriver {
    pub fn launch(spec: &LaunchSpec<'_>) -> Result<Self, DriverError> {
        info!(
            "Starting Chrome with profile at {}",
            spec.profile_dir.display()
        );

        let options = launch_options(spec)?;
        let browser = Browser::new(options).map_err(|e| DriverError::Launch(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        if let Some(user_agent) = spec.user_agent {
            tab.set_user_agent(user_agent, None, None)
                .map_err(|e| DriverError::Launch(e.to_string()))?;
        }

        Ok(Self {
            browser: Some(browser),
            tab: Some(tab),
        })
    }

    fn tab(&self) -> Result<&Arc<Tab>, DriverError> {
        self.tab.as_ref().ok_or(DriverError::Closed)
    }
}

fn launch_options<'a>(spec: &LaunchSpec<'a>) -> Result<LaunchOptions<'a>, DriverError> {
    let args: Vec<&OsStr> = spec.args.iter().map(|arg| OsStr::new(arg)).collect();
    LaunchOptions::default_builder()
        .headless(spec.headless)
        .sandbox(false)
        .user_data_dir(Some(spec.profile_dir.to_path_buf()))
        .idle_browser_timeout(spec.idle_timeout)
        .args(args)
        .ignore_default_args(vec![OsStr::new(AUTOMATION_SWITCH)])
        .build()
        .map_err(|e| DriverError::Launch(e.to_string()))
}

/// headless_chrome reports a missing element and a dead connection the same
/// way, so a failed lookup is followed by a trivial evaluation.
fn is_alive(tab: &Tab) -> bool {
    tab.evaluate("1", false).is_ok()
}

impl BrowserDriver for ChromeDriver {
    fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        debug!("Navigating to {}", url);
        self.tab()?
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map(|_| ())
            .map_err(|e| DriverError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementSnapshot>, DriverError> {
        let tab = self.tab()?;
        let found = match locator {
            Locator::Css(selector) => tab.find_elements(selector),
            Locator::UnderHeading {
                heading_text,
                item_tag,
            } => tab.find_elements_by_xpath(&heading_xpath(heading_text, item_tag)),
        };

        let elements = found.map_err(|e| {
            if is_alive(tab) {
                DriverError::NotFound(locator.to_string())
            } else {
                DriverError::Disconnected(e.to_string())
            }
        })?;
        Ok(elements.iter().map(snapshot).collect())
    }

    fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<bool, DriverError> {
        let Locator::Css(selector) = locator else {
            return poll_until_present(self, locator, timeout);
        };
        let tab = self.tab()?;
        match tab.wait_for_element_with_custom_timeout(selector, timeout) {
            Ok(_) => Ok(true),
            Err(_) if is_alive(tab) => Ok(false),
            Err(e) => Err(DriverError::Disconnected(e.to_string())),
        }
    }

    fn page_source(&self) -> Result<String, DriverError> {
        let tab = self.tab()?;
        tab.get_content().map_err(|e| {
            if is_alive(tab) {
                DriverError::Protocol(e.to_string())
            } else {
                DriverError::Disconnected(e.to_string())
            }
        })
    }

    fn execute_script(&mut self, script: &str) -> Result<(), DriverError> {
        let tab = self.tab()?;

        // Register for every future document, then apply to the current one
        tab.call_method(Page::AddScriptToEvaluateOnNewDocument {
            source: script.to_string(),
            world_name: None,
            include_command_line_api: None,
            run_immediately: None,
        })
        .map_err(|e| DriverError::Script(e.to_string()))?;
        tab.evaluate(script, false)
            .map_err(|e| DriverError::Script(e.to_string()))?;
        Ok(())
    }

    fn quit(&mut self) -> Result<(), DriverError> {
        self.tab.take();
        // Dropping the Browser kills the Chrome process
        if self.browser.take().is_some() {
            debug!("Chrome process released");
        }
        Ok(())
    }
}

fn snapshot(element: &Element<'_>) -> ElementSnapshot {
    let attributes = element
        .attributes
        .as_ref()
        .map(|flat| {
            flat.chunks(2)
                .filter_map(|pair| match pair {
                    [name, value] => Some((name.clone(), value.clone())),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    ElementSnapshot {
        tag: element.tag_name.to_lowercase(),
        text: element.get_inner_text().unwrap_or_default(),
        attributes,
    }
}

fn heading_xpath(heading_text: &str, item_tag: &str) -> String {
    let needle: String = heading_text
        .to_lowercase()
        .chars()
        .filter(|c| *c != '\'')
        .collect();
    format!(
        "(//h2|//h3|//h4|//h5)[contains(translate(., 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', \
         'abcdefghijklmnopqrstuvwxyz'), '{needle}')][1]/..//{item_tag}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn spec(args: &[String]) -> LaunchSpec<'_> {
        LaunchSpec {
            profile_dir: Path::new("/tmp/recipe-harvest-profile"),
            headless: true,
            args,
            user_agent: None,
            idle_timeout: Duration::from_secs(1_800),
        }
    }

    #[test]
    fn test_launch_options_drop_automation_switch() {
        let args = vec!["--disable-extensions".to_string()];
        let options = launch_options(&spec(&args)).unwrap();

        assert!(options
            .ignore_default_args
            .contains(&OsStr::new("--enable-automation")));
        assert!(options.args.contains(&OsStr::new("--disable-extensions")));
        assert!(options.headless);
    }

    #[test]
    fn test_launch_options_use_session_idle_timeout() {
        let args = Vec::new();
        let options = launch_options(&spec(&args)).unwrap();
        assert_eq!(options.idle_browser_timeout, Duration::from_secs(1_800));
        assert_eq!(
            options.user_data_dir.as_deref(),
            Some(Path::new("/tmp/recipe-harvest-profile"))
        );
    }

    #[test]
    fn test_heading_xpath_targets_first_matching_heading() {
        let xpath = heading_xpath("Ingredients", "li");
        assert!(xpath.starts_with("(//h2|//h3|//h4|//h5)"));
        assert!(xpath.contains("'ingredients')][1]/..//li"));
    }

    #[test]
    fn test_heading_xpath_drops_quotes() {
        let xpath = heading_xpath("Cook's notes", "p");
        assert!(xpath.contains("'cooks notes'"));
    }
}
