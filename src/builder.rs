use std::path::PathBuf;

use log::debug;

use crate::browser::{ChromeLauncher, DriverLauncher};
use crate::config::{HarvestConfig, Timings};
use crate::error::ExtractError;
use crate::factory;
use crate::login::{OperatorPrompt, StdinPrompt};
use crate::model::{ExtractionRequest, RecipeDraft};
use crate::session::{SessionConfig, SessionController};

/// Builder for configuring and executing recipe extractions
#[derive(Default)]
pub struct RecipeExtractorBuilder {
    url: Option<String>,
    interactive_login: bool,
    profile_dir: Option<PathBuf>,
    headless: Option<bool>,
    config: Option<HarvestConfig>,
    timings: Option<Timings>,
    launcher: Option<Box<dyn DriverLauncher>>,
    prompt: Option<Box<dyn OperatorPrompt>>,
}

impl RecipeExtractorBuilder {
    /// Set the post or recipe page to extract
    ///
    /// # Example
    /// ```
    /// use recipe_harvest::RecipeExtractor;
    ///
    /// let builder = RecipeExtractor::builder()
    ///     .url("https://cooking.nytimes.com/recipes/1234-lemon-cake");
    /// ```
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Pause for a human to sign in instead of checking the login state
    ///
    /// The browser opens the platform home page and extraction waits on the
    /// operator prompt. Meant for non-headless runs.
    pub fn interactive_login(mut self, allow: bool) -> Self {
        self.interactive_login = allow;
        self
    }

    /// Set the persistent browser profile directory
    ///
    /// Cookies and logins are kept here between runs. Two extractions must not
    /// use the same directory at the same time.
    ///
    /// # Example
    /// ```
    /// use recipe_harvest::RecipeExtractor;
    ///
    /// let builder = RecipeExtractor::builder()
    ///     .url("https://www.instagram.com/p/abc123/")
    ///     .profile_dir("/var/lib/recipe-harvest/profile");
    /// ```
    pub fn profile_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.profile_dir = Some(dir.into());
        self
    }

    /// Run the browser without a window
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = Some(headless);
        self
    }

    /// Use a loaded configuration for profile, timing and keyword defaults
    ///
    /// Values set directly on the builder take precedence.
    ///
    /// # Example
    /// ```
    /// use recipe_harvest::{HarvestConfig, RecipeExtractor};
    ///
    /// let builder = RecipeExtractor::builder()
    ///     .url("https://www.instagram.com/p/abc123/")
    ///     .config(HarvestConfig::default());
    /// ```
    pub fn config(mut self, config: HarvestConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace every pause and wait bound of the selected platform
    ///
    /// # Example
    /// ```
    /// use recipe_harvest::{RecipeExtractor, Timings};
    ///
    /// let builder = RecipeExtractor::builder()
    ///     .url("https://www.instagram.com/p/abc123/")
    ///     .timings(Timings::immediate());
    /// ```
    pub fn timings(mut self, timings: Timings) -> Self {
        self.timings = Some(timings);
        self
    }

    /// Launch browsers with something other than local Chrome
    pub fn launcher(mut self, launcher: impl DriverLauncher + 'static) -> Self {
        self.launcher = Some(Box::new(launcher));
        self
    }

    /// Replace the terminal prompt used for interactive login
    pub fn prompt(mut self, prompt: impl OperatorPrompt + 'static) -> Self {
        self.prompt = Some(Box::new(prompt));
        self
    }

    /// Build and execute the extraction
    ///
    /// # Errors
    /// Returns `ExtractError` if:
    /// - No URL or profile directory was specified
    /// - The URL belongs to no supported platform
    /// - The browser cannot be launched or navigated
    /// - The session is not logged in (and interactive login is off)
    /// - No content could be found on the page
    ///
    /// # Example
    /// ```no_run
    /// # use recipe_harvest::RecipeExtractor;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let draft = RecipeExtractor::builder()
    ///     .url("https://cooking.nytimes.com/recipes/1234-lemon-cake")
    ///     .profile_dir("/var/lib/recipe-harvest/profile")
    ///     .build()?;
    /// println!("{}", draft.title);
    /// # Ok(())
    /// # }
    /// ```
    pub fn build(self) -> Result<RecipeDraft, ExtractError> {
        let url = self.url.ok_or_else(|| {
            ExtractError::Builder("No URL specified. Use .url()".to_string())
        })?;

        let config = self.config.unwrap_or_default();
        let profile_dir = self
            .profile_dir
            .or_else(|| config.profile_dir.clone())
            .ok_or_else(|| {
                ExtractError::Builder(
                    "No browser profile directory specified. Use .profile_dir() or set profile_dir in the config"
                        .to_string(),
                )
            })?;
        let headless = self.headless.unwrap_or(config.headless);

        // Unsupported URLs fail before any browser is launched
        let mut extractor = factory::select(&url)?;
        config.apply(extractor.profile_mut());
        if let Some(timings) = self.timings {
            extractor.profile_mut().timings = timings;
        }

        let launcher = self
            .launcher
            .unwrap_or_else(|| Box::new(ChromeLauncher));
        let prompt = self.prompt.unwrap_or_else(|| Box::new(StdinPrompt));
        let sessions = SessionController::new(
            launcher,
            SessionConfig {
                profile_dir,
                headless,
            },
        );
        debug!("Session config: {:?}", sessions.config());

        let request = ExtractionRequest::new(url).with_interactive_login(self.interactive_login);
        extractor.extract(&request, &sessions, prompt.as_ref())
    }
}

/// Main entry point for the builder API
pub struct RecipeExtractor;

impl RecipeExtractor {
    /// Creates a new builder for extracting recipes
    ///
    /// # Example
    /// ```
    /// use recipe_harvest::RecipeExtractor;
    ///
    /// let builder = RecipeExtractor::builder();
    /// ```
    pub fn builder() -> RecipeExtractorBuilder {
        RecipeExtractorBuilder::default()
    }
}
