use log::{debug, info};

use crate::browser::{BrowserDriver, DriverError};
use crate::classifier::classify;
use crate::error::ExtractError;
use crate::locator::{locate, Located};
use crate::login::{self, OperatorPrompt};
use crate::model::{ExtractionRequest, RawCapture, RecipeDraft};
use crate::platform::{FieldChain, PlatformProfile, SourcePlatform, Strategy};
use crate::session::{pause, SessionController};

mod caption;
mod sections;

/// Extraction for one source platform, driven entirely by its profile tables.
#[derive(Debug, Clone)]
pub struct PlatformExtractor {
    profile: PlatformProfile,
}

impl PlatformExtractor {
    pub fn new(platform: SourcePlatform) -> Self {
        Self::with_profile(platform.profile())
    }

    pub fn with_profile(profile: PlatformProfile) -> Self {
        Self { profile }
    }

    pub fn platform(&self) -> SourcePlatform {
        self.profile.platform
    }

    pub fn profile(&self) -> &PlatformProfile {
        &self.profile
    }

    pub fn profile_mut(&mut self) -> &mut PlatformProfile {
        &mut self.profile
    }

    /// Run one extraction in a fresh browser session.
    ///
    /// The session is released before returning, whatever the outcome.
    pub fn extract(
        &self,
        request: &ExtractionRequest,
        sessions: &SessionController,
        prompt: &dyn OperatorPrompt,
    ) -> Result<RecipeDraft, ExtractError> {
        info!("Using {} extractor for {}", self.platform(), request.url);

        let mut session = sessions.acquire(&self.profile)?;
        let capture = session
            .driver_mut()
            .and_then(|driver| self.capture(driver, request, prompt));
        session.release();

        let draft = self.assemble(capture?);
        debug!(
            "Extracted {:?} with {} ingredients and {} steps",
            draft.title,
            draft.ingredients.len(),
            draft.steps.len()
        );
        Ok(draft)
    }

    fn capture(
        &self,
        driver: &mut dyn BrowserDriver,
        request: &ExtractionRequest,
        prompt: &dyn OperatorPrompt,
    ) -> Result<RawCapture, ExtractError> {
        self.authorize(driver, request, prompt)?;
        match self.profile.strategy() {
            Strategy::Caption => caption::capture(driver, &self.profile, &request.url),
            Strategy::Sections => sections::capture(driver, &self.profile, &request.url),
        }
    }

    /// Gate extraction on login state, or hand over to the operator.
    fn authorize(
        &self,
        driver: &mut dyn BrowserDriver,
        request: &ExtractionRequest,
        prompt: &dyn OperatorPrompt,
    ) -> Result<(), ExtractError> {
        let probes = &self.profile.probes;
        if request.allow_interactive_login {
            info!("Interactive login requested for {}", self.platform());
            driver.navigate(&probes.home_url)?;
            pause(self.profile.timings.operator_settle());
            return prompt.wait_for_login(self.platform(), &probes.home_url);
        }

        let state = login::check(driver, &self.profile)?;
        if state.permits_extraction() {
            Ok(())
        } else {
            Err(ExtractError::LoginRequired {
                platform: self.platform(),
                state,
            })
        }
    }

    /// Merge located fields with classifier output into the final draft.
    ///
    /// Located values win. The classifier fills the title when none was
    /// located, and both lists when neither was.
    pub fn assemble(&self, capture: RawCapture) -> RecipeDraft {
        let RawCapture {
            image_url,
            raw_text,
            located,
        } = capture;

        let lists_located = located.ingredients.is_some() || located.steps.is_some();
        let classified = if located.title.is_none() || !lists_located {
            classify(&raw_text, &self.profile.rules)
        } else {
            Default::default()
        };

        let (ingredients, steps) = if lists_located {
            (
                located.ingredients.unwrap_or_default(),
                located.steps.unwrap_or_default(),
            )
        } else {
            (classified.ingredients, classified.steps)
        };

        RecipeDraft {
            title: located.title.unwrap_or(classified.title),
            description: located.description.unwrap_or_default(),
            image_url: image_url.unwrap_or_default(),
            ingredients,
            steps,
            raw_text,
        }
    }
}

/// Wait for the first content region that appears.
fn find_content_region(
    driver: &dyn BrowserDriver,
    profile: &PlatformProfile,
) -> Result<bool, DriverError> {
    for region in &profile.content_regions {
        debug!("Waiting for content region {}", region);
        match driver.wait_for(region, profile.timings.content_timeout()) {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(err) if err.is_session_lost() => return Err(err),
            Err(err) => debug!("Content region {} failed: {}", region, err),
        }
    }
    Ok(false)
}

fn locate_field(
    driver: &dyn BrowserDriver,
    field: &FieldChain,
) -> Result<Option<Located>, DriverError> {
    locate(driver, &field.chain, field.min_length)
}

/// First raw-text source that yields anything.
fn locate_raw_text(
    driver: &dyn BrowserDriver,
    profile: &PlatformProfile,
) -> Result<Option<String>, DriverError> {
    for field in &profile.raw_text {
        if let Some(located) = locate_field(driver, field)? {
            return Ok(Some(located.joined("\n\n")));
        }
    }
    Ok(None)
}
