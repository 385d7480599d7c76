//! Login and bot-block detection for a live session.

use std::io::{self, BufRead, Write};

use log::{debug, info, warn};

use crate::browser::{BrowserDriver, DriverError};
use crate::config::Timings;
use crate::error::ExtractError;
use crate::model::SessionState;
use crate::platform::{LoginProbes, PlatformProfile, SourcePlatform};
use crate::session::pause;

/// Classify the session's login state from the platform home page.
///
/// Positive probes run first, each a bounded wait. Then block phrases and
/// login-form elements are checked on the home page and, if the platform has
/// one, on a recheck page. When nothing resolves the state is
/// [`SessionState::Unknown`], which callers let through. A probe that fails
/// because the browser is gone ends the check with an error.
pub fn check(
    driver: &mut dyn BrowserDriver,
    profile: &PlatformProfile,
) -> Result<SessionState, ExtractError> {
    let probes = &profile.probes;
    let timings = &profile.timings;

    info!("Checking {} login status", profile.platform);
    driver.navigate(&probes.home_url)?;
    pause(timings.login_settle());

    if has_positive_probe(driver, probes, timings)? {
        info!("{} session is active", profile.platform);
        return Ok(SessionState::Authenticated);
    }

    if let Some(state) = negative_state(driver, probes)? {
        report(profile.platform, state);
        return Ok(state);
    }

    if let Some(recheck_url) = &probes.recheck_url {
        debug!("Rechecking {} access at {}", profile.platform, recheck_url);
        driver.navigate(recheck_url)?;
        pause(timings.login_settle());
        if let Some(state) = negative_state(driver, probes)? {
            report(profile.platform, state);
            return Ok(state);
        }
    }

    warn!(
        "Could not determine {} login status, proceeding anyway",
        profile.platform
    );
    Ok(SessionState::Unknown)
}

fn has_positive_probe(
    driver: &dyn BrowserDriver,
    probes: &LoginProbes,
    timings: &Timings,
) -> Result<bool, DriverError> {
    for probe in &probes.positive {
        match driver.wait_for(probe, timings.probe_timeout()) {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(err) if err.is_session_lost() => return Err(err),
            Err(err) => debug!("Login probe {} failed: {}", probe, err),
        }
    }
    Ok(false)
}

fn negative_state(
    driver: &dyn BrowserDriver,
    probes: &LoginProbes,
) -> Result<Option<SessionState>, DriverError> {
    match driver.page_source() {
        Ok(source) => {
            let source = source.to_lowercase();
            if let Some(phrase) = probes
                .block_phrases
                .iter()
                .find(|phrase| source.contains(&phrase.to_lowercase()))
            {
                debug!("Block phrase found: {:?}", phrase);
                return Ok(Some(SessionState::Blocked));
            }
        }
        Err(err) if err.is_session_lost() => return Err(err),
        Err(err) => debug!("Could not read page source: {}", err),
    }

    for probe in &probes.login_form {
        match driver.find_elements(probe) {
            Ok(elements) if !elements.is_empty() => {
                debug!("Login form element found: {}", probe);
                return Ok(Some(SessionState::Unauthenticated));
            }
            Ok(_) => {}
            Err(err) if err.is_session_lost() => return Err(err),
            Err(err) => debug!("Login form probe {} missed: {}", probe, err),
        }
    }
    Ok(None)
}

fn report(platform: SourcePlatform, state: SessionState) {
    match state {
        SessionState::Blocked => warn!(
            "{} has blocked automated access; open the browser profile manually, \
             complete any verification and sign in, then retry",
            platform
        ),
        SessionState::Unauthenticated => warn!(
            "Not logged into {}; sign in with the browser profile and retry",
            platform
        ),
        _ => {}
    }
}

/// A human operator who can sign in out-of-band while extraction waits.
pub trait OperatorPrompt {
    /// Block until the operator reports that the session is signed in.
    fn wait_for_login(&self, platform: SourcePlatform, login_url: &str) -> Result<(), ExtractError>;
}

/// Asks on the terminal and waits for Enter.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinPrompt;

impl OperatorPrompt for StdinPrompt {
    fn wait_for_login(&self, platform: SourcePlatform, login_url: &str) -> Result<(), ExtractError> {
        let mut stderr = io::stderr().lock();
        writeln!(
            stderr,
            "The browser is open at {login_url}.\n\
             1. Log in to {platform} in that window\n\
             2. Complete any verification it asks for\n\
             3. Press Enter here to continue"
        )
        .map_err(|e| ExtractError::Operator(e.to_string()))?;

        let mut line = String::new();
        let read = io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| ExtractError::Operator(e.to_string()))?;
        if read == 0 {
            return Err(ExtractError::Operator(
                "stdin closed before login was confirmed".to_string(),
            ));
        }

        info!("Operator confirmed {} login, continuing", platform);
        Ok(())
    }
}
