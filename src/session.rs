//! Browser session lifecycle: launch against a persistent profile, apply the
//! platform fingerprint, and tear down exactly once.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::browser::{BrowserDriver, DriverError, DriverLauncher, LaunchSpec};
use crate::error::ExtractError;
use crate::platform::{PlatformProfile, SourcePlatform};

/// Where and how browsers are launched.
///
/// `profile_dir` is process-wide shared state: the browser keeps cookies and
/// logins there between runs and does not support two browsers writing to it
/// at once. Serialize extractions per directory, or give each concurrent
/// worker its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub profile_dir: PathBuf,
    pub headless: bool,
}

pub struct SessionController {
    launcher: Box<dyn DriverLauncher>,
    config: SessionConfig,
}

impl SessionController {
    pub fn new(launcher: Box<dyn DriverLauncher>, config: SessionConfig) -> Self {
        Self { launcher, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Launch a browser for `profile` and apply its fingerprint overrides.
    ///
    /// The returned [`Session`] quits the browser when released or dropped.
    pub fn acquire(&self, profile: &PlatformProfile) -> Result<Session, ExtractError> {
        info!(
            "Setting up browser for {} (profile {})",
            profile.platform,
            self.config.profile_dir.display()
        );

        let spec = LaunchSpec {
            profile_dir: &self.config.profile_dir,
            headless: self.config.headless,
            args: &profile.launch_args,
            user_agent: profile.user_agent.as_deref(),
            idle_timeout: profile.timings.browser_idle(),
        };
        let driver = self.launcher.launch(&spec)?;
        let mut session = Session {
            driver: Some(driver),
            platform: profile.platform,
        };

        let driver = session.driver_mut()?;
        for script in profile.fingerprint.scripts() {
            driver.execute_script(&script)?;
        }
        debug!("Applied fingerprint overrides for {}", profile.platform);

        Ok(session)
    }
}

/// A launched browser, released on every exit path.
pub struct Session {
    driver: Option<Box<dyn BrowserDriver>>,
    platform: SourcePlatform,
}

impl Session {
    pub fn platform(&self) -> SourcePlatform {
        self.platform
    }

    pub fn is_released(&self) -> bool {
        self.driver.is_none()
    }

    pub fn driver_mut(&mut self) -> Result<&mut dyn BrowserDriver, ExtractError> {
        match self.driver.as_mut() {
            Some(driver) => Ok(&mut **driver),
            None => Err(DriverError::Closed.into()),
        }
    }

    /// Quit the browser. Later calls do nothing.
    pub fn release(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            info!("Closing {} browser", self.platform);
            if let Err(err) = driver.quit() {
                warn!("Browser did not shut down cleanly: {}", err);
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release();
    }
}

/// Blocking fixed-duration wait for page rendering.
pub(crate) fn pause(duration: Duration) {
    if !duration.is_zero() {
        debug!("Waiting {:?} for the page to settle", duration);
        thread::sleep(duration);
    }
}
