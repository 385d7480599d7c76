//! Caption-style posts: one block of free text plus a cover image.

use log::{debug, info, warn};

use super::{find_content_region, locate_field, locate_raw_text};
use crate::browser::BrowserDriver;
use crate::error::ExtractError;
use crate::model::{LocatedFields, RawCapture};
use crate::platform::PlatformProfile;
use crate::session::pause;

pub(super) fn capture(
    driver: &mut dyn BrowserDriver,
    profile: &PlatformProfile,
    url: &str,
) -> Result<RawCapture, ExtractError> {
    info!("Navigating to {}", url);
    driver.navigate(url)?;
    pause(profile.timings.page_settle());

    if !find_content_region(driver, profile)? && profile.content_region_required {
        warn!("No post content appeared at {}", url);
        return Err(content_not_found(profile, url));
    }
    pause(profile.timings.render());

    let image_url = locate_field(driver, &profile.image)?.map(|located| located.into_first());
    if image_url.is_none() {
        debug!("No post image found");
    }

    let raw_text = locate_raw_text(driver, profile)?.unwrap_or_default();
    if raw_text.trim().is_empty() {
        warn!("No caption text found at {}", url);
        return Err(content_not_found(profile, url));
    }
    debug!("Captured {} characters of caption", raw_text.chars().count());

    Ok(RawCapture {
        image_url,
        raw_text,
        located: LocatedFields::default(),
    })
}

fn content_not_found(profile: &PlatformProfile, url: &str) -> ExtractError {
    ExtractError::ContentNotFound {
        platform: profile.platform,
        url: url.to_string(),
    }
}
