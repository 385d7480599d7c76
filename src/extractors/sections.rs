//! Publisher pages with labelled title, ingredient and preparation sections.

use log::{debug, info, warn};

use super::{find_content_region, locate_field, locate_raw_text};
use crate::browser::{BrowserDriver, DriverError};
use crate::error::ExtractError;
use crate::locator::Located;
use crate::model::{LocatedFields, RawCapture};
use crate::platform::{FieldChain, PlatformProfile};
use crate::session::pause;

/// Characters of page source logged when no recipe lists are found
const DEBUG_SOURCE_CHARS: usize = 5_000;

pub(super) fn capture(
    driver: &mut dyn BrowserDriver,
    profile: &PlatformProfile,
    url: &str,
) -> Result<RawCapture, ExtractError> {
    info!("Navigating to {}", url);
    driver.navigate(url)?;
    pause(profile.timings.page_settle());

    let region_found = find_content_region(driver, profile)?;
    if !region_found {
        if profile.content_region_required {
            return Err(content_not_found(profile, url));
        }
        warn!("No recipe content region appeared at {}, trying anyway", url);
    }
    pause(profile.timings.render());

    let driver: &dyn BrowserDriver = driver;
    let located = LocatedFields {
        title: optional_field(driver, profile.title.as_ref())?.map(Located::into_first),
        description: optional_field(driver, profile.description.as_ref())?
            .map(Located::into_first),
        ingredients: optional_field(driver, profile.ingredients.as_ref())?
            .map(Located::into_items),
        steps: optional_field(driver, profile.steps.as_ref())?.map(Located::into_items),
    };
    let image_url = locate_field(driver, &profile.image)?.map(Located::into_first);
    let raw_text = locate_raw_text(driver, profile)?;

    debug!(
        "Located title: {}, ingredients: {}, steps: {}",
        located.title.is_some(),
        located.ingredients.as_ref().map_or(0, Vec::len),
        located.steps.as_ref().map_or(0, Vec::len)
    );

    if located.ingredients.is_none() && located.steps.is_none() {
        log_page_source(driver);
    }

    if !region_found && raw_text.is_none() && located.is_empty() {
        return Err(content_not_found(profile, url));
    }

    Ok(RawCapture {
        image_url,
        raw_text: raw_text.unwrap_or_default(),
        located,
    })
}

fn optional_field(
    driver: &dyn BrowserDriver,
    field: Option<&FieldChain>,
) -> Result<Option<Located>, DriverError> {
    match field {
        Some(field) => locate_field(driver, field),
        None => Ok(None),
    }
}

fn log_page_source(driver: &dyn BrowserDriver) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    match driver.page_source() {
        Ok(source) => {
            let head: String = source.chars().take(DEBUG_SOURCE_CHARS).collect();
            debug!("No recipe lists found; page source starts with:\n{}", head);
        }
        Err(err) => debug!("Could not read page source: {}", err),
    }
}

fn content_not_found(profile: &PlatformProfile, url: &str) -> ExtractError {
    ExtractError::ContentNotFound {
        platform: profile.platform,
        url: url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::SnapshotDriver;
    use crate::config::Timings;
    use crate::platform::SourcePlatform;

    const RECIPE: &str = "https://cooking.nytimes.com/recipes/1234-lemon-cake";

    fn profile() -> PlatformProfile {
        let mut profile = SourcePlatform::PublisherRecipe.profile();
        profile.timings = Timings::immediate();
        profile
    }

    fn capture_page(html: &str) -> Result<RawCapture, ExtractError> {
        let mut driver = SnapshotDriver::new().with_page(RECIPE, html);
        capture(&mut driver, &profile(), RECIPE)
    }

    #[test]
    fn test_heading_sections_are_located() {
        let capture = capture_page(
            r#"<main>
              <h1 data-testid="recipe-title">Lemon Cake</h1>
              <img src="https://static01.nytimes.com/lemon.jpg">
              <section><h2>Ingredients</h2><ul><li>2 cups flour</li><li>1 lemon</li></ul></section>
              <section><h2>Preparation</h2><ol><li>Whisk everything together.</li><li>Bake for an hour.</li></ol></section>
            </main>"#,
        )
        .unwrap();

        let located = capture.located;
        assert_eq!(located.title.as_deref(), Some("Lemon Cake"));
        assert_eq!(
            located.ingredients,
            Some(vec!["2 cups flour".to_string(), "1 lemon".to_string()])
        );
        assert_eq!(
            located.steps,
            Some(vec![
                "Whisk everything together.".to_string(),
                "Bake for an hour.".to_string()
            ])
        );
        assert_eq!(
            capture.image_url.as_deref(),
            Some("https://static01.nytimes.com/lemon.jpg")
        );
    }

    #[test]
    fn test_short_list_items_are_rejected() {
        let capture = capture_page(
            r#"<main><h1>Toast</h1><section><h2>Ingredients</h2><ul><li>x</li></ul></section></main>"#,
        )
        .unwrap();
        assert!(capture.located.ingredients.is_none());
        assert_eq!(capture.located.title.as_deref(), Some("Toast"));
    }

    #[test]
    fn test_page_without_region_or_text_is_content_not_found() {
        let result = capture_page("<html><body></body></html>");
        assert!(matches!(result, Err(ExtractError::ContentNotFound { .. })));
    }

    #[test]
    fn test_unrelated_images_are_skipped() {
        let capture = capture_page(
            r#"<main><h1>Soup</h1><img src="https://ads.test/banner.png"></main>"#,
        )
        .unwrap();
        assert!(capture.image_url.is_none());
    }
}
