use log::debug;

use crate::error::ExtractError;
use crate::extractors::PlatformExtractor;
use crate::platform::SourcePlatform;

/// The platform whose URL marker appears in `url`, ignoring case.
pub fn platform_for(url: &str) -> Option<SourcePlatform> {
    let url = url.to_lowercase();
    SourcePlatform::ALL
        .into_iter()
        .find(|platform| platform.url_markers().iter().any(|marker| url.contains(marker)))
}

/// Pick the extractor for `url`. No browser is launched here.
pub fn select(url: &str) -> Result<PlatformExtractor, ExtractError> {
    let platform =
        platform_for(url).ok_or_else(|| ExtractError::UnsupportedSource(url.to_string()))?;
    debug!("Matched {} to {}", url, platform);
    Ok(PlatformExtractor::new(platform))
}
