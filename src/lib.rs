pub mod browser;
pub mod builder;
pub mod classifier;
pub mod config;
pub mod error;
pub mod extractors;
pub mod factory;
pub mod locator;
pub mod login;
pub mod model;
pub mod platform;
pub mod session;

pub use builder::{RecipeExtractor, RecipeExtractorBuilder};
pub use config::{load_config, HarvestConfig, Timings};
pub use error::ExtractError;
pub use extractors::PlatformExtractor;
pub use model::{ExtractionRequest, RecipeDraft, SessionState};
pub use platform::SourcePlatform;

/// Extract a recipe from a supported post or recipe page.
///
/// Configuration comes from `recipe-harvest.toml` and `RECIPE_HARVEST__*`
/// environment variables, which must provide `profile_dir`.
pub fn extract(url: &str, allow_interactive_login: bool) -> Result<RecipeDraft, ExtractError> {
    let config = HarvestConfig::load()?;
    RecipeExtractor::builder()
        .url(url)
        .interactive_login(allow_interactive_login)
        .config(config)
        .build()
}
