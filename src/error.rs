use thiserror::Error;

use crate::browser::DriverError;
use crate::model::SessionState;
use crate::platform::SourcePlatform;

/// Errors that can occur during recipe extraction
#[derive(Error, Debug)]
pub enum ExtractError {
    /// No supported platform matches the URL
    #[error("Unsupported source URL: {0}")]
    UnsupportedSource(String),

    /// The browser session is not authenticated or has been blocked
    #[error("{platform} login required (session is {state})")]
    LoginRequired {
        platform: SourcePlatform,
        state: SessionState,
    },

    /// No content region could be located on the page
    #[error("Could not find any {platform} content at {url}")]
    ContentNotFound { platform: SourcePlatform, url: String },

    /// Browser launch or navigation failed
    #[error("Browser error: {0}")]
    Driver(String),

    /// The interactive login pause could not complete
    #[error("Operator prompt failed: {0}")]
    Operator(String),

    /// The extracted draft is missing a title or all recipe content
    #[error("Incomplete recipe: {0}")]
    Incomplete(String),

    /// Builder configuration error
    #[error("Builder error: {0}")]
    Builder(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl From<DriverError> for ExtractError {
    fn from(err: DriverError) -> Self {
        ExtractError::Driver(err.to_string())
    }
}
