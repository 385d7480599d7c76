use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ExtractError;

/// A single extraction call. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    pub url: String,
    /// Skip the login probes and wait for a human to sign in instead
    pub allow_interactive_login: bool,
}

impl ExtractionRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            allow_interactive_login: false,
        }
    }

    pub fn with_interactive_login(mut self, allow: bool) -> Self {
        self.allow_interactive_login = allow;
        self
    }
}

/// Authentication state of a browser session, recomputed on every attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Authenticated,
    Unauthenticated,
    Blocked,
    /// No probe resolved; callers proceed optimistically
    Unknown,
}

impl SessionState {
    /// Whether extraction may continue in this state.
    pub fn permits_extraction(self) -> bool {
        matches!(self, SessionState::Authenticated | SessionState::Unknown)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Authenticated => "authenticated",
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::Blocked => "blocked",
            SessionState::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Fields located directly on the page, each independently optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocatedFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub steps: Option<Vec<String>>,
}

impl LocatedFields {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.ingredients.is_none()
            && self.steps.is_none()
    }
}

/// What an extractor variant pulled off the page before classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCapture {
    pub image_url: Option<String>,
    /// Verbatim page text handed to the classifier
    pub raw_text: String,
    pub located: LocatedFields,
}

/// Final extraction result handed to the persistence layer.
///
/// Every field defaults to empty when it could not be discovered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeDraft {
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
    pub raw_text: String,
}

impl RecipeDraft {
    /// Check the draft the way a caller does before saving it.
    ///
    /// A missing description or image is fine; a missing title, or a draft
    /// with neither ingredients nor steps, is not.
    pub fn validate(&self) -> Result<(), ExtractError> {
        if self.title.trim().is_empty() {
            return Err(ExtractError::Incomplete("no title found".to_string()));
        }
        if self.ingredients.is_empty() && self.steps.is_empty() {
            return Err(ExtractError::Incomplete(
                "no ingredients or steps found".to_string(),
            ));
        }
        Ok(())
    }
}
