//! Supported source platforms and the data tables that drive them.
//!
//! Everything platform-specific lives in a [`PlatformProfile`]: launch flags,
//! fingerprint overrides, login probes, locator chains, classifier keywords
//! and timings. Shared extraction code only reads these tables, so adding a
//! platform means adding a variant and its profile.

use std::fmt;

use crate::browser::Locator;
use crate::classifier::ClassifierRules;
use crate::config::{Timings, DEFAULT_BROWSER_IDLE_MS};
use crate::locator::{Cardinality, LocatorChain, LocatorStep};

/// Desktop user agent presented to publisher sites
const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourcePlatform {
    /// Caption-style social posts (Instagram)
    SocialPost,
    /// Publisher recipe pages with labelled sections (NYT Cooking)
    PublisherRecipe,
}

/// How a platform's content is turned into a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Capture free text and let the classifier find the structure
    Caption,
    /// Locate labelled sections directly, classify raw text only as a fallback
    Sections,
}

impl SourcePlatform {
    pub const ALL: [SourcePlatform; 2] = [SourcePlatform::SocialPost, SourcePlatform::PublisherRecipe];

    /// Stable identifier used in configuration keys
    pub fn key(self) -> &'static str {
        match self {
            SourcePlatform::SocialPost => "social_post",
            SourcePlatform::PublisherRecipe => "publisher_recipe",
        }
    }

    pub fn strategy(self) -> Strategy {
        match self {
            SourcePlatform::SocialPost => Strategy::Caption,
            SourcePlatform::PublisherRecipe => Strategy::Sections,
        }
    }

    /// URL fragments that identify this platform
    pub fn url_markers(self) -> &'static [&'static str] {
        match self {
            SourcePlatform::SocialPost => &["instagram.com"],
            SourcePlatform::PublisherRecipe => &["cooking.nytimes.com"],
        }
    }

    /// Build this platform's default table.
    pub fn profile(self) -> PlatformProfile {
        match self {
            SourcePlatform::SocialPost => social_post_profile(),
            SourcePlatform::PublisherRecipe => publisher_recipe_profile(),
        }
    }
}

impl fmt::Display for SourcePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourcePlatform::SocialPost => "Instagram",
            SourcePlatform::PublisherRecipe => "NYT Cooking",
        };
        f.write_str(name)
    }
}

/// Navigator properties rewritten to hide browser automation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fingerprint {
    pub mask_webdriver: bool,
    /// Fake `navigator.plugins` length
    pub plugin_count: Option<usize>,
    pub languages: Vec<String>,
    pub platform: Option<String>,
}

impl Fingerprint {
    /// Scripts applying the overrides, in order.
    pub fn scripts(&self) -> Vec<String> {
        let mut scripts = Vec::new();
        if self.mask_webdriver {
            scripts.push(define_navigator("webdriver", "undefined"));
        }
        if let Some(count) = self.plugin_count {
            let plugins: Vec<String> = (1..=count).map(|n| n.to_string()).collect();
            scripts.push(define_navigator("plugins", &format!("[{}]", plugins.join(", "))));
        }
        if !self.languages.is_empty() {
            let languages: Vec<String> = self
                .languages
                .iter()
                .map(|language| format!("'{}'", js_escape(language)))
                .collect();
            scripts.push(define_navigator("languages", &format!("[{}]", languages.join(", "))));
        }
        if let Some(platform) = &self.platform {
            scripts.push(define_navigator("platform", &format!("'{}'", js_escape(platform))));
        }
        scripts
    }
}

fn define_navigator(property: &str, value: &str) -> String {
    format!("Object.defineProperty(navigator, '{property}', {{get: () => {value}}})")
}

fn js_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Probes classifying a session's login state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginProbes {
    pub home_url: String,
    /// Elements only present for a signed-in user
    pub positive: Vec<Locator>,
    /// Page text shown when automated access is blocked
    pub block_phrases: Vec<String>,
    /// Login form or paywall elements
    pub login_form: Vec<Locator>,
    /// A page where the negative probes are checked a second time
    pub recheck_url: Option<String>,
}

/// A locator chain with the minimum length its values must exceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChain {
    pub chain: LocatorChain,
    pub min_length: usize,
}

impl FieldChain {
    pub fn new(min_length: usize, steps: Vec<LocatorStep>) -> Self {
        Self {
            chain: LocatorChain::new(steps),
            min_length,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformProfile {
    pub platform: SourcePlatform,
    pub launch_args: Vec<String>,
    pub user_agent: Option<String>,
    pub fingerprint: Fingerprint,
    pub probes: LoginProbes,
    /// Elements whose presence means the page rendered its content
    pub content_regions: Vec<Locator>,
    /// Whether a missing content region aborts the extraction
    pub content_region_required: bool,
    pub image: FieldChain,
    pub title: Option<FieldChain>,
    pub description: Option<FieldChain>,
    pub ingredients: Option<FieldChain>,
    pub steps: Option<FieldChain>,
    /// Raw text sources, tried in order; list results are joined by blank lines
    pub raw_text: Vec<FieldChain>,
    pub rules: ClassifierRules,
    pub timings: Timings,
}

impl PlatformProfile {
    pub fn strategy(&self) -> Strategy {
        self.platform.strategy()
    }
}

fn args(flags: &[&str]) -> Vec<String> {
    flags.iter().map(|flag| flag.to_string()).collect()
}

fn css(selectors: &[&str]) -> Vec<Locator> {
    selectors.iter().map(|selector| Locator::css(*selector)).collect()
}

fn texts(selectors: &[&str]) -> Vec<LocatorStep> {
    selectors.iter().map(|selector| LocatorStep::text(selector)).collect()
}

fn lists(selectors: &[&str]) -> Vec<LocatorStep> {
    selectors.iter().map(|selector| LocatorStep::list(selector)).collect()
}

fn social_post_profile() -> PlatformProfile {
    PlatformProfile {
        platform: SourcePlatform::SocialPost,
        launch_args: args(&[
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--disable-blink-features=AutomationControlled",
        ]),
        user_agent: None,
        fingerprint: Fingerprint {
            mask_webdriver: true,
            ..Default::default()
        },
        probes: LoginProbes {
            home_url: "https://www.instagram.com/".to_string(),
            positive: css(&[
                r#"[data-testid="user-avatar"]"#,
                r#"[data-testid="nav-profile"]"#,
                r#"a[href*="/accounts/activity/"]"#,
                r#"a[href*="/accounts/edit/"]"#,
                r#"[aria-label*="Profile"]"#,
                r#"img[alt*="profile picture"]"#,
            ]),
            block_phrases: vec!["please wait a few minutes before you try again".to_string()],
            login_form: css(&[
                r#"input[name="username"]"#,
                r#"input[name="password"]"#,
                r#"[data-testid="login-button"]"#,
                r#"button[type="submit"]"#,
            ]),
            recheck_url: None,
        },
        content_regions: css(&["article", r#"[role="main"]"#]),
        content_region_required: true,
        image: FieldChain::new(
            0,
            vec![
                LocatorStep::attribute(r#"meta[property="og:image"]"#, "content"),
                LocatorStep::attribute(r#"img[src*="instagram"]"#, "src"),
            ],
        ),
        title: None,
        description: None,
        ingredients: None,
        steps: None,
        raw_text: vec![FieldChain::new(
            50,
            lists(&[
                r#"article div[data-testid="post-caption"]"#,
                r#"article span[dir="auto"]"#,
                r#"article div[dir="auto"]"#,
                r#"[role="main"] span[dir="auto"]"#,
                r#"[role="main"] div[dir="auto"]"#,
            ]),
        )],
        rules: ClassifierRules::default(),
        timings: Timings {
            login_settle_ms: 5_000,
            page_settle_ms: 0,
            render_ms: 3_000,
            probe_timeout_ms: 3_000,
            content_timeout_ms: 10_000,
            operator_settle_ms: 2_000,
            browser_idle_ms: DEFAULT_BROWSER_IDLE_MS,
        },
    }
}

fn publisher_recipe_profile() -> PlatformProfile {
    PlatformProfile {
        platform: SourcePlatform::PublisherRecipe,
        launch_args: args(&[
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--disable-blink-features=AutomationControlled",
            "--disable-features=VizDisplayCompositor",
            "--disable-extensions",
            "--disable-plugins",
            "--blink-settings=imagesEnabled=false",
            "--disable-notifications",
        ]),
        user_agent: Some(DESKTOP_USER_AGENT.to_string()),
        fingerprint: Fingerprint {
            mask_webdriver: true,
            plugin_count: Some(5),
            languages: vec!["en-US".to_string(), "en".to_string()],
            platform: Some("MacIntel".to_string()),
        },
        probes: LoginProbes {
            home_url: "https://cooking.nytimes.com/".to_string(),
            positive: css(&[
                r#"[data-testid="user-menu"]"#,
                ".user-menu",
                r#"[data-testid="account-menu"]"#,
                ".account-menu",
                r#"a[href*="logout"]"#,
                r#"a[href*="signout"]"#,
                ".user-avatar",
                r#"[data-testid="user-avatar"]"#,
            ]),
            block_phrases: vec![
                "you have been blocked".to_string(),
                "suspect that you're a robot".to_string(),
                "bot detection".to_string(),
                "automated access".to_string(),
                "blocked from the new york times".to_string(),
            ],
            login_form: css(&[
                r#"[data-testid="paywall"]"#,
                ".paywall",
                r#"[data-testid="login-prompt"]"#,
                ".login-prompt",
                r#"button[data-testid="login-button"]"#,
                ".login-button",
            ]),
            recheck_url: Some(
                "https://cooking.nytimes.com/recipes/1020000-classic-chocolate-chip-cookies"
                    .to_string(),
            ),
        },
        content_regions: css(&[
            r#"[data-testid="recipe-header"]"#,
            ".recipe-header",
            "main",
            r#"[role="main"]"#,
            "article",
        ]),
        content_region_required: false,
        image: FieldChain::new(
            0,
            [
                r#"[data-testid="recipe-image"] img"#,
                ".recipe-image img",
                r#"img[src*="nytimes"]"#,
                r#"img[alt*="recipe"]"#,
                "img",
            ]
            .iter()
            .map(|selector| {
                LocatorStep::attribute(selector, "src")
                    .with_cardinality(Cardinality::List)
                    .containing(&["nytimes", "recipe"])
            })
            .collect(),
        ),
        title: Some(FieldChain::new(
            0,
            texts(&[
                r#"h1[data-testid="recipe-title"]"#,
                "h1.recipe-title",
                "h1",
                r#"[data-testid="title"]"#,
                ".title",
            ]),
        )),
        description: Some(FieldChain::new(
            0,
            texts(&[
                r#"[data-testid="recipe-description"]"#,
                ".recipe-description",
                r#"[data-testid="description"]"#,
                ".description",
                r#"p[class*="description"]"#,
            ]),
        )),
        ingredients: Some(FieldChain::new(
            2,
            std::iter::once(LocatorStep::under_heading("ingredients", "li"))
                .chain(lists(&[
                    r#"[data-testid="recipe-ingredients"] li"#,
                    ".recipe-ingredients li",
                    r#"[data-testid="ingredients"] li"#,
                    ".ingredients li",
                    r#"ul[class*="ingredient"] li"#,
                    r#"li[class*="ingredient"]"#,
                ]))
                .collect(),
        )),
        steps: Some(FieldChain::new(
            5,
            std::iter::once(LocatorStep::under_heading("preparation", "li"))
                .chain(lists(&[
                    r#"[data-testid="recipe-instructions"] li"#,
                    ".recipe-instructions li",
                    r#"[data-testid="instructions"] li"#,
                    ".instructions li",
                    r#"ol[class*="instruction"] li"#,
                    r#"li[class*="instruction"]"#,
                    r#"[data-testid="recipe-steps"] li"#,
                    ".recipe-steps li",
                ]))
                .collect(),
        )),
        raw_text: vec![
            FieldChain::new(
                100,
                texts(&[
                    "main",
                    "article",
                    r#"[data-testid="recipe-content"]"#,
                    ".recipe-content",
                    "body",
                ]),
            ),
            FieldChain::new(0, texts(&["body"])),
        ],
        rules: ClassifierRules::default(),
        timings: Timings {
            login_settle_ms: 3_000,
            page_settle_ms: 5_000,
            render_ms: 3_000,
            probe_timeout_ms: 1_000,
            content_timeout_ms: 5_000,
            operator_settle_ms: 2_000,
            browser_idle_ms: DEFAULT_BROWSER_IDLE_MS,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_unique() {
        let keys: Vec<_> = SourcePlatform::ALL.iter().map(|p| p.key()).collect();
        assert_eq!(keys, vec!["social_post", "publisher_recipe"]);
    }

    #[test]
    fn test_strategies() {
        assert_eq!(SourcePlatform::SocialPost.strategy(), Strategy::Caption);
        assert_eq!(SourcePlatform::PublisherRecipe.strategy(), Strategy::Sections);
    }

    #[test]
    fn test_social_post_only_masks_webdriver() {
        let scripts = SourcePlatform::SocialPost.profile().fingerprint.scripts();
        assert_eq!(
            scripts,
            vec!["Object.defineProperty(navigator, 'webdriver', {get: () => undefined})"]
        );
    }

    #[test]
    fn test_publisher_spoofs_plugins_languages_and_platform() {
        let scripts = SourcePlatform::PublisherRecipe.profile().fingerprint.scripts();
        assert_eq!(scripts.len(), 4);
        assert!(scripts[1].contains("'plugins', {get: () => [1, 2, 3, 4, 5]}"));
        assert!(scripts[2].contains("['en-US', 'en']"));
        assert!(scripts[3].contains("'MacIntel'"));
    }

    #[test]
    fn test_every_profile_belongs_to_its_platform() {
        for platform in SourcePlatform::ALL {
            let profile = platform.profile();
            assert_eq!(profile.platform, platform);
            assert!(!profile.probes.positive.is_empty());
            assert!(!profile.raw_text.is_empty());
        }
    }

    #[test]
    fn test_caption_platform_locates_no_structured_fields() {
        let profile = SourcePlatform::SocialPost.profile();
        assert!(profile.title.is_none() && profile.ingredients.is_none() && profile.steps.is_none());
    }
}
