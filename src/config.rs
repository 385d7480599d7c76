use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::classifier::ClassifierRules;
use crate::platform::{PlatformProfile, SourcePlatform};

/// Default config file name (without extension), looked up in the current directory
const CONFIG_FILE: &str = "recipe-harvest";
const ENV_PREFIX: &str = "RECIPE_HARVEST";

/// Idle bound on the browser connection. Covers an operator signing in by hand.
pub const DEFAULT_BROWSER_IDLE_MS: u64 = 30 * 60 * 1_000;

/// Fixed pauses and wait bounds for one platform, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timings {
    /// Pause after opening the home page before probing login state
    pub login_settle_ms: u64,
    /// Pause after navigating to the recipe URL
    pub page_settle_ms: u64,
    /// Pause for client-side rendering once the content region exists
    pub render_ms: u64,
    /// Bound on each login probe
    pub probe_timeout_ms: u64,
    /// Bound on each content-region wait
    pub content_timeout_ms: u64,
    /// Pause before handing control to the operator for interactive login
    pub operator_settle_ms: u64,
    /// How long the browser connection survives without protocol traffic
    pub browser_idle_ms: u64,
}

impl Timings {
    /// No pauses and single-shot waits. For replaying saved pages.
    pub fn immediate() -> Self {
        Self {
            login_settle_ms: 0,
            page_settle_ms: 0,
            render_ms: 0,
            probe_timeout_ms: 0,
            content_timeout_ms: 0,
            operator_settle_ms: 0,
            browser_idle_ms: DEFAULT_BROWSER_IDLE_MS,
        }
    }

    pub fn login_settle(&self) -> Duration {
        Duration::from_millis(self.login_settle_ms)
    }

    pub fn page_settle(&self) -> Duration {
        Duration::from_millis(self.page_settle_ms)
    }

    pub fn render(&self) -> Duration {
        Duration::from_millis(self.render_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn content_timeout(&self) -> Duration {
        Duration::from_millis(self.content_timeout_ms)
    }

    pub fn operator_settle(&self) -> Duration {
        Duration::from_millis(self.operator_settle_ms)
    }

    pub fn browser_idle(&self) -> Duration {
        Duration::from_millis(self.browser_idle_ms)
    }
}

/// Partial timing overrides from the config file; unset fields keep the
/// platform default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TimingOverrides {
    pub login_settle_ms: Option<u64>,
    pub page_settle_ms: Option<u64>,
    pub render_ms: Option<u64>,
    pub probe_timeout_ms: Option<u64>,
    pub content_timeout_ms: Option<u64>,
    pub operator_settle_ms: Option<u64>,
    pub browser_idle_ms: Option<u64>,
}

impl TimingOverrides {
    pub fn apply(&self, timings: &mut Timings) {
        let fields = [
            (self.login_settle_ms, &mut timings.login_settle_ms),
            (self.page_settle_ms, &mut timings.page_settle_ms),
            (self.render_ms, &mut timings.render_ms),
            (self.probe_timeout_ms, &mut timings.probe_timeout_ms),
            (self.content_timeout_ms, &mut timings.content_timeout_ms),
            (self.operator_settle_ms, &mut timings.operator_settle_ms),
            (self.browser_idle_ms, &mut timings.browser_idle_ms),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct HarvestConfig {
    /// Persistent browser profile directory. Shared by every run that uses
    /// it, so only one extraction may use a given directory at a time.
    #[serde(default)]
    pub profile_dir: Option<PathBuf>,
    /// Run the browser without a window
    #[serde(default)]
    pub headless: bool,
    /// Timing overrides applied to every platform
    #[serde(default)]
    pub timings: TimingOverrides,
    /// Classifier keyword tables keyed by platform (`social_post`, `publisher_recipe`)
    #[serde(default)]
    pub classifier: HashMap<String, ClassifierRules>,
}

impl HarvestConfig {
    /// Load configuration from the default file and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        load_config(None)
    }

    pub fn classifier_rules(&self, platform: SourcePlatform) -> Option<&ClassifierRules> {
        self.classifier.get(platform.key())
    }

    /// Apply this configuration's overrides to a platform table
    pub fn apply(&self, profile: &mut PlatformProfile) {
        self.timings.apply(&mut profile.timings);
        if let Some(rules) = self.classifier_rules(profile.platform) {
            profile.rules = rules.clone();
        }
    }
}

/// Load configuration from a file and environment variables
///
/// Configuration is loaded with the following priority (highest to lowest):
/// 1. Environment variables with RECIPE_HARVEST__ prefix
/// 2. `path` if given (must exist), otherwise recipe-harvest.toml in the
///    current directory (optional)
/// 3. Default values
///
/// Environment variable format: RECIPE_HARVEST__TIMINGS__PROBE_TIMEOUT_MS
pub fn load_config(path: Option<&Path>) -> Result<HarvestConfig, ConfigError> {
    let file = match path {
        Some(path) => File::from(path).required(true),
        None => File::with_name(CONFIG_FILE).required(false),
    };

    let settings = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_immediate_timings_never_pause() {
        let timings = Timings::immediate();
        assert_eq!(timings.probe_timeout(), Duration::ZERO);
        assert_eq!(timings.render(), Duration::ZERO);
        // the connection bound is not a pause
        assert_eq!(timings.browser_idle(), Duration::from_secs(1_800));
    }

    #[test]
    fn test_overrides_only_touch_set_fields() {
        let mut timings = SourcePlatform::SocialPost.profile().timings;
        let before = timings;
        let overrides = TimingOverrides {
            probe_timeout_ms: Some(500),
            ..Default::default()
        };

        overrides.apply(&mut timings);

        assert_eq!(timings.probe_timeout_ms, 500);
        assert_eq!(timings.render_ms, before.render_ms);
        assert_eq!(timings.login_settle_ms, before.login_settle_ms);
        assert_eq!(timings.browser_idle_ms, DEFAULT_BROWSER_IDLE_MS);
    }

    #[test]
    fn test_idle_override_reaches_the_platform_timings() {
        let config = HarvestConfig {
            timings: TimingOverrides {
                browser_idle_ms: Some(7_200_000),
                ..Default::default()
            },
            ..Default::default()
        };

        let mut profile = SourcePlatform::SocialPost.profile();
        config.apply(&mut profile);

        assert_eq!(profile.timings.browser_idle(), Duration::from_secs(7_200));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
profile_dir = "/var/lib/recipe-harvest/profile"
headless = true

[timings]
render_ms = 100
browser_idle_ms = 3600000

[classifier.social_post]
unit_keywords = ["pinch", "cup"]
"#
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();

        assert_eq!(
            config.profile_dir,
            Some(PathBuf::from("/var/lib/recipe-harvest/profile"))
        );
        assert!(config.headless);
        assert_eq!(config.timings.render_ms, Some(100));
        assert_eq!(config.timings.browser_idle_ms, Some(3_600_000));
        let rules = config
            .classifier_rules(SourcePlatform::SocialPost)
            .unwrap();
        assert_eq!(rules.unit_keywords, vec!["pinch", "cup"]);
        // unspecified keyword tables keep their defaults
        assert_eq!(
            rules.verb_keywords,
            ClassifierRules::default().verb_keywords
        );
        assert!(config
            .classifier_rules(SourcePlatform::PublisherRecipe)
            .is_none());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = load_config(Some(Path::new("/definitely/not/here.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_apply_replaces_platform_rules() {
        let mut config = HarvestConfig::default();
        let rules = ClassifierRules {
            comment_prefix: String::new(),
            ..Default::default()
        };
        config
            .classifier
            .insert("publisher_recipe".to_string(), rules.clone());

        let mut profile = SourcePlatform::PublisherRecipe.profile();
        config.apply(&mut profile);

        assert_eq!(profile.rules, rules);
    }
}
