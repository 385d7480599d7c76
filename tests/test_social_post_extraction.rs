use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use recipe_harvest::browser::SnapshotLauncher;
use recipe_harvest::login::OperatorPrompt;
use recipe_harvest::{ExtractError, RecipeExtractor, SessionState, SourcePlatform, Timings};

const HOME: &str = "https://www.instagram.com/";
const POST: &str = "https://www.instagram.com/p/C0ffee123/";

const SIGNED_IN_HOME: &str = r#"
<html><body>
  <nav><a href="/accounts/activity/">Activity</a></nav>
  <main>Feed</main>
</body></html>"#;

const LOGIN_HOME: &str = r#"
<html><body>
  <form><input name="username"><input name="password" type="password"><button type="submit">Log in</button></form>
</body></html>"#;

const POST_PAGE: &str = r#"
<html>
<head><meta property="og:image" content="https://scontent.cdninstagram.com/v/shakshuka.jpg"></head>
<body>
  <article>
    <div data-testid="post-caption">🍳 Weeknight Shakshuka<br><br>Ingredients:<br>- 4 eggs<br>- 1 can tomatoes<br>- 1 tsp cumin<br>Instructions:<br>1. Simmer the tomatoes with cumin<br>2. Crack in the eggs and cover<br><br>#breakfast #eggs</div>
  </article>
</body></html>"#;

/// Counts how often the operator was asked to log in.
#[derive(Clone, Default)]
struct CountingPrompt {
    calls: Arc<AtomicUsize>,
}

impl OperatorPrompt for CountingPrompt {
    fn wait_for_login(&self, _platform: SourcePlatform, _login_url: &str) -> Result<(), ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn extract(home: &str, post: &str, interactive: bool, prompt: CountingPrompt) -> Result<recipe_harvest::RecipeDraft, ExtractError> {
    let profile = tempfile::tempdir().unwrap();
    RecipeExtractor::builder()
        .url(POST)
        .interactive_login(interactive)
        .profile_dir(profile.path())
        .timings(Timings::immediate())
        .launcher(SnapshotLauncher::new().with_page(HOME, home).with_page(POST, post))
        .prompt(prompt)
        .build()
}

#[test]
fn test_caption_post_is_extracted() {
    let draft = extract(SIGNED_IN_HOME, POST_PAGE, false, CountingPrompt::default()).unwrap();

    assert_eq!(draft.title, "Weeknight Shakshuka");
    assert_eq!(draft.ingredients, vec!["4 eggs", "1 can tomatoes", "1 tsp cumin"]);
    assert_eq!(
        draft.steps,
        vec!["Simmer the tomatoes with cumin", "Crack in the eggs and cover"]
    );
    assert_eq!(
        draft.image_url,
        "https://scontent.cdninstagram.com/v/shakshuka.jpg"
    );
    assert_eq!(draft.description, "");
    assert!(draft.raw_text.starts_with("🍳 Weeknight Shakshuka\nIngredients:"));
    assert!(draft.raw_text.ends_with("#breakfast #eggs"));
    assert!(draft.validate().is_ok());
}

#[test]
fn test_login_form_means_login_required() {
    let result = extract(LOGIN_HOME, POST_PAGE, false, CountingPrompt::default());

    match result {
        Err(ExtractError::LoginRequired { platform, state }) => {
            assert_eq!(platform, SourcePlatform::SocialPost);
            assert_eq!(state, SessionState::Unauthenticated);
        }
        other => panic!("expected LoginRequired, got {:?}", other),
    }
}

#[test]
fn test_rate_limit_page_means_blocked() {
    let home = "<p>Please wait a few minutes before you try again.</p>";
    let result = extract(home, POST_PAGE, false, CountingPrompt::default());

    assert!(matches!(
        result,
        Err(ExtractError::LoginRequired {
            state: SessionState::Blocked,
            ..
        })
    ));
}

#[test]
fn test_interactive_login_waits_for_operator() {
    let prompt = CountingPrompt::default();
    let draft = extract(LOGIN_HOME, POST_PAGE, true, prompt.clone()).unwrap();

    assert_eq!(prompt.calls.load(Ordering::SeqCst), 1);
    assert_eq!(draft.title, "Weeknight Shakshuka");
}

#[test]
fn test_unresolved_login_state_still_extracts() {
    let draft = extract("<p>Welcome</p>", POST_PAGE, false, CountingPrompt::default()).unwrap();
    assert_eq!(draft.ingredients.len(), 3);
}

#[test]
fn test_caption_falls_back_to_auto_direction_spans() {
    let post = r#"
<html><body><article>
  <span dir="auto">chef_anna</span>
  <span dir="auto">Lazy Sunday Pancakes: mix 1 cup flour, 1 cup milk and 1 egg, then cook on a hot pan.</span>
  <span dir="auto">Tip: whisk the batter until smooth and let it rest for ten minutes.</span>
</article></body></html>"#;

    let draft = extract(SIGNED_IN_HOME, post, false, CountingPrompt::default()).unwrap();

    assert_eq!(
        draft.raw_text,
        "Lazy Sunday Pancakes: mix 1 cup flour, 1 cup milk and 1 egg, then cook on a hot pan.\n\n\
         Tip: whisk the batter until smooth and let it rest for ten minutes."
    );
    assert_eq!(draft.image_url, "");
    assert_eq!(
        draft.ingredients,
        vec!["Lazy Sunday Pancakes: mix 1 cup flour, 1 cup milk and 1 egg, then cook on a hot pan."]
    );
    assert_eq!(
        draft.steps,
        vec!["Tip: whisk the batter until smooth and let it rest for ten minutes."]
    );
}

#[test]
fn test_missing_post_is_content_not_found() {
    let result = extract(
        SIGNED_IN_HOME,
        "<h2>Sorry, this page isn't available.</h2>",
        false,
        CountingPrompt::default(),
    );

    assert!(matches!(
        result,
        Err(ExtractError::ContentNotFound {
            platform: SourcePlatform::SocialPost,
            ..
        })
    ));
}
