use std::path::PathBuf;

use clap::Parser;
use log::{error, info};

use recipe_harvest::{load_config, RecipeExtractor};

/// Extract a recipe from an Instagram post or NYT Cooking page
#[derive(Parser, Debug)]
#[command(name = "recipe-harvest", version, about)]
struct Cli {
    /// Post or recipe page URL
    url: String,

    /// Open the platform home page and wait for you to log in first
    #[arg(long)]
    interactive_login: bool,

    /// Persistent browser profile directory (overrides the config file)
    #[arg(long, value_name = "DIR")]
    profile_dir: Option<PathBuf>,

    /// Run the browser without a window
    #[arg(long)]
    headless: bool,

    /// Config file (defaults to recipe-harvest.toml in the current directory)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Fail unless the draft has a title and at least one ingredient or step
    #[arg(long)]
    validate: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let mut builder = RecipeExtractor::builder()
        .url(&cli.url)
        .interactive_login(cli.interactive_login)
        .config(config);
    if let Some(dir) = cli.profile_dir {
        builder = builder.profile_dir(dir);
    }
    if cli.headless {
        builder = builder.headless(true);
    }

    let draft = match builder.build() {
        Ok(draft) => draft,
        Err(e) => {
            error!("Extraction failed: {}", e);
            return Err(e.into());
        }
    };

    if cli.validate {
        draft.validate()?;
    }
    info!(
        "Extracted \"{}\" ({} ingredients, {} steps)",
        draft.title,
        draft.ingredients.len(),
        draft.steps.len()
    );
    println!("{}", serde_json::to_string_pretty(&draft)?);

    Ok(())
}
