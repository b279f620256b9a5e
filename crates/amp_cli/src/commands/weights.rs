//! Weights fetch command implementation.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;

use amp_core::bootstrap::EnvPaths;
use amp_core::weights::WeightFetcher;

use super::AppContext;

/// Run `weights fetch`: download a model's checkpoints through the
/// managed environment so cold starts don't pay for them.
pub fn fetch(app: &AppContext, model: String, cache: Option<PathBuf>) -> Result<ExitCode> {
    let env = EnvPaths::new(app.venv_dir());
    let cache_dir = cache.or_else(|| {
        app.settings()
            .runtime
            .torch_home
            .as_deref()
            .map(|configured| app.resolve(configured))
    });

    println!("{} {}", "Model:".cyan().bold(), model);
    if let Some(dir) = &cache_dir {
        println!("{} {}", "Cache:".cyan().bold(), dir.display());
    }

    let logger = app.run_logger("weights-fetch")?;

    let mut fetcher = WeightFetcher::new(env, model);
    if let Some(dir) = cache_dir {
        fetcher = fetcher.cache_dir(dir);
    }

    let hub_dir = fetcher.fetch(&logger)?;
    println!(
        "{} model '{}' available in cache: {}",
        "SUCCESS".green().bold(),
        fetcher.model(),
        hub_dir.display()
    );
    Ok(ExitCode::SUCCESS)
}
