//! Subcommand implementations

pub mod run;
pub mod show;

use std::path::Path;

use anyhow::{Context as AnyhowContext, Result};
use deployment::Configuration;
use template::Mode;

/// Load a configuration file, expanding `~` in its path.
fn load(path: &Path) -> Result<Configuration> {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    Configuration::load(Path::new(&expanded))
        .with_context(|| format!("Failed to load configuration from {expanded}"))
}

/// Load and pre-pass a configuration.
fn load_resolved(path: &Path, mode: Mode) -> Result<Configuration> {
    let raw = load(path)?;
    deployment::prepass(&raw, mode).context("Failed to resolve app names and data")
}

const fn mode(lenient: bool) -> Mode {
    if lenient { Mode::Lenient } else { Mode::Strict }
}
