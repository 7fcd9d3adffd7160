use anyhow::{Context, Result};
use challenge_store::config::Config;
use std::path::Path;

pub mod config;
pub mod seed;
pub mod status;

/// Load configuration from `path`, or from the standard search path
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Config::load_for_service("challenge-admin").context("Failed to load configuration"),
    }
}
