//! CLI module for easytts
//!
//! Exercises the endpoint pool, the speech flow and model pack import from the command line.

pub mod discover;
pub mod endpoints;
pub mod import;
pub mod presets;
pub mod synth;

use crate::config::{ConfigFile, PoolConfig};
use crate::pool::PoolCoordinator;
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// EasyTTS client - synthesize speech through a pool of hosted Gradio endpoints
#[derive(Parser, Debug)]
#[command(name = "easytts")]
#[command(version, about, long_about = None)]
#[command(after_help = r#"ENVIRONMENT VARIABLES:
    EASYTTS_CONFIG                Config file path (default: ./config.toml)
    EASYTTS_BASE_URL              Endpoint base URL when no config file exists
    EASYTTS_STUDIO_TOKEN          Studio token when no config file exists (required)
    EASYTTS_FN_INDEX              Call-site fn_index (default: 3)
    EASYTTS_TRIGGER_ID            Call-site trigger_id (default: 19)
    EASYTTS_STATUS_TIMEOUT_SECS   Queue status probe timeout (default: 3)
    EASYTTS_JOIN_TIMEOUT_SECS     Queue join timeout (default: 30)
    EASYTTS_SSE_TIMEOUT_SECS      Result stream timeout (default: 300)
    EASYTTS_DOWNLOAD_TIMEOUT_SECS Audio download timeout (default: 120)
    EASYTTS_TRUST_ENV             Use system proxy settings (default: false)
    EASYTTS_LOG_LEVEL             Log level (default: info)
"#)]
pub struct Cli {
    /// Config file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Synthesize text through the endpoint pool
    Synth(synth::SynthArgs),
    /// Inspect configured endpoints
    Endpoints(endpoints::EndpointsArgs),
    /// Import a model pack zip into the models directory
    Import(import::ImportArgs),
    /// Import every zip under ModelPacks/ and list models
    Discover(discover::DiscoverArgs),
    /// Show presets bundled with an imported model
    Presets(presets::PresetsArgs),
}

/// 設定を読み込む
pub(crate) fn load_config(path: Option<&Path>) -> Result<ConfigFile, anyhow::Error> {
    ConfigFile::load_or_env(path).context("failed to load configuration")
}

/// 設定からプールを組み立てる
pub(crate) fn build_pool(config: &ConfigFile) -> Result<PoolCoordinator, anyhow::Error> {
    let pool_config = PoolConfig::from_section(&config.easytts)?;
    Ok(PoolCoordinator::with_gradio(Arc::new(pool_config))?)
}

/// `models_root` 未指定なら既定の場所
pub(crate) fn models_root_or_default(models_root: Option<&Path>) -> PathBuf {
    models_root
        .map(Path::to_path_buf)
        .unwrap_or_else(crate::modelpack::discovery::default_models_root)
}
