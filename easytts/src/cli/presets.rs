//! presets subcommand

use super::import::print_model;
use super::models_root_or_default;
use crate::modelpack::{self, preset_text};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the presets subcommand
#[derive(Args, Debug, Clone)]
pub struct PresetsArgs {
    /// Model name under the models directory, or a model directory path
    pub model: String,

    /// Show the transcript for this preset
    #[arg(long)]
    pub preset: Option<String>,

    /// Directory holding imported models
    #[arg(long)]
    pub models_root: Option<PathBuf>,
}

/// Execute the presets command
pub async fn execute(args: &PresetsArgs) -> Result<(), anyhow::Error> {
    let as_path = PathBuf::from(&args.model);
    let dir = if as_path.is_dir() {
        as_path
    } else {
        models_root_or_default(args.models_root.as_deref()).join(modelpack::safe_name(&args.model))
    };
    let model = tokio::task::spawn_blocking(move || modelpack::open_model(&dir)).await??;

    print_model(&model);
    let entries = model.prompts.as_ref().map(|p| &p.entries);
    let (choices, default) = model.preset_choices();

    if let Some(preset) = &args.preset {
        println!("{}", preset_text(entries, preset));
        return Ok(());
    }
    println!();
    for choice in choices {
        let marker = if choice == default { "*" } else { " " };
        println!("{marker} {choice}\t{}", preset_text(entries, &choice));
    }
    Ok(())
}
