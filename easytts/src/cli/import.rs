//! import subcommand

use super::models_root_or_default;
use crate::modelpack::{self, ImportedModel};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the import subcommand
#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// Model pack zip
    pub zip: PathBuf,

    /// Model name (default: pack metadata, then the zip file name)
    #[arg(long)]
    pub name: Option<String>,

    /// Model language: zh, en, jp or hybrid (default: pack metadata, then zh)
    #[arg(long)]
    pub language: Option<String>,

    /// Directory holding imported models
    #[arg(long)]
    pub models_root: Option<PathBuf>,
}

/// Execute the import command
pub async fn execute(args: &ImportArgs) -> Result<(), anyhow::Error> {
    let args = args.clone();
    let root = models_root_or_default(args.models_root.as_deref());
    let model = tokio::task::spawn_blocking(move || {
        modelpack::import_pack(&args.zip, &root, args.name.as_deref(), args.language.as_deref())
    })
    .await??;

    print_model(&model);
    Ok(())
}

pub(crate) fn print_model(model: &ImportedModel) {
    println!("Model:     {}", model.name);
    println!("Language:  {}", model.language);
    println!("Directory: {}", model.model_dir.display());
    println!("ONNX dir:  {}", model.onnx_dir.display());
    if !model.complete {
        println!("Warning:   required ONNX files are missing");
    }
    match &model.prompts {
        Some(prompts) => {
            let (_, default) = model.preset_choices();
            println!(
                "Presets:   {} ({}, default {})",
                prompts.entries.len(),
                prompts.source.describe(),
                default
            );
        }
        None => println!("Presets:   none (use --reference-audio with upload mode)"),
    }
}
