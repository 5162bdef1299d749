//! discover subcommand
//!
//! Imports new or changed zips from the pack directories, then lists every model.

use super::models_root_or_default;
use crate::modelpack::discovery::{default_pack_dirs, discover_packs, PackOutcome};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the discover subcommand
#[derive(Args, Debug, Clone)]
pub struct DiscoverArgs {
    /// Pack directory to scan (repeatable; default: ./ModelPacks and /data/ModelPacks)
    #[arg(long = "pack-dir")]
    pub pack_dirs: Vec<PathBuf>,

    /// Directory holding imported models
    #[arg(long)]
    pub models_root: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Execute the discover command
pub async fn execute(args: &DiscoverArgs) -> Result<(), anyhow::Error> {
    let pack_dirs = if args.pack_dirs.is_empty() {
        default_pack_dirs()
    } else {
        args.pack_dirs.clone()
    };
    let root = models_root_or_default(args.models_root.as_deref());
    let report = tokio::task::spawn_blocking(move || discover_packs(&pack_dirs, &root)).await??;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for pack in &report.packs {
        let file = pack.zip.display();
        match &pack.outcome {
            PackOutcome::Imported { model_name } => println!("imported  {file} -> {model_name}"),
            PackOutcome::Unchanged { model_name } => println!("unchanged {file} -> {model_name}"),
            PackOutcome::Failed { reason } => println!("failed    {file} ({reason})"),
        }
    }
    if report.models.is_empty() {
        println!("No models found. Put zips into ModelPacks/ or run `easytts import`.");
        return Ok(());
    }
    println!("MODEL\tLANGUAGE\tPRESETS\tONNX_DIR");
    for model in &report.models {
        let presets = model.prompts.as_ref().map(|p| p.entries.len()).unwrap_or(0);
        println!(
            "{}\t{}\t{}\t{}",
            model.name,
            model.language,
            presets,
            model.onnx_dir.display()
        );
    }
    Ok(())
}
