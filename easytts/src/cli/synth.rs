//! synth subcommand
//!
//! Speaks text through the endpoint pool and writes the resulting audio files.

use super::{build_pool, load_config};
use crate::audio::{audio_to_base64, write_audio};
use crate::command::{parse_command, COMMAND_HELP};
use crate::common::error::TtsError;
use crate::config::ConfigFile;
use crate::modelpack::{self, manifest::validate_upload_reference};
use crate::pool::PoolCoordinator;
use crate::speech::{FallbackReason, SpeechOutcome, SpeechService};
use crate::text::{clean_text, detect_language};
use crate::types::synthesis::{SynthesisRequest, SynthesisResult};
use crate::voice::VoiceResolver;
use anyhow::{anyhow, Context};
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Arguments for the synth subcommand
#[derive(Args, Debug, Clone)]
pub struct SynthArgs {
    /// Text to speak, or a full `/eztts <text> [-v voice] [-e emotion]` line
    pub text: String,

    /// Voice as `character` or `character:preset`
    #[arg(long)]
    pub voice: Option<String>,

    /// Emotion used to pick a preset when none is given explicitly
    #[arg(short, long)]
    pub emotion: Option<String>,

    /// Reference audio to upload (switches to upload mode)
    #[arg(long, requires = "reference_text", conflicts_with = "prompt_model")]
    pub reference_audio: Option<PathBuf>,

    /// Transcript of the reference audio
    #[arg(long)]
    pub reference_text: Option<String>,

    /// Imported model directory whose bundled prompt for the preset is uploaded as reference
    #[arg(long)]
    pub prompt_model: Option<PathBuf>,

    /// Apply the probability gate before speaking
    #[arg(long)]
    pub gate: bool,

    /// Directory for the written audio files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Print base64 audio to stdout instead of writing files
    #[arg(long)]
    pub base64: bool,
}

/// 実際に読み上げる内容
#[derive(Debug, Clone, PartialEq, Eq)]
struct Utterance {
    text: String,
    voice: Option<String>,
    emotion: Option<String>,
}

/// `/eztts` 形式ならコマンドとして解析し、フラグ指定を優先する
fn utterance(args: &SynthArgs) -> Result<Utterance, anyhow::Error> {
    let raw = args.text.trim();
    if raw.starts_with("/eztts") {
        let cmd = parse_command(raw).ok_or_else(|| anyhow!("{}", COMMAND_HELP))?;
        return Ok(Utterance {
            text: cmd.text,
            voice: args.voice.clone().or(cmd.voice),
            emotion: args.emotion.clone().or(cmd.emotion),
        });
    }
    Ok(Utterance {
        text: raw.to_string(),
        voice: args.voice.clone(),
        emotion: args.emotion.clone(),
    })
}

/// Execute the synth command
pub async fn execute(args: &SynthArgs, config_path: Option<&Path>) -> Result<(), anyhow::Error> {
    let config = load_config(config_path)?;
    let pool = build_pool(&config)?;
    let utterance = utterance(args)?;
    debug!(language = detect_language(&utterance.text), "Detected text language");

    let output_dir = args
        .output_dir
        .clone()
        .or_else(|| config.general.audio_output_dir.clone());

    if args.reference_audio.is_some() || args.prompt_model.is_some() {
        let result = synthesize_with_reference(args, &config, pool, &utterance).await?;
        emit(&result, 1, output_dir.as_deref(), args.base64).await?;
        return Ok(());
    }

    let service = SpeechService::new(pool, &config);
    let outcome = if args.gate {
        service
            .respond(&utterance.text, utterance.voice.as_deref(), utterance.emotion.as_deref())
            .await?
    } else {
        service
            .speak(&utterance.text, utterance.voice.as_deref(), utterance.emotion.as_deref())
            .await?
    };

    match &outcome {
        SpeechOutcome::TextFallback { text, reason } => {
            match reason {
                FallbackReason::TooLong { length, max } => {
                    eprintln!("Text is too long for voice ({length} > {max} chars); replying with text")
                }
                FallbackReason::ProbabilitySkipped => {
                    eprintln!("Probability gate skipped voice; replying with text")
                }
            }
            println!("{text}");
        }
        SpeechOutcome::Voice {
            voice_info,
            segments,
            total,
        } => {
            eprintln!("Voice: {voice_info}");
            for (i, segment) in segments.iter().enumerate() {
                emit(segment, i + 1, output_dir.as_deref(), args.base64).await?;
            }
            let failed = outcome.failed_segments();
            if failed > 0 {
                eprintln!("{failed}/{total} segments failed");
            }
        }
    }
    Ok(())
}

async fn synthesize_with_reference(
    args: &SynthArgs,
    config: &ConfigFile,
    pool: PoolCoordinator,
    utterance: &Utterance,
) -> Result<SynthesisResult, anyhow::Error> {
    let spec = VoiceResolver::from_section(&config.easytts)
        .resolve(utterance.voice.as_deref(), utterance.emotion.as_deref());

    let (audio_path, reference_text) = match (&args.reference_audio, &args.prompt_model) {
        (Some(audio), _) => {
            let text = args.reference_text.clone().unwrap_or_default();
            validate_upload_reference(Some(audio.as_path()), &text)?;
            (audio.clone(), text)
        }
        (None, Some(model_dir)) => {
            let model_dir = model_dir.clone();
            let model = tokio::task::spawn_blocking(move || modelpack::open_model(&model_dir))
                .await??;
            let prompts = model.prompts.as_ref().ok_or_else(|| {
                TtsError::InputValidation(format!(
                    "model '{}' has no bundled prompts; pass --reference-audio instead",
                    model.name
                ))
            })?;
            prompts.reference_for(&spec.preset)?
        }
        (None, None) => return Err(anyhow!("reference audio or prompt model is required")),
    };

    let bytes = tokio::fs::read(&audio_path)
        .await
        .with_context(|| format!("failed to read {}", audio_path.display()))?;
    let filename = audio_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "reference.wav".to_string());

    let request = SynthesisRequest::preset(clean_text(&utterance.text), &spec.character, &spec.preset)
        .with_split_sentence(config.easytts.remote_split_sentence)
        .with_reference(bytes, filename, reference_text);
    Ok(pool.synthesize(&request).await?)
}

async fn emit(
    result: &SynthesisResult,
    index: usize,
    output_dir: Option<&Path>,
    base64: bool,
) -> Result<(), anyhow::Error> {
    if base64 {
        println!("{}", audio_to_base64(&result.audio));
        return Ok(());
    }
    let path = write_audio(output_dir, &format!("easytts_{index:02}"), &result.audio).await?;
    println!("{}\t{}\t{} bytes", path.display(), result.endpoint, result.audio.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(text: &str) -> SynthArgs {
        SynthArgs {
            text: text.to_string(),
            voice: None,
            emotion: None,
            reference_audio: None,
            reference_text: None,
            prompt_model: None,
            gate: false,
            output_dir: None,
            base64: false,
        }
    }

    #[test]
    fn command_line_is_parsed() {
        let u = utterance(&args("/eztts 我有点难过 -v mika -e 伤心")).unwrap();
        assert_eq!(u.text, "我有点难过");
        assert_eq!(u.voice.as_deref(), Some("mika"));
        assert_eq!(u.emotion.as_deref(), Some("伤心"));
    }

    #[test]
    fn flags_override_command_options() {
        let mut a = args("/eztts 你好 -e 开心");
        a.emotion = Some("生气".into());
        let u = utterance(&a).unwrap();
        assert_eq!(u.emotion.as_deref(), Some("生气"));
    }

    #[test]
    fn bare_command_shows_help() {
        let err = utterance(&args("/eztts")).unwrap_err();
        assert!(err.to_string().contains("/eztts"));
    }

    #[test]
    fn plain_text_passes_through() {
        let u = utterance(&args("  你好  ")).unwrap();
        assert_eq!(u.text, "你好");
        assert_eq!(u.voice, None);
    }
}
