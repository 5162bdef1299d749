//! 参照音声マニフェスト（`prompt_wav.json`）
//!
//! プリセット名 → `{"wav": ファイル名, "text": 書き起こし}` の対応表。
//! 同梱されていなければ `prompt_wav/` か `emotion/` の中身から生成して保存する。

use super::archive::parse_json_lenient;
use super::layout::find_files;
use crate::common::error::{TtsError, TtsResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// マニフェストのファイル名
pub const PROMPT_MANIFEST_FILE: &str = "prompt_wav.json";

/// 参照音声として扱う拡張子
pub const PROMPT_AUDIO_EXTENSIONS: [&str; 6] = ["wav", "ogg", "flac", "mp3", "aiff", "aif"];

/// プリセットが無いときの既定名
pub const FALLBACK_PRESET: &str = "Normal";

const REFERENCE_DIRS: [(&str, PromptSource); 2] = [
    ("prompt_wav", PromptSource::PromptWavDir),
    ("emotion", PromptSource::EmotionDir),
];

/// マニフェストの1項目
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptEntry {
    /// 音声ファイル名（参照ディレクトリからの相対）
    #[serde(default)]
    pub wav: String,
    /// 書き起こし
    #[serde(default)]
    pub text: String,
}

/// プリセット名 → 項目
pub type PromptManifest = BTreeMap<String, PromptEntry>;

/// マニフェストの出どころ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptSource {
    /// 既存の `prompt_wav.json`（同梱または前回生成）
    Bundled,
    /// `prompt_wav/` から生成
    PromptWavDir,
    /// `emotion/` から生成
    EmotionDir,
}

impl PromptSource {
    /// 表示用の説明
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Bundled => "existing prompt_wav.json",
            Self::PromptWavDir => "generated from prompt_wav/",
            Self::EmotionDir => "generated from emotion/",
        }
    }
}

/// 読み込んだ参照音声セット
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    /// マニフェスト
    pub entries: PromptManifest,
    /// 音声ファイルの置き場所
    pub dir: PathBuf,
    /// 出どころ
    pub source: PromptSource,
}

impl PromptSet {
    /// プリセットの参照音声パスと書き起こし
    ///
    /// 項目・音声ファイル・書き起こしが揃っていなければ入力エラー。
    pub fn reference_for(&self, preset: &str) -> TtsResult<(PathBuf, String)> {
        let entry = self.entries.get(preset).ok_or_else(|| {
            TtsError::InputValidation(format!(
                "preset '{preset}' has no bundled reference; upload reference audio instead"
            ))
        })?;
        if entry.wav.trim().is_empty() {
            return Err(TtsError::InputValidation(format!(
                "preset '{preset}' is missing the wav field"
            )));
        }
        let path = self.confined_path(preset, &entry.wav)?;
        if !path.is_file() {
            return Err(TtsError::InputValidation(format!(
                "reference audio for preset '{preset}' not found: {}",
                path.display()
            )));
        }
        let text = entry.text.trim();
        if text.is_empty() {
            return Err(TtsError::InputValidation(format!(
                "preset '{preset}' is missing the text field"
            )));
        }
        Ok((path, text.to_string()))
    }

    /// `wav` を参照ディレクトリ配下のパスに解決する
    ///
    /// 絶対パスや `..` を含む値、シンボリックリンクで外へ出るものは拒否する。
    fn confined_path(&self, preset: &str, wav: &str) -> TtsResult<PathBuf> {
        let outside = || {
            TtsError::InputValidation(format!(
                "reference audio for preset '{preset}' points outside the model directory: {wav}"
            ))
        };
        let relative = Path::new(wav);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(outside());
        }

        let path = self.dir.join(relative);
        if let (Ok(base), Ok(resolved)) = (self.dir.canonicalize(), path.canonicalize()) {
            if !resolved.starts_with(&base) {
                return Err(outside());
            }
        }
        Ok(path)
    }
}

fn is_prompt_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| PROMPT_AUDIO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// ディレクトリ内の `<preset>.<音声>` と `<preset>.txt` の組からマニフェストを作る
///
/// 書き起こしが無い・空の音声は無視する。
pub fn build_from_dir(dir: &Path) -> PromptManifest {
    let mut manifest = PromptManifest::new();
    let Ok(entries) = fs::read_dir(dir) else {
        return manifest;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || !is_prompt_audio(&path) {
            continue;
        }
        let Some(preset) = path.file_stem().and_then(|s| s.to_str()).map(str::trim) else {
            continue;
        };
        if preset.is_empty() {
            continue;
        }
        let Ok(text) = fs::read_to_string(path.with_extension("txt")) else {
            continue;
        };
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        let Some(wav) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        manifest.insert(
            preset.to_string(),
            PromptEntry {
                wav: wav.to_string(),
                text: text.to_string(),
            },
        );
    }
    manifest
}

fn write_manifest(model_dir: &Path, manifest: &PromptManifest) -> TtsResult<()> {
    let json = serde_json::to_string_pretty(manifest)?;
    fs::write(model_dir.join(PROMPT_MANIFEST_FILE), json)?;
    Ok(())
}

/// マニフェストと同じ階層の `prompt_wav/`、なければ `emotion/`
fn load_existing(model_dir: &Path) -> Option<PromptSet> {
    let manifest_path = find_files(model_dir, PROMPT_MANIFEST_FILE).into_iter().next()?;
    let parent = manifest_path.parent()?;
    let prompt_dir = REFERENCE_DIRS
        .iter()
        .map(|(sub, _)| parent.join(sub))
        .find(|d| d.is_dir())?;
    let raw = fs::read(&manifest_path).ok()?;
    match parse_json_lenient::<PromptManifest>(&raw) {
        Ok(entries) if !entries.is_empty() => Some(PromptSet {
            entries,
            dir: prompt_dir,
            source: PromptSource::Bundled,
        }),
        Ok(_) => None,
        Err(e) => {
            debug!(path = %manifest_path.display(), error = %e, "Ignoring unreadable prompt manifest");
            None
        }
    }
}

/// モデルディレクトリの参照音声を読み込む（必要なら生成して保存する）
///
/// どこにも見つからなければ `None`（upload モードのみ利用可能）。
pub fn load_or_build_prompts(model_dir: &Path) -> TtsResult<Option<PromptSet>> {
    if let Some(set) = load_existing(model_dir) {
        return Ok(Some(set));
    }

    for (sub, source) in REFERENCE_DIRS {
        let dir = model_dir.join(sub);
        let entries = build_from_dir(&dir);
        if entries.is_empty() {
            continue;
        }
        write_manifest(model_dir, &entries)?;
        info!(
            model_dir = %model_dir.display(),
            presets = entries.len(),
            source = source.describe(),
            "Prompt manifest generated"
        );
        return Ok(Some(PromptSet {
            entries,
            dir,
            source,
        }));
    }
    Ok(None)
}

/// 選択肢と既定値
///
/// 既定は `普通`、なければ `Normal`、なければ先頭。
pub fn preset_choices(manifest: Option<&PromptManifest>) -> (Vec<String>, String) {
    let Some(manifest) = manifest.filter(|m| !m.is_empty()) else {
        return (vec![FALLBACK_PRESET.to_string()], FALLBACK_PRESET.to_string());
    };
    let keys: Vec<String> = manifest.keys().cloned().collect();
    let default = ["普通", FALLBACK_PRESET]
        .into_iter()
        .find(|k| manifest.contains_key(*k))
        .map(ToString::to_string)
        .unwrap_or_else(|| keys[0].clone());
    (keys, default)
}

/// プリセットの書き起こし（無ければ先頭項目のもの）
pub fn preset_text(manifest: Option<&PromptManifest>, preset: &str) -> String {
    manifest
        .and_then(|m| m.get(preset).or_else(|| m.values().next()))
        .map(|e| e.text.trim().to_string())
        .unwrap_or_default()
}

/// upload モードの入力検証
pub fn validate_upload_reference(audio: Option<&Path>, text: &str) -> TtsResult<()> {
    match audio {
        Some(path) if path.is_file() => {}
        _ => {
            return Err(TtsError::InputValidation(
                "reference audio is required (wav/flac/ogg/aiff/aif)".to_string(),
            ))
        }
    }
    if text.trim().is_empty() {
        return Err(TtsError::InputValidation(
            "reference text matching the audio is required".to_string(),
        ));
    }
    Ok(())
}
