//! モデルパック（ONNX 重み入り zip）の取り込み
//!
//! zip を `models/<name>/` に安全に展開し、ONNX モデルディレクトリの特定、
//! メタデータの保存、参照音声マニフェストの読み込み（または生成）までを行う。

pub mod archive;
pub mod discovery;
pub mod layout;
pub mod manifest;
pub mod meta;

pub use archive::{read_pack_meta, safe_extract, validate_archive, PackMeta};
pub use discovery::{discover_packs, DiscoveryReport};
pub use layout::pick_onnx_model_dir;
pub use manifest::{load_or_build_prompts, preset_choices, preset_text, PromptSet};

use crate::common::error::{TtsError, TtsResult};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// メタデータに言語が無いときの既定
pub const DEFAULT_LANGUAGE: &str = "zh";

/// モデル名をディレクトリ名として安全な形にする
///
/// 英数字・`-`・`_` 以外は `_` に置き換え、両端の `_` を落とす。
/// 空になったら `custom`。
pub fn safe_name(name: &str) -> String {
    let replaced: String = name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let trimmed = replaced.trim_matches('_');
    if trimmed.is_empty() {
        "custom".to_string()
    } else {
        trimmed.to_string()
    }
}

/// 取り込み済みモデル
#[derive(Debug, Clone, Serialize)]
pub struct ImportedModel {
    /// モデル名（ディレクトリ名）
    pub name: String,
    /// 言語
    pub language: String,
    /// `models/<name>/`
    pub model_dir: PathBuf,
    /// ONNX モデルディレクトリ
    pub onnx_dir: PathBuf,
    /// 必須ファイルが揃っているか
    pub complete: bool,
    /// 参照音声（無ければ upload モードのみ）
    #[serde(skip)]
    pub prompts: Option<PromptSet>,
}

impl ImportedModel {
    /// プリセットの選択肢と既定値
    pub fn preset_choices(&self) -> (Vec<String>, String) {
        preset_choices(self.prompts.as_ref().map(|p| &p.entries))
    }
}

/// 展開済みのモデルディレクトリを開く
pub fn open_model(model_dir: &Path) -> TtsResult<ImportedModel> {
    if !model_dir.is_dir() {
        return Err(TtsError::ModelPack(format!(
            "model directory not found: {}",
            model_dir.display()
        )));
    }
    let stored = meta::load_meta(model_dir);
    let name = model_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .or(stored.model_name)
        .unwrap_or_else(|| "custom".to_string());
    let language = stored
        .language
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

    let onnx_dir = pick_onnx_model_dir(model_dir);
    let complete = layout::has_required_files(&onnx_dir);
    if !complete {
        warn!(model = %name, onnx_dir = %onnx_dir.display(), "ONNX model files are incomplete");
    }
    let prompts = load_or_build_prompts(model_dir)?;

    Ok(ImportedModel {
        name,
        language,
        model_dir: model_dir.to_path_buf(),
        onnx_dir,
        complete,
        prompts,
    })
}

/// `models_root` 直下のモデルを名前順に開く
///
/// `_` で始まるディレクトリ（状態ファイル置き場など）は対象外。開けないものは警告して飛ばす。
pub fn list_models(models_root: &Path) -> Vec<ImportedModel> {
    let Ok(entries) = fs::read_dir(models_root) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter(|e| !e.file_name().to_string_lossy().starts_with('_'))
        .map(|e| e.path())
        .collect();
    dirs.sort();

    dirs.iter()
        .filter_map(|dir| match open_model(dir) {
            Ok(model) => Some(model),
            Err(e) => {
                warn!(model_dir = %dir.display(), error = %e, "Failed to open model");
                None
            }
        })
        .collect()
}

/// 名前と言語を決める（引数 > パック内メタデータ > zip 名 / 既定）
pub(crate) fn resolve_identity(
    zip_path: &Path,
    name: Option<&str>,
    language: Option<&str>,
) -> (String, String) {
    let pack = read_pack_meta(zip_path);
    let stem = zip_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .or(pack.model_name())
        .unwrap_or(&stem);
    let language = language
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .or(pack.language())
        .unwrap_or(DEFAULT_LANGUAGE);
    (safe_name(name), language.to_string())
}

/// 検査 → 既存削除 → 展開 → メタデータ保存
///
/// 危険なエントリを含む zip では既存のモデルを消さない。
pub(crate) fn extract_pack(zip_path: &Path, dest: &Path, name: &str, language: &str) -> TtsResult<()> {
    validate_archive(zip_path)?;
    if dest.exists() {
        fs::remove_dir_all(dest)?;
    }
    safe_extract(zip_path, dest)?;
    meta::save_meta(dest, name, Some(language))
}

/// zip を `models_root/<name>/` に取り込む
pub fn import_pack(
    zip_path: &Path,
    models_root: &Path,
    name: Option<&str>,
    language: Option<&str>,
) -> TtsResult<ImportedModel> {
    if !zip_path.is_file() {
        return Err(TtsError::ModelPack(format!(
            "model pack zip not found: {}",
            zip_path.display()
        )));
    }
    let (name, language) = resolve_identity(zip_path, name, language);
    let dest = models_root.join(&name);
    extract_pack(zip_path, &dest, &name, &language)?;

    let model = open_model(&dest)?;
    info!(
        model = %model.name,
        language = %model.language,
        onnx_dir = %model.onnx_dir.display(),
        presets = model.prompts.as_ref().map(|p| p.entries.len()).unwrap_or(0),
        "Model pack imported"
    );
    Ok(model)
}
