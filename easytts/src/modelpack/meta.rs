//! 取り込み済みモデルのメタデータ（`_easytts_meta.json`）

use super::archive::parse_json_lenient;
use crate::common::error::TtsResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// メタデータのファイル名
pub const MODEL_META_FILE: &str = "_easytts_meta.json";

/// モデルのメタデータ
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMeta {
    /// 表示名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    /// 言語
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// メタデータを読む。無い・壊れている場合は空
pub fn load_meta(model_dir: &Path) -> ModelMeta {
    fs::read(model_dir.join(MODEL_META_FILE))
        .ok()
        .and_then(|raw| parse_json_lenient(&raw).ok())
        .unwrap_or_default()
}

/// メタデータを書く
pub fn save_meta(model_dir: &Path, model_name: &str, language: Option<&str>) -> TtsResult<()> {
    let meta = ModelMeta {
        model_name: Some(model_name.to_string()),
        language: language
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(ToString::to_string),
    };
    fs::create_dir_all(model_dir)?;
    fs::write(
        model_dir.join(MODEL_META_FILE),
        serde_json::to_string_pretty(&meta)?,
    )?;
    Ok(())
}
