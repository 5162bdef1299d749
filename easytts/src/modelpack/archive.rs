//! モデルパック zip の読み取りと安全な展開

use crate::common::error::{TtsError, TtsResult};
use serde::Deserialize;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// パック内メタデータとして認識するファイル名（どの階層でもよい）
pub const PACK_META_FILES: [&str; 3] = ["easytts_pack.json", "_easytts_meta.json", "meta.json"];

/// パック同梱のメタデータ
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PackMeta {
    /// モデル名
    #[serde(default)]
    pub model_name: Option<String>,
    /// モデル名（旧キー）
    #[serde(default)]
    pub name: Option<String>,
    /// 言語（zh / en / jp / hybrid）
    #[serde(default)]
    pub language: Option<String>,
}

impl PackMeta {
    /// `model_name`、なければ `name`
    pub fn model_name(&self) -> Option<&str> {
        [&self.model_name, &self.name]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
    }

    /// 言語（空なら `None`）
    pub fn language(&self) -> Option<&str> {
        self.language
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// UTF-8（BOM 付きも可）の JSON を読む
pub(crate) fn parse_json_lenient<T: serde::de::DeserializeOwned>(raw: &[u8]) -> serde_json::Result<T> {
    let raw = raw.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(raw);
    serde_json::from_slice(raw)
}

fn normalized(name: &str) -> String {
    name.replace('\\', "/")
}

/// zip 内のメタデータを読む
///
/// 見つからない・壊れている場合は空のメタデータ。
pub fn read_pack_meta(zip_path: &Path) -> PackMeta {
    match try_read_pack_meta(zip_path) {
        Ok(Some(meta)) => meta,
        Ok(None) => PackMeta::default(),
        Err(e) => {
            debug!(zip = %zip_path.display(), error = %e, "Failed to read pack metadata");
            PackMeta::default()
        }
    }
}

fn try_read_pack_meta(zip_path: &Path) -> TtsResult<Option<PackMeta>> {
    let file = fs::File::open(zip_path)?;
    let mut zip = zip::ZipArchive::new(file)?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let name = normalized(entry.name());
        let base = name.rsplit('/').next().unwrap_or_default();
        if !PACK_META_FILES.contains(&base) {
            continue;
        }
        let mut raw = Vec::new();
        entry.read_to_end(&mut raw)?;
        return Ok(Some(parse_json_lenient(&raw)?));
    }
    Ok(None)
}

/// エントリ名が展開先の外を指していないか
pub fn check_entry_name(name: &str) -> TtsResult<()> {
    let name = normalized(name);
    if name.starts_with('/') || name.starts_with("../") || name.contains("/../") || name == ".." {
        return Err(TtsError::ModelPack(format!(
            "archive contains an unsafe path (ZipSlip): {name}"
        )));
    }
    Ok(())
}

/// 全エントリを検査する（展開はしない）
pub fn validate_archive(zip_path: &Path) -> TtsResult<()> {
    let file = fs::File::open(zip_path)?;
    let mut zip = zip::ZipArchive::new(file)?;
    for i in 0..zip.len() {
        let entry = zip.by_index(i)?;
        check_entry_name(entry.name())?;
        if entry.enclosed_name().is_none() {
            return Err(TtsError::ModelPack(format!(
                "archive contains an unsafe path (ZipSlip): {}",
                entry.name()
            )));
        }
    }
    Ok(())
}

/// 検査したうえで `dest_dir` に展開する
pub fn safe_extract(zip_path: &Path, dest_dir: &Path) -> TtsResult<()> {
    validate_archive(zip_path)?;
    fs::create_dir_all(dest_dir)?;

    let file = fs::File::open(zip_path)?;
    let mut zip = zip::ZipArchive::new(file)?;
    zip.extract(dest_dir)?;
    debug!(
        zip = %zip_path.display(),
        dest = %dest_dir.display(),
        entries = zip.len(),
        "Model pack extracted"
    );
    Ok(())
}
