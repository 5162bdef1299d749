//! `ModelPacks/*.zip` の自動取り込み
//!
//! zip ごとに (mtime, size) を `_modelpacks_state.json` に記録し、
//! 変化のないパックは展開し直さない。

use super::archive::parse_json_lenient;
use super::{extract_pack, list_models, resolve_identity, ImportedModel};
use crate::common::error::TtsResult;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, info, warn};

/// 状態ファイル名（`models_root` 直下）
pub const STATE_FILE: &str = "_modelpacks_state.json";

/// zip の変更検知用シグネチャ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackSignature {
    /// 更新時刻（UNIX 秒）
    pub mtime: i64,
    /// サイズ（バイト）
    pub size: u64,
}

impl PackSignature {
    /// ファイルのシグネチャを取る
    pub fn of(path: &Path) -> TtsResult<Self> {
        let meta = fs::metadata(path)?;
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Ok(Self {
            mtime,
            size: meta.len(),
        })
    }
}

/// 取り込み済みパックの記録
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackState {
    /// シグネチャ
    pub sig: PackSignature,
    /// 展開先のモデル名
    pub model_name: String,
    /// 言語
    pub language: String,
}

/// zip の絶対パス → 記録
pub type PackStateMap = BTreeMap<String, PackState>;

/// パックごとの処理結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PackOutcome {
    /// 展開した
    Imported {
        /// モデル名
        model_name: String,
    },
    /// 変化なしのため飛ばした
    Unchanged {
        /// モデル名
        model_name: String,
    },
    /// 失敗した
    Failed {
        /// 理由
        reason: String,
    },
}

/// パック1件分の報告
#[derive(Debug, Clone, Serialize)]
pub struct PackReport {
    /// zip のパス
    pub zip: PathBuf,
    /// 結果
    pub outcome: PackOutcome,
}

/// 探索結果
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryReport {
    /// パックごとの結果（パス順）
    pub packs: Vec<PackReport>,
    /// `models_root` のモデル
    pub models: Vec<ImportedModel>,
    /// 状態ファイルを書き直したか
    pub state_written: bool,
}

/// 既定のパック置き場（`./ModelPacks`、`/data` があれば `/data/ModelPacks` も）
pub fn default_pack_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.join("ModelPacks"));
    }
    let data = Path::new("/data");
    if data.is_dir() {
        dirs.push(data.join("ModelPacks"));
    }
    dirs
}

/// 既定のモデル置き場（`/data` があれば `/data/models`、なければ `./models`）
pub fn default_models_root() -> PathBuf {
    let data = Path::new("/data");
    if data.is_dir() {
        return data.join("models");
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("models")
}

fn load_state(path: &Path) -> PackStateMap {
    let Ok(raw) = fs::read(path) else {
        return PackStateMap::new();
    };
    parse_json_lenient(&raw).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "Ignoring unreadable pack state");
        PackStateMap::new()
    })
}

fn collect_zips(pack_dirs: &[PathBuf]) -> BTreeSet<PathBuf> {
    let mut zips = BTreeSet::new();
    for dir in pack_dirs {
        let Ok(entries) = fs::read_dir(dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let is_zip = path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("zip"));
            if is_zip && path.is_file() {
                zips.insert(fs::canonicalize(&path).unwrap_or(path));
            }
        }
    }
    zips
}

fn process_pack(
    zip_path: &Path,
    models_root: &Path,
    state: &mut PackStateMap,
) -> TtsResult<PackOutcome> {
    let sig = PackSignature::of(zip_path)?;
    let (model_name, language) = resolve_identity(zip_path, None, None);
    let dest = models_root.join(&model_name);
    let key = zip_path.to_string_lossy().into_owned();

    let unchanged = state
        .get(&key)
        .is_some_and(|prev| prev.sig == sig && dest.is_dir());
    if unchanged {
        debug!(zip = %zip_path.display(), model = %model_name, "Model pack unchanged, skipping");
        return Ok(PackOutcome::Unchanged { model_name });
    }

    extract_pack(zip_path, &dest, &model_name, &language)?;
    info!(zip = %zip_path.display(), model = %model_name, "Model pack imported");
    state.insert(
        key,
        PackState {
            sig,
            model_name: model_name.clone(),
            language,
        },
    );
    Ok(PackOutcome::Imported { model_name })
}

/// パック置き場の zip を取り込み、`models_root` のモデル一覧を返す
///
/// 個々のパックの失敗は報告に載せて続行する。置き場から消えた zip の記録は削除し、
/// 状態ファイルは変化があったときだけ書く。
pub fn discover_packs(pack_dirs: &[PathBuf], models_root: &Path) -> TtsResult<DiscoveryReport> {
    fs::create_dir_all(models_root)?;
    for dir in pack_dirs {
        if let Err(e) = fs::create_dir_all(dir) {
            debug!(dir = %dir.display(), error = %e, "Cannot create pack directory");
        }
    }

    let state_path = models_root.join(STATE_FILE);
    let mut state = load_state(&state_path);
    let mut report = DiscoveryReport::default();
    let zips = collect_zips(pack_dirs);

    // 消えた zip の記録は捨てる
    let before = state.len();
    state.retain(|key, _| zips.contains(Path::new(key)));
    let mut changed = state.len() != before;
    if changed {
        debug!(removed = before - state.len(), "Dropped state of removed model packs");
    }

    for zip_path in zips {
        let outcome = match process_pack(&zip_path, models_root, &mut state) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(zip = %zip_path.display(), error = %e, "Failed to import model pack");
                PackOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        changed |= matches!(outcome, PackOutcome::Imported { .. });
        report.packs.push(PackReport {
            zip: zip_path,
            outcome,
        });
    }

    if changed {
        fs::write(&state_path, serde_json::to_string_pretty(&state)?)?;
        report.state_written = true;
    }

    report.models = list_models(models_root);
    Ok(report)
}
