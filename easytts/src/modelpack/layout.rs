//! 展開後のディレクトリから ONNX モデルの場所を探す
//!
//! 探索順:
//!
//! 1. `<root>/tts_models/`
//! 2. `<root>/`
//! 3. 1階層下（各サブディレクトリとその `tts_models/`、名前順）
//! 4. 2階層下（同上）
//! 5. 任意の深さの `tts_models/`（浅いもの優先）
//! 6. `t2s_encoder_fp32.bin` を含むディレクトリ
//! 7. 見つからなければ `<root>/`

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// 必須の ONNX モデルファイル
pub const REQUIRED_MODEL_FILES: [&str; 7] = [
    "t2s_encoder_fp32.bin",
    "t2s_encoder_fp32.onnx",
    "t2s_first_stage_decoder_fp32.onnx",
    "t2s_shared_fp16.bin",
    "t2s_stage_decoder_fp32.onnx",
    "vits_fp16.bin",
    "vits_fp32.onnx",
];

const TTS_MODELS_DIR: &str = "tts_models";

/// 必須ファイルが全て揃っているか
pub fn has_required_files(dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    let files: HashSet<String> = entries
        .flatten()
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    REQUIRED_MODEL_FILES.iter().all(|f| files.contains(*f))
}

fn sorted_subdirs(dir: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
                .map(|e| e.path())
                .collect()
        })
        .unwrap_or_default();
    dirs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    dirs
}

/// `dir` かその `tts_models/` が条件を満たせば返す
fn dir_or_nested(dir: &Path) -> Option<PathBuf> {
    if has_required_files(dir) {
        return Some(dir.to_path_buf());
    }
    let nested = dir.join(TTS_MODELS_DIR);
    (nested.is_dir() && has_required_files(&nested)).then_some(nested)
}

/// `root` 以下の全ディレクトリ（root 自身は含まない、シンボリックリンクは辿らない）
pub(crate) fn walk_dirs(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for sub in sorted_subdirs(&dir) {
            stack.push(sub.clone());
            found.push(sub);
        }
    }
    found
}

/// `root` 以下で `filename` という名前のファイルを浅い順に探す
pub(crate) fn find_files(root: &Path, filename: &str) -> Vec<PathBuf> {
    let mut dirs = vec![root.to_path_buf()];
    dirs.extend(walk_dirs(root));
    let mut files: Vec<PathBuf> = dirs
        .into_iter()
        .map(|d| d.join(filename))
        .filter(|p| p.is_file())
        .collect();
    sort_shallow_first(&mut files);
    files
}

fn sort_shallow_first(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| {
        a.components()
            .count()
            .cmp(&b.components().count())
            .then_with(|| a.cmp(b))
    });
}

/// ONNX モデルディレクトリを決める
pub fn pick_onnx_model_dir(root: &Path) -> PathBuf {
    let tts_models = root.join(TTS_MODELS_DIR);
    if tts_models.is_dir() && has_required_files(&tts_models) {
        return tts_models;
    }
    if has_required_files(root) {
        return root.to_path_buf();
    }

    let level1 = sorted_subdirs(root);
    if let Some(found) = level1.iter().find_map(|sub| dir_or_nested(sub)) {
        return found;
    }
    if let Some(found) = level1
        .iter()
        .flat_map(|sub| sorted_subdirs(sub))
        .find_map(|sub2| dir_or_nested(&sub2))
    {
        return found;
    }

    let all_dirs = walk_dirs(root);
    let mut candidates: Vec<PathBuf> = all_dirs
        .iter()
        .filter(|d| d.file_name().is_some_and(|n| n == TTS_MODELS_DIR) && has_required_files(d))
        .cloned()
        .collect();
    sort_shallow_first(&mut candidates);
    if let Some(found) = candidates.into_iter().next() {
        return found;
    }

    if let Some(found) = find_files(root, REQUIRED_MODEL_FILES[0])
        .into_iter()
        .filter_map(|f| f.parent().map(Path::to_path_buf))
        .find(|dir| has_required_files(dir))
    {
        return found;
    }

    root.to_path_buf()
}
