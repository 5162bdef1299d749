//! 音声データの検証・エンコード・一時ファイル書き出し

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::common::error::TtsResult;

/// 有効な音声とみなす最小バイト数
pub const MIN_AUDIO_SIZE: usize = 100;

/// 音声データが小さすぎないか検証する
pub fn validate_audio_data(data: &[u8]) -> Result<(), String> {
    validate_audio_data_with_min(data, MIN_AUDIO_SIZE)
}

/// 最小サイズを指定して検証する
pub fn validate_audio_data_with_min(data: &[u8], min_size: usize) -> Result<(), String> {
    if data.is_empty() {
        return Err("audio data is empty".to_string());
    }
    if data.len() < min_size {
        return Err(format!(
            "audio data too small ({} < {} bytes)",
            data.len(),
            min_size
        ));
    }
    Ok(())
}

/// 音声を base64 文字列にする
pub fn audio_to_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// `<dir>/<prefix>_<12桁hex><suffix>` を生成する
pub fn generate_temp_path(dir: &Path, prefix: &str, suffix: &str) -> PathBuf {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(12);
    dir.join(format!("{prefix}_{id}{suffix}"))
}

/// 音声をファイルへ書き出し、パスを返す
///
/// 出力先ディレクトリが無ければ作成する。`dir` 未指定時は OS の一時ディレクトリ。
pub async fn write_audio(dir: Option<&Path>, prefix: &str, data: &[u8]) -> TtsResult<PathBuf> {
    let dir = dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| std::env::temp_dir().join("easytts"));
    tokio::fs::create_dir_all(&dir).await?;
    let path = generate_temp_path(&dir, prefix, ".wav");
    tokio::fs::write(&path, data).await?;
    Ok(path)
}
