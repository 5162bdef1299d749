//! 合成リクエスト／結果の型定義

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::common::error::{TtsError, TtsResult};

/// 既定キャラクター
pub const DEFAULT_CHARACTER: &str = "mika";

/// 既定プリセット
pub const DEFAULT_PRESET: &str = "普通";

/// 参照音声（upload モード）
#[derive(Clone, PartialEq, Eq)]
pub struct ReferenceAudio {
    /// 音声バイト列
    pub bytes: Vec<u8>,
    /// アップロード時のファイル名
    pub filename: String,
    /// 音声の書き起こし
    pub text: String,
}

impl std::fmt::Debug for ReferenceAudio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceAudio")
            .field("bytes", &self.bytes.len())
            .field("filename", &self.filename)
            .field("text", &self.text)
            .finish()
    }
}

/// 参照モード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceMode {
    /// 同梱プリセットを使う
    Preset,
    /// アップロードした参照音声を使う
    Upload,
}

impl ReferenceMode {
    /// リモートUIのラジオボタン値
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preset => "preset",
            Self::Upload => "upload",
        }
    }
}

/// 合成リクエスト（値オブジェクト）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    /// 読み上げテキスト
    pub text: String,
    /// キャラクター名
    pub character: String,
    /// プリセット（感情）名
    pub preset: String,
    /// リモート側で文分割するか
    pub split_sentence: bool,
    /// 参照音声（upload モードのみ）
    pub reference: Option<ReferenceAudio>,
}

impl SynthesisRequest {
    /// プリセットモードのリクエストを作成
    pub fn preset(
        text: impl Into<String>,
        character: impl Into<String>,
        preset: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            character: character.into(),
            preset: preset.into(),
            split_sentence: true,
            reference: None,
        }
    }

    /// 参照音声を付与して upload モードにする
    pub fn with_reference(
        mut self,
        bytes: Vec<u8>,
        filename: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        self.reference = Some(ReferenceAudio {
            bytes,
            filename: filename.into(),
            text: text.into(),
        });
        self
    }

    /// Builder-style setter for split_sentence
    pub fn with_split_sentence(mut self, split: bool) -> Self {
        self.split_sentence = split;
        self
    }

    /// 参照モード
    pub fn mode(&self) -> ReferenceMode {
        if self.reference.is_some() {
            ReferenceMode::Upload
        } else {
            ReferenceMode::Preset
        }
    }

    /// 送信前の入力検証
    ///
    /// ここで失敗したリクエストはどのエンドポイントにも送られない。
    pub fn validate(&self) -> TtsResult<()> {
        if self.text.trim().is_empty() {
            return Err(TtsError::InputValidation(
                "text to synthesize is empty".to_string(),
            ));
        }
        if self.character.trim().is_empty() {
            return Err(TtsError::InputValidation("character is empty".to_string()));
        }
        if let Some(reference) = &self.reference {
            if reference.bytes.is_empty() {
                return Err(TtsError::InputValidation(
                    "reference audio is empty".to_string(),
                ));
            }
            if reference.text.trim().is_empty() {
                return Err(TtsError::InputValidation(
                    "reference text is required when uploading reference audio".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// ログ用の `character:preset`
    pub fn voice_info(&self) -> String {
        format!("{}:{}", self.character, self.preset)
    }
}

/// 合成結果（不変）
#[derive(Clone, PartialEq, Eq)]
pub struct SynthesisResult {
    /// 音声バイト列
    pub audio: Vec<u8>,
    /// ダウンロード元URL
    pub audio_url: String,
    /// リモート側のファイルパス
    pub file_path: Option<String>,
    /// リモート側の元ファイル名
    pub orig_name: Option<String>,
    /// 処理したエンドポイント名
    pub endpoint: String,
    /// 完了時刻
    pub finished_at: DateTime<Utc>,
}

impl std::fmt::Debug for SynthesisResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesisResult")
            .field("audio", &format_args!("{} bytes", self.audio.len()))
            .field("audio_url", &self.audio_url)
            .field("file_path", &self.file_path)
            .field("orig_name", &self.orig_name)
            .field("endpoint", &self.endpoint)
            .field("finished_at", &self.finished_at)
            .finish()
    }
}
