//! エラー型定義
//!
//! 統一エラー型（thiserror使用）
//!
//! # 回復方針
//!
//! ローカルで回復するのはエンドポイントの差し替えのみ。
//! `TtsError::is_retryable()` が `true` を返すエラーはプールが別エンドポイントで
//! 再試行し、それ以外は呼び出し元へそのまま伝播する。

use std::fmt;
use thiserror::Error;

/// Common layer error type
#[derive(Debug, Error)]
pub enum CommonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parse error
    #[error("Config file parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// 試行が失敗したフェーズ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// queue/status の問い合わせ
    Probe,
    /// 合成呼び出し（upload / join / SSE / download）
    Invoke,
}

impl FailureStage {
    /// 文字列表現
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Probe => "probe",
            Self::Invoke => "invoke",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// エンドポイント単位の失敗記録（PoolExhausted の診断情報）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    /// エンドポイント名
    pub endpoint: String,
    /// 失敗フェーズ
    pub stage: FailureStage,
    /// 失敗理由
    pub reason: String,
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.endpoint, self.stage, self.reason)
    }
}

fn join_failures(failures: &[AttemptFailure]) -> String {
    if failures.is_empty() {
        return "no endpoints were tried".to_string();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// easytts error type
#[derive(Debug, Error)]
pub enum TtsError {
    /// Common layer error
    #[error(transparent)]
    Common(#[from] CommonError),

    /// Endpoint unreachable or status query failed
    #[error("Probe failed for endpoint {endpoint}: {reason}")]
    ProbeFailure {
        /// エンドポイント名
        endpoint: String,
        /// 理由
        reason: String,
    },

    /// Remote synthesis call failed after selection
    #[error("Invocation failed on endpoint {endpoint}: {reason}")]
    InvocationFailure {
        /// エンドポイント名
        endpoint: String,
        /// 理由
        reason: String,
    },

    /// No endpoint could serve the request
    #[error("All endpoints failed: {}", join_failures(.0))]
    PoolExhausted(Vec<AttemptFailure>),

    /// Request rejected before reaching any endpoint
    #[error("Invalid input: {0}")]
    InputValidation(String),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Http(String),

    /// Timeout error
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Model pack error
    #[error("Model pack error: {0}")]
    ModelPack(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TtsError {
    /// 設定エラーを生成
    pub fn config(message: impl Into<String>) -> Self {
        Self::Common(CommonError::Config(message.into()))
    }

    /// 別エンドポイントで回復可能なエラーか
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProbeFailure { .. }
                | Self::InvocationFailure { .. }
                | Self::Http(_)
                | Self::Timeout(_)
        )
    }

    /// 設定エラーか
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Common(CommonError::Config(_)))
    }

    /// PoolExhausted の診断情報
    pub fn attempts(&self) -> &[AttemptFailure] {
        match self {
            Self::PoolExhausted(failures) => failures,
            _ => &[],
        }
    }
}

impl From<reqwest::Error> for TtsError {
    fn from(err: reqwest::Error) -> Self {
        // URL のクエリに studio_token が入るため落とす
        let err = err.without_url();
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

impl From<zip::result::ZipError> for TtsError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::ModelPack(err.to_string())
    }
}

impl From<serde_json::Error> for TtsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Common(CommonError::Serialization(err))
    }
}

/// easytts Result型
pub type TtsResult<T> = Result<T, TtsError>;
