//! エンドポイント型定義
//!
//! 設定から読み込んだリモートUI（Gradio）インスタンスの記述子と、
//! 選択ラウンドごとに再計算されるキュー状態。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 合成を起動するUIコントロールの既定 fn_index
pub const DEFAULT_FN_INDEX: u32 = 3;

/// 合成を起動するUIコントロールの既定 trigger_id
pub const DEFAULT_TRIGGER_ID: u32 = 19;

fn default_fn_index() -> u32 {
    DEFAULT_FN_INDEX
}

fn default_trigger_id() -> u32 {
    DEFAULT_TRIGGER_ID
}

/// 設定ファイル上のエンドポイント記述（未検証）
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointConfig {
    /// 表示名（省略時は `endpoint-<index>`）
    #[serde(default)]
    pub name: Option<String>,
    /// Gradio アプリのベースURL
    #[serde(default)]
    pub base_url: String,
    /// studio_token（シークレット）
    #[serde(default)]
    pub studio_token: String,
    /// 呼び出し対象の fn_index
    #[serde(default = "default_fn_index")]
    pub fn_index: u32,
    /// 呼び出し対象の trigger_id
    #[serde(default = "default_trigger_id")]
    pub trigger_id: u32,
}

impl EndpointConfig {
    /// 新しいエンドポイント設定を作成
    pub fn new(base_url: impl Into<String>, studio_token: impl Into<String>) -> Self {
        Self {
            name: None,
            base_url: base_url.into(),
            studio_token: studio_token.into(),
            fn_index: DEFAULT_FN_INDEX,
            trigger_id: DEFAULT_TRIGGER_ID,
        }
    }

    /// Builder-style setter for name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder-style setter for call-site indices
    pub fn with_call_site(mut self, fn_index: u32, trigger_id: u32) -> Self {
        self.fn_index = fn_index;
        self.trigger_id = trigger_id;
        self
    }

    /// 正規化して `Endpoint` に変換する
    ///
    /// `base_url` が空なら `None`（設定上は無視される）。
    /// 名前が空なら `endpoint-<index>` を採番する。
    pub fn normalize(&self, index: usize) -> Option<Endpoint> {
        let base_url = self.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return None;
        }
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(ToString::to_string)
            .unwrap_or_else(|| format!("endpoint-{index}"));

        Some(Endpoint {
            name,
            base_url,
            studio_token: self.studio_token.trim().to_string(),
            fn_index: self.fn_index,
            trigger_id: self.trigger_id,
        })
    }
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("studio_token", &mask_token(&self.studio_token))
            .field("fn_index", &self.fn_index)
            .field("trigger_id", &self.trigger_id)
            .finish()
    }
}

/// リモートエンドポイント
///
/// 読み込み後は不変。同一性は `name`。
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// 表示名（識別子）
    pub name: String,
    /// 末尾スラッシュを除去したベースURL
    pub base_url: String,
    /// studio_token
    pub studio_token: String,
    /// 呼び出し対象の fn_index
    pub fn_index: u32,
    /// 呼び出し対象の trigger_id
    pub trigger_id: u32,
}

impl Endpoint {
    /// 新しいエンドポイントを作成
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        studio_token: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            studio_token: studio_token.into(),
            fn_index: DEFAULT_FN_INDEX,
            trigger_id: DEFAULT_TRIGGER_ID,
        }
    }

    /// `base_url` 配下のURLを組み立てる
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// トークンを伏せた表示用文字列
    pub fn masked_token(&self) -> String {
        mask_token(&self.studio_token)
    }
}

// studio_token をログへ出さない
impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("studio_token", &self.masked_token())
            .field("fn_index", &self.fn_index)
            .field("trigger_id", &self.trigger_id)
            .finish()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.base_url)
    }
}

/// トークンを先頭4文字以外伏せる
pub fn mask_token(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    if token.chars().count() <= 4 {
        "*".repeat(token.chars().count())
    } else {
        format!("{visible}****")
    }
}

/// エンドポイントのキュー状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueState {
    /// 応答あり（待ち行列の長さ）
    Available(u32),
    /// 応答なし・タイムアウト・不正応答
    Unreachable(String),
}

impl QueueState {
    /// 応答があればキューサイズ
    pub fn queue_size(&self) -> Option<u32> {
        match self {
            Self::Available(size) => Some(*size),
            Self::Unreachable(_) => None,
        }
    }

    /// 到達可能か
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

impl fmt::Display for QueueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available(size) => write!(f, "queue={size}"),
            Self::Unreachable(reason) => write!(f, "unreachable ({reason})"),
        }
    }
}

/// 1回の選択ラウンドにおけるエンドポイント状態（非所有参照）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointStatus<'a> {
    /// 対象エンドポイント
    pub endpoint: &'a Endpoint,
    /// 問い合わせ結果
    pub queue: QueueState,
}

impl<'a> EndpointStatus<'a> {
    /// 応答ありのステータス
    pub fn available(endpoint: &'a Endpoint, queue_size: u32) -> Self {
        Self {
            endpoint,
            queue: QueueState::Available(queue_size),
        }
    }

    /// 到達不能のステータス
    pub fn unreachable(endpoint: &'a Endpoint, reason: impl Into<String>) -> Self {
        Self {
            endpoint,
            queue: QueueState::Unreachable(reason.into()),
        }
    }
}
