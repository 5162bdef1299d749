//! ヘルスチェックモジュール
//!
//! エンドポイントのキュー長を問い合わせ、選択ラウンドごとの状態を作る

use crate::common::error::TtsResult;
use crate::types::endpoint::Endpoint;
use async_trait::async_trait;

pub mod endpoint_checker;

pub use endpoint_checker::EndpointProber;

/// キュー長の問い合わせ口
///
/// 本番では `client::GradioClient` が実装する。
#[async_trait]
pub trait QueueProbe: Send + Sync {
    /// 現在のキュー長を返す。応答なし・不正応答はエラー。
    async fn queue_size(&self, endpoint: &Endpoint) -> TtsResult<u32>;
}
