//! 合成呼び出し
//!
//! 選ばれたエンドポイントで1回だけ合成を試みる。通信・リモート側の失敗は
//! 送出せず、エンドポイント名付きの `InvocationFailure` として返す。

use crate::client::GradioClient;
use crate::common::error::{CommonError, TtsError, TtsResult};
use crate::types::endpoint::Endpoint;
use crate::types::synthesis::{SynthesisRequest, SynthesisResult};
use async_trait::async_trait;

/// 合成呼び出しの抽象
#[async_trait]
pub trait SynthesisInvoker: Send + Sync {
    /// `endpoint` で `request` を合成する
    ///
    /// 別エンドポイントで回復可能な失敗は `TtsError::InvocationFailure`。
    async fn invoke(
        &self,
        endpoint: &Endpoint,
        request: &SynthesisRequest,
    ) -> TtsResult<SynthesisResult>;
}

/// 通信系のエラーを、対象エンドポイント名付きの再試行可能な失敗に揃える
///
/// 入力検証や設定エラーはそのまま返す。
pub fn as_invocation_failure(endpoint: &Endpoint, err: TtsError) -> TtsError {
    match err {
        TtsError::InvocationFailure { .. } => err,
        TtsError::ProbeFailure { reason, .. } => TtsError::InvocationFailure {
            endpoint: endpoint.name.clone(),
            reason,
        },
        TtsError::Http(_)
        | TtsError::Timeout(_)
        | TtsError::Io(_)
        | TtsError::Common(CommonError::Serialization(_)) => TtsError::InvocationFailure {
            endpoint: endpoint.name.clone(),
            reason: err.to_string(),
        },
        other => other,
    }
}

/// `GradioClient` による実装
#[derive(Debug, Clone)]
pub struct GradioInvoker {
    client: GradioClient,
}

impl GradioInvoker {
    /// 新しい呼び出し器を作成
    pub fn new(client: GradioClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SynthesisInvoker for GradioInvoker {
    async fn invoke(
        &self,
        endpoint: &Endpoint,
        request: &SynthesisRequest,
    ) -> TtsResult<SynthesisResult> {
        self.client
            .synthesize(endpoint, request)
            .await
            .map_err(|e| as_invocation_failure(endpoint, e))
    }
}
