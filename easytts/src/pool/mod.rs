//! エンドポイントプール
//!
//! プローブ → 選択 → 合成 → 失敗時は別エンドポイントで再試行、を1操作として扱う。
//!
//! ```text
//! SELECTING → INVOKING → SUCCESS
//!     ↑           │
//!     └── RETRY ──┤
//!                 └→ EXHAUSTED
//! ```
//!
//! - 1回の呼び出しで各エンドポイントは最大1回しか試さない
//! - プローブで到達不能だったものと、合成に失敗したものは候補から外す
//! - EXHAUSTED は設定された全エンドポイントの失敗理由をまとめて返す
//!
//! 呼び出し間で共有する可変状態は持たない。設定は `Arc<PoolConfig>` で読み取り専用。

use crate::balancer::{rank_endpoints, select_endpoint, RankPolicy, RankedEndpoint};
use crate::client::GradioClient;
use crate::common::error::{AttemptFailure, FailureStage, TtsError, TtsResult};
use crate::config::PoolConfig;
use crate::health::{EndpointProber, QueueProbe};
use crate::invoker::{GradioInvoker, SynthesisInvoker};
use crate::types::endpoint::{Endpoint, EndpointStatus, QueueState};
use crate::types::synthesis::{SynthesisRequest, SynthesisResult};
use std::sync::Arc;
use tracing::{info, warn};

/// コーディネーターの状態
#[derive(Debug)]
pub enum PoolState<'a> {
    /// 残りの候補から選ぶ
    Selecting,
    /// 選んだエンドポイントで合成中
    Invoking(&'a Endpoint),
    /// 成功（終端）
    Success(SynthesisResult),
    /// 候補が尽きた（終端）
    Exhausted,
}

/// エンドポイントプールのコーディネーター
#[derive(Clone)]
pub struct PoolCoordinator {
    config: Arc<PoolConfig>,
    prober: EndpointProber,
    invoker: Arc<dyn SynthesisInvoker>,
}

impl PoolCoordinator {
    /// 任意のプローブと呼び出し器で作成
    pub fn new(
        config: Arc<PoolConfig>,
        probe: Arc<dyn QueueProbe>,
        invoker: Arc<dyn SynthesisInvoker>,
    ) -> Self {
        let prober = EndpointProber::new(probe).with_timeout(config.timeouts.status);
        Self {
            config,
            prober,
            invoker,
        }
    }

    /// Gradio クライアントで作成
    pub fn with_gradio(config: Arc<PoolConfig>) -> TtsResult<Self> {
        let client = GradioClient::from_config(&config)?;
        let invoker = Arc::new(GradioInvoker::new(client.clone()));
        Ok(Self::new(config, Arc::new(client), invoker))
    }

    /// 設定
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// 全エンドポイントの現在の状態（設定順）
    pub async fn statuses(&self) -> Vec<EndpointStatus<'_>> {
        let all: Vec<&Endpoint> = self.config.endpoints.iter().collect();
        self.prober.probe_all(&all).await
    }

    /// 診断用の並び順
    pub fn rank<'a>(&self, statuses: &[EndpointStatus<'a>]) -> Vec<RankedEndpoint<'a>> {
        rank_endpoints(
            statuses,
            RankPolicy {
                prefer_idle: self.config.prefer_idle,
                busy_threshold: self.config.busy_threshold,
            },
        )
    }

    /// 合成する
    ///
    /// 入力検証エラーはどのエンドポイントにも送らずに返す。
    /// 再試行不能なエラー（入力検証など）は途中でもそのまま返す。
    pub async fn synthesize(&self, request: &SynthesisRequest) -> TtsResult<SynthesisResult> {
        request.validate()?;

        let mut candidates: Vec<&Endpoint> = self.config.endpoints.iter().collect();
        let mut failures: Vec<AttemptFailure> = Vec::new();
        let mut state = PoolState::Selecting;

        loop {
            state = match state {
                PoolState::Selecting => {
                    if candidates.is_empty() {
                        PoolState::Exhausted
                    } else {
                        self.select(&mut candidates, &mut failures).await
                    }
                }
                PoolState::Invoking(endpoint) => {
                    info!(
                        endpoint_name = %endpoint.name,
                        voice = %request.voice_info(),
                        "Invoking synthesis"
                    );
                    match self.invoker.invoke(endpoint, request).await {
                        Ok(result) => PoolState::Success(result),
                        Err(e) if e.is_retryable() => {
                            warn!(
                                endpoint_name = %endpoint.name,
                                error = %e,
                                "Endpoint failed, trying another"
                            );
                            candidates.retain(|c| c.name != endpoint.name);
                            failures.push(AttemptFailure {
                                endpoint: endpoint.name.clone(),
                                stage: FailureStage::Invoke,
                                reason: invocation_reason(e),
                            });
                            PoolState::Selecting
                        }
                        Err(e) => return Err(e),
                    }
                }
                PoolState::Success(result) => return Ok(result),
                PoolState::Exhausted => {
                    return Err(TtsError::PoolExhausted(self.in_config_order(failures)));
                }
            };
        }
    }

    /// 残り候補をプローブして1つ選ぶ
    ///
    /// 到達不能だったものはこの呼び出しの候補から外す。
    async fn select<'a>(
        &'a self,
        candidates: &mut Vec<&'a Endpoint>,
        failures: &mut Vec<AttemptFailure>,
    ) -> PoolState<'a> {
        let statuses = self.prober.probe_all(&candidates[..]).await;

        for status in &statuses {
            if let QueueState::Unreachable(reason) = &status.queue {
                failures.push(AttemptFailure {
                    endpoint: status.endpoint.name.clone(),
                    stage: FailureStage::Probe,
                    reason: reason.clone(),
                });
            }
        }
        let chosen = select_endpoint(&statuses);
        candidates.retain(|c| {
            statuses
                .iter()
                .any(|s| s.endpoint.name == c.name && s.queue.is_available())
        });

        match chosen {
            Some(endpoint) => {
                info!(
                    endpoint_name = %endpoint.name,
                    remaining = candidates.len(),
                    "Endpoint selected"
                );
                PoolState::Invoking(endpoint)
            }
            None => PoolState::Exhausted,
        }
    }

    fn in_config_order(&self, mut failures: Vec<AttemptFailure>) -> Vec<AttemptFailure> {
        let position = |name: &str| {
            self.config
                .endpoints
                .iter()
                .position(|e| e.name == name)
                .unwrap_or(usize::MAX)
        };
        failures.sort_by_key(|f| position(&f.endpoint));
        failures
    }
}

fn invocation_reason(err: TtsError) -> String {
    match err {
        TtsError::InvocationFailure { reason, .. } | TtsError::ProbeFailure { reason, .. } => reason,
        other => other.to_string(),
    }
}
