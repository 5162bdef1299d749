//! エンドポイントプローバー
//!
//! 選択ラウンドの開始時に候補エンドポイントへ `queue/status` を並列に問い合わせる。
//!
//! - 各プローブは個別のタイムアウトで打ち切る（タイムアウト = 到達不能）
//! - 結果は完了順ではなく設定順に並べ直して返す

use crate::health::QueueProbe;
use crate::types::endpoint::{Endpoint, EndpointStatus};
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// プローブの既定タイムアウト（秒）
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 3;

/// エンドポイントプローバー
#[derive(Clone)]
pub struct EndpointProber {
    probe: Arc<dyn QueueProbe>,
    timeout: Duration,
}

impl EndpointProber {
    /// 新しいプローバーを作成
    pub fn new(probe: Arc<dyn QueueProbe>) -> Self {
        Self {
            probe,
            timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
        }
    }

    /// プローブのタイムアウトを設定
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 設定中のタイムアウト
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 単一エンドポイントを問い合わせる
    pub async fn probe<'a>(&self, endpoint: &'a Endpoint) -> EndpointStatus<'a> {
        let started = Instant::now();
        let result = tokio::time::timeout(self.timeout, self.probe.queue_size(endpoint)).await;

        match result {
            Ok(Ok(queue_size)) => {
                debug!(
                    endpoint_name = %endpoint.name,
                    queue_size,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Endpoint probe succeeded"
                );
                EndpointStatus::available(endpoint, queue_size)
            }
            Ok(Err(e)) => {
                debug!(
                    endpoint_name = %endpoint.name,
                    error = %e,
                    "Endpoint probe failed"
                );
                EndpointStatus::unreachable(endpoint, e.to_string())
            }
            Err(_) => {
                debug!(
                    endpoint_name = %endpoint.name,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Endpoint probe timed out"
                );
                EndpointStatus::unreachable(
                    endpoint,
                    format!("status probe timed out after {}ms", self.timeout.as_millis()),
                )
            }
        }
    }

    /// 候補を並列に問い合わせる
    ///
    /// 返り値は `endpoints` と同じ順序。
    pub async fn probe_all<'a>(&self, endpoints: &[&'a Endpoint]) -> Vec<EndpointStatus<'a>> {
        if endpoints.is_empty() {
            return Vec::new();
        }

        let statuses = join_all(endpoints.iter().copied().map(|ep| self.probe(ep))).await;

        let available = statuses.iter().filter(|s| s.queue.is_available()).count();
        info!(
            total = statuses.len(),
            available,
            unreachable = statuses.len() - available,
            "Endpoint probe round completed"
        );
        statuses
    }
}
