//! Gradio リモートクライアント
//!
//! ホストされた合成UIのキューAPIを叩く。
//!
//! - `GET  /gradio_api/queue/status`: キュー長
//! - `POST /gradio_api/upload`: 参照音声のアップロード
//! - `POST /gradio_api/queue/join`: 合成ジョブの投入
//! - `GET  /gradio_api/queue/data`: SSE で完了イベントを待つ
//! - `GET  <audio_url>`: 生成音声のダウンロード
//!
//! studio_token はヘッダー・Cookie・クエリで送るが、ログとエラーには出さない。

pub mod sse;

use crate::audio::validate_audio_data;
use crate::common::error::{TtsError, TtsResult};
use crate::config::{PoolConfig, Timeouts};
use crate::health::QueueProbe;
use crate::types::endpoint::Endpoint;
use crate::types::synthesis::{SynthesisRequest, SynthesisResult};
use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE};
use reqwest::{multipart, Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sse::{completed_output, parse_data_line, pick_output_audio, resolve_audio, RemoteAudio, SseLineBuffer};
use tracing::{debug, info};
use uuid::Uuid;

/// 合成フォームの入力型（リモートUIのコンポーネント順）
pub const DATA_TYPES: [&str; 7] = [
    "dropdown", "textbox", "checkbox", "radio", "dropdown", "audio", "textbox",
];

fn random_hex(len: usize) -> String {
    let mut hex = Uuid::new_v4().simple().to_string();
    hex.truncate(len);
    hex
}

/// queue/join のリクエストボディ
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinPayload {
    /// 呼び出し対象の fn_index
    pub fn_index: u32,
    /// 呼び出し対象の trigger_id
    pub trigger_id: u32,
    /// 11桁のセッションハッシュ
    pub session_hash: String,
    /// 入力型
    #[serde(rename = "dataType")]
    pub data_type: [&'static str; 7],
    /// 入力値
    pub data: Vec<Value>,
}

impl JoinPayload {
    /// リクエストから組み立てる
    ///
    /// `uploaded` は upload モードのときのサーバー側パス。
    pub fn new(endpoint: &Endpoint, request: &SynthesisRequest, uploaded: Option<&[String]>) -> Self {
        let (paths, reference_text) = match (uploaded, &request.reference) {
            (Some(paths), Some(reference)) => (
                Value::from(paths.to_vec()),
                Value::from(reference.text.as_str()),
            ),
            _ => (Value::Null, Value::Null),
        };

        Self {
            fn_index: endpoint.fn_index,
            trigger_id: endpoint.trigger_id,
            session_hash: random_hex(11),
            data_type: DATA_TYPES,
            data: vec![
                Value::from(request.character.as_str()),
                Value::from(request.text.as_str()),
                Value::from(request.split_sentence),
                Value::from(request.mode().as_str()),
                Value::from(request.preset.as_str()),
                paths,
                reference_text,
            ],
        }
    }
}

#[derive(Debug, Deserialize)]
struct QueueStatus {
    queue_size: Option<i64>,
}

/// Gradio キューAPIクライアント
///
/// 状態を持たないため、複数の合成呼び出しで共有してよい。
#[derive(Debug, Clone)]
pub struct GradioClient {
    http: Client,
    timeouts: Timeouts,
}

impl GradioClient {
    /// 新しいクライアントを作成
    ///
    /// `trust_env` が false ならシステムのプロキシ設定を使わない。
    pub fn new(timeouts: Timeouts, trust_env: bool) -> TtsResult<Self> {
        let mut builder = Client::builder().user_agent(concat!("easytts/", env!("CARGO_PKG_VERSION")));
        if !trust_env {
            builder = builder.no_proxy();
        }
        let http = builder
            .build()
            .map_err(|e| TtsError::config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { http, timeouts })
    }

    /// プール設定から作成
    pub fn from_config(config: &PoolConfig) -> TtsResult<Self> {
        Self::new(config.timeouts, config.trust_env)
    }

    /// タイムアウト設定
    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    fn authed(&self, request: RequestBuilder, endpoint: &Endpoint) -> RequestBuilder {
        request
            .header("X-Studio-Token", &endpoint.studio_token)
            .header(COOKIE, format!("studio_token={}", endpoint.studio_token))
    }

    fn failure(endpoint: &Endpoint, reason: impl Into<String>) -> TtsError {
        TtsError::InvocationFailure {
            endpoint: endpoint.name.clone(),
            reason: reason.into(),
        }
    }

    /// 現在のキュー長
    pub async fn queue_size(&self, endpoint: &Endpoint) -> TtsResult<u32> {
        let probe_failure = |reason: String| TtsError::ProbeFailure {
            endpoint: endpoint.name.clone(),
            reason,
        };

        let response = self
            .authed(self.http.get(endpoint.url("/gradio_api/queue/status")), endpoint)
            .timeout(self.timeouts.status)
            .send()
            .await
            .map_err(|e| probe_failure(TtsError::from(e).to_string()))?;

        if !response.status().is_success() {
            return Err(probe_failure(format!(
                "queue/status returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let status: QueueStatus = response
            .json()
            .await
            .map_err(|e| probe_failure(format!("invalid queue/status body: {}", e.without_url())))?;

        match status.queue_size {
            Some(size) if size >= 0 => Ok(u32::try_from(size).unwrap_or(u32::MAX)),
            Some(size) => Err(probe_failure(format!("negative queue_size {size}"))),
            None => Err(probe_failure("queue_size missing from queue/status".to_string())),
        }
    }

    /// 参照音声をアップロードし、サーバー側パスを返す
    pub async fn upload_reference_audio(
        &self,
        endpoint: &Endpoint,
        bytes: Vec<u8>,
        filename: &str,
    ) -> TtsResult<Vec<String>> {
        let part = multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = multipart::Form::new().part("files", part);

        let response = self
            .authed(self.http.post(endpoint.url("/gradio_api/upload")), endpoint)
            .query(&[("upload_id", random_hex(10))])
            .multipart(form)
            .timeout(self.timeouts.upload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::failure(
                endpoint,
                format!("upload returned HTTP {}", response.status().as_u16()),
            ));
        }

        let body: Value = response.json().await?;
        let paths: Vec<String> = body
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if paths.is_empty() {
            return Err(Self::failure(
                endpoint,
                format!("unexpected upload response: {body}"),
            ));
        }
        debug!(endpoint_name = %endpoint.name, files = paths.len(), "Reference audio uploaded");
        Ok(paths)
    }

    /// 合成ジョブをキューへ投入する
    pub async fn join_queue(&self, endpoint: &Endpoint, payload: &JoinPayload) -> TtsResult<()> {
        let t = Utc::now().timestamp_millis().to_string();
        let response = self
            .authed(self.http.post(endpoint.url("/gradio_api/queue/join")), endpoint)
            .query(&[
                ("t", t.as_str()),
                ("__theme", "light"),
                ("backend_url", "/"),
                ("studio_token", endpoint.studio_token.as_str()),
            ])
            .header(CONTENT_TYPE, "application/json")
            .header("X-Gradio-User", "app")
            .json(payload)
            .timeout(self.timeouts.join)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::failure(
                endpoint,
                format!("queue/join returned HTTP {}", response.status().as_u16()),
            ));
        }
        debug!(
            endpoint_name = %endpoint.name,
            session_hash = %payload.session_hash,
            "Joined remote queue"
        );
        Ok(())
    }

    /// SSE で完了イベントを待ち、出力音声の場所を返す
    pub async fn await_result(&self, endpoint: &Endpoint, session_hash: &str) -> TtsResult<RemoteAudio> {
        let response = self
            .authed(self.http.get(endpoint.url("/gradio_api/queue/data")), endpoint)
            .query(&[
                ("session_hash", session_hash),
                ("studio_token", endpoint.studio_token.as_str()),
            ])
            .header(ACCEPT, "text/event-stream")
            .timeout(self.timeouts.sse)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::failure(
                endpoint,
                format!("queue/data returned HTTP {}", response.status().as_u16()),
            ));
        }

        let mut stream = response.bytes_stream();
        let mut buffer = SseLineBuffer::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for line in buffer.push(&chunk) {
                if let Some(audio) = Self::handle_line(endpoint, &line)? {
                    return Ok(audio);
                }
            }
        }
        if let Some(line) = buffer.finish() {
            if let Some(audio) = Self::handle_line(endpoint, &line)? {
                return Ok(audio);
            }
        }

        Err(Self::failure(
            endpoint,
            "queue/data stream ended without process_completed",
        ))
    }

    fn handle_line(endpoint: &Endpoint, line: &str) -> TtsResult<Option<RemoteAudio>> {
        let Some(parsed) = parse_data_line(line) else {
            return Ok(None);
        };
        let event = parsed.map_err(|e| Self::failure(endpoint, format!("malformed SSE event: {e}")))?;

        match completed_output(&event) {
            None => Ok(None),
            Some(Err(reason)) => Err(Self::failure(endpoint, reason)),
            Some(Ok(out)) => {
                let picked = pick_output_audio(&out)
                    .ok_or_else(|| Self::failure(endpoint, "process_completed without output"))?;
                resolve_audio(&endpoint.base_url, picked)
                    .map(Some)
                    .map_err(|reason| Self::failure(endpoint, reason))
            }
        }
    }

    /// 生成音声をダウンロードする
    pub async fn download_audio(&self, endpoint: &Endpoint, audio_url: &str) -> TtsResult<Vec<u8>> {
        let response = self
            .authed(self.http.get(audio_url), endpoint)
            .timeout(self.timeouts.download)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::failure(
                endpoint,
                format!("audio download returned HTTP {}", response.status().as_u16()),
            ));
        }

        let bytes = response.bytes().await?.to_vec();
        validate_audio_data(&bytes).map_err(|reason| Self::failure(endpoint, reason))?;
        Ok(bytes)
    }

    /// 1つのエンドポイントで合成を完了させる
    ///
    /// upload モードなら先に参照音声を送る。
    pub async fn synthesize(
        &self,
        endpoint: &Endpoint,
        request: &SynthesisRequest,
    ) -> TtsResult<SynthesisResult> {
        request.validate()?;

        let uploaded = match &request.reference {
            Some(reference) => Some(
                self.upload_reference_audio(endpoint, reference.bytes.clone(), &reference.filename)
                    .await?,
            ),
            None => None,
        };

        let payload = JoinPayload::new(endpoint, request, uploaded.as_deref());
        self.join_queue(endpoint, &payload).await?;
        let remote = self.await_result(endpoint, &payload.session_hash).await?;
        let audio = self.download_audio(endpoint, &remote.audio_url).await?;

        info!(
            endpoint_name = %endpoint.name,
            voice = %request.voice_info(),
            bytes = audio.len(),
            "Synthesis completed"
        );

        Ok(SynthesisResult {
            audio,
            audio_url: remote.audio_url,
            file_path: remote.file_path,
            orig_name: remote.orig_name,
            endpoint: endpoint.name.clone(),
            finished_at: Utc::now(),
        })
    }
}

#[async_trait]
impl QueueProbe for GradioClient {
    async fn queue_size(&self, endpoint: &Endpoint) -> TtsResult<u32> {
        GradioClient::queue_size(self, endpoint).await
    }
}
