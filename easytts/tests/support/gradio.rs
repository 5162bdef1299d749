use easytts::types::endpoint::Endpoint;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// テスト用の studio_token
pub const TOKEN: &str = "ms-test-token-0123456789";

/// 生成音声として返すダミー WAV（最小サイズを満たす）
pub fn fake_wav() -> Vec<u8> {
    let mut bytes = b"RIFF\x24\x08\x00\x00WAVEfmt ".to_vec();
    bytes.resize(256, 0);
    bytes
}

/// `process_completed` を含む SSE 本文
pub fn completed_stream(output: Value) -> String {
    [
        json!({"msg": "estimation", "rank": 0, "queue_size": 1}),
        json!({"msg": "process_starts"}),
        json!({"msg": "process_completed", "success": true, "output": {"data": output}}),
    ]
    .iter()
    .map(|event| format!("data: {event}\n\n"))
    .collect()
}

/// Gradio キューAPIのモック
#[allow(dead_code)]
pub struct MockGradio {
    pub server: MockServer,
}

#[allow(dead_code)]
impl MockGradio {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn endpoint(&self, name: &str) -> Endpoint {
        Endpoint::new(name, self.uri(), TOKEN)
    }

    /// queue/status が `queue_size` を返す
    pub async fn queue(&self, queue_size: u32) -> &Self {
        Mock::given(method("GET"))
            .and(path("/gradio_api/queue/status"))
            .and(header("X-Studio-Token", TOKEN))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"queue_size": queue_size, "eta": null})),
            )
            .mount(&self.server)
            .await;
        self
    }

    /// queue/status が応答しない（`delay` 後に返す）
    pub async fn slow_queue(&self, delay: Duration) -> &Self {
        Mock::given(method("GET"))
            .and(path("/gradio_api/queue/status"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"queue_size": 0}))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
        self
    }

    /// queue/status がエラーを返す
    pub async fn queue_error(&self, status: u16) -> &Self {
        Mock::given(method("GET"))
            .and(path("/gradio_api/queue/status"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
        self
    }

    /// queue/join が `status` を返す
    pub async fn join(&self, status: u16) -> &Self {
        Mock::given(method("POST"))
            .and(path("/gradio_api/queue/join"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({"event_id": "evt"})))
            .mount(&self.server)
            .await;
        self
    }

    /// queue/data が SSE 本文を返す
    pub async fn stream(&self, body: String) -> &Self {
        Mock::given(method("GET"))
            .and(path("/gradio_api/queue/data"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&self.server)
            .await;
        self
    }

    /// `/gradio_api/file=...` が音声を返す
    pub async fn audio(&self, bytes: Vec<u8>) -> &Self {
        Mock::given(method("GET"))
            .and(path_regex(r"^/gradio_api/file="))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes))
            .mount(&self.server)
            .await;
        self
    }

    /// upload がサーバー側パスを返す
    pub async fn upload(&self, paths: &[&str]) -> &Self {
        Mock::given(method("POST"))
            .and(path("/gradio_api/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(paths)))
            .mount(&self.server)
            .await;
        self
    }

    /// 全APIが正常に応答する
    pub async fn healthy(&self, queue_size: u32) -> &Self {
        self.queue(queue_size).await;
        self.join(200).await;
        self.stream(completed_stream(json!([
            {"path": "/tmp/gradio/abc/genie_out.wav", "orig_name": "genie_out.wav"}
        ])))
        .await;
        self.audio(fake_wav()).await;
        self
    }

    /// 指定パスへのリクエスト数
    pub async fn hits(&self, target: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == target)
            .count()
    }
}
