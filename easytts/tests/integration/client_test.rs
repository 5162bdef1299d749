//! GradioClient のワイヤ形式テスト

use crate::support::gradio::{completed_stream, fake_wav, MockGradio, TOKEN};
use easytts::client::GradioClient;
use easytts::common::error::TtsError;
use easytts::config::Timeouts;
use easytts::types::synthesis::SynthesisRequest;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

fn client() -> GradioClient {
    GradioClient::new(Timeouts::default(), false).unwrap()
}

#[tokio::test]
async fn queue_size_is_read_with_auth_headers() {
    let mock = MockGradio::start().await;
    mock.queue(4).await;

    let size = client().queue_size(&mock.endpoint("a")).await.unwrap();
    assert_eq!(size, 4);
}

#[tokio::test]
async fn queue_status_without_size_is_probe_failure() {
    let mock = MockGradio::start().await;
    Mock::given(method("GET"))
        .and(path("/gradio_api/queue/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"eta": 1.5})))
        .mount(&mock.server)
        .await;

    let err = client().queue_size(&mock.endpoint("a")).await.unwrap_err();
    assert!(matches!(err, TtsError::ProbeFailure { ref endpoint, .. } if endpoint == "a"));
}

#[tokio::test]
async fn preset_synthesis_sends_expected_join_payload() {
    let mock = MockGradio::start().await;
    Mock::given(method("POST"))
        .and(path("/gradio_api/queue/join"))
        .and(query_param("studio_token", TOKEN))
        .and(query_param("__theme", "light"))
        .and(query_param("backend_url", "/"))
        .and(header("X-Gradio-User", "app"))
        .and(header("Cookie", format!("studio_token={TOKEN}").as_str()))
        .and(body_partial_json(json!({
            "fn_index": 3,
            "trigger_id": 19,
            "data": ["mika", "你好。", true, "preset", "开心", null, null]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"event_id": "e"})))
        .expect(1)
        .mount(&mock.server)
        .await;
    mock.stream(completed_stream(json!([
        {"path": "/tmp/gradio/x/input.wav"},
        {"path": "/tmp/gradio/x/genie_out.wav", "orig_name": "genie_out.wav"}
    ])))
    .await;
    mock.audio(fake_wav()).await;

    let request = SynthesisRequest::preset("你好。", "mika", "开心");
    let result = client().synthesize(&mock.endpoint("a"), &request).await.unwrap();

    assert_eq!(result.endpoint, "a");
    assert_eq!(result.audio, fake_wav());
    assert_eq!(
        result.audio_url,
        format!("{}/gradio_api/file=/tmp/gradio/x/genie_out.wav", mock.uri())
    );
    assert_eq!(result.orig_name.as_deref(), Some("genie_out.wav"));
}

#[tokio::test]
async fn upload_mode_sends_reference_paths() {
    let mock = MockGradio::start().await;
    mock.upload(&["/tmp/gradio/up/ref.wav"]).await;
    Mock::given(method("POST"))
        .and(path("/gradio_api/queue/join"))
        .and(body_partial_json(json!({
            "data": ["mika", "测试", true, "upload", "普通", ["/tmp/gradio/up/ref.wav"], "参考文本"]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock.server)
        .await;
    mock.stream(completed_stream(json!([
        {"url": format!("{}/gradio_api/file=/tmp/gradio/y/genie_up.wav", mock.uri())}
    ])))
    .await;
    mock.audio(fake_wav()).await;

    let request = SynthesisRequest::preset("测试", "mika", "普通").with_reference(
        b"RIFF-reference".to_vec(),
        "ref.wav",
        "参考文本",
    );
    client().synthesize(&mock.endpoint("a"), &request).await.unwrap();
    assert_eq!(mock.hits("/gradio_api/upload").await, 1);
}

#[tokio::test]
async fn failed_completion_is_invocation_failure() {
    let mock = MockGradio::start().await;
    mock.join(200).await;
    mock.stream(format!(
        "data: {}\n\n",
        json!({"msg": "process_completed", "success": false, "output": {"error": "CUDA OOM"}})
    ))
    .await;

    let request = SynthesisRequest::preset("你好", "mika", "普通");
    let err = client().synthesize(&mock.endpoint("a"), &request).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(err.to_string().contains("CUDA OOM"));
}

#[tokio::test]
async fn stream_without_completion_fails() {
    let mock = MockGradio::start().await;
    mock.join(200).await;
    mock.stream("data: {\"msg\":\"estimation\"}\n\n".to_string()).await;

    let request = SynthesisRequest::preset("你好", "mika", "普通");
    let err = client().synthesize(&mock.endpoint("a"), &request).await.unwrap_err();
    assert!(matches!(err, TtsError::InvocationFailure { .. }));
}

#[tokio::test]
async fn tiny_audio_is_rejected() {
    let mock = MockGradio::start().await;
    mock.join(200).await;
    mock.stream(completed_stream(json!([{"path": "/tmp/gradio/z/genie.wav"}])))
        .await;
    mock.audio(vec![0u8; 10]).await;

    let request = SynthesisRequest::preset("你好", "mika", "普通");
    let err = client().synthesize(&mock.endpoint("a"), &request).await.unwrap_err();
    assert!(err.to_string().contains("too small"));
}

#[tokio::test]
async fn join_error_does_not_leak_token() {
    let mock = MockGradio::start().await;
    mock.join(502).await;

    let request = SynthesisRequest::preset("你好", "mika", "普通");
    let err = client().synthesize(&mock.endpoint("a"), &request).await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("502"));
    assert!(!msg.contains(TOKEN));
}

#[tokio::test]
async fn sse_timeout_is_reported() {
    let mock = MockGradio::start().await;
    mock.join(200).await;
    Mock::given(method("GET"))
        .and(path("/gradio_api/queue/data"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock.server)
        .await;

    let timeouts = Timeouts {
        sse: Duration::from_millis(200),
        ..Timeouts::default()
    };
    let client = GradioClient::new(timeouts, false).unwrap();
    let request = SynthesisRequest::preset("你好", "mika", "普通");
    let err = client.synthesize(&mock.endpoint("a"), &request).await.unwrap_err();
    assert!(matches!(err, TtsError::Timeout(_)));
    assert!(!err.to_string().contains(TOKEN));
}
