//! 設定ファイル → プール → 読み上げフローの通しテスト

use crate::support::gradio::{MockGradio, TOKEN};
use easytts::config::{ConfigFile, PoolConfig};
use easytts::pool::PoolCoordinator;
use easytts::speech::{FallbackReason, SpeechOutcome, SpeechService};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

fn config_for(uri: &str) -> ConfigFile {
    let toml = format!(
        r#"
[easytts]
default_character = "mika"
remote_split_sentence = false

[[easytts.endpoints]]
name = "studio"
base_url = "{uri}/"
studio_token = "{TOKEN}"

[easytts.emotion_preset_map]
"伤心" = "伤心"
"开心" = "开心"

[general]
max_text_length = 30
split_delay = 0.0
"#
    );
    ConfigFile::parse(&toml).unwrap()
}

fn service(config: &ConfigFile) -> SpeechService {
    let pool_config = PoolConfig::from_section(&config.easytts).unwrap();
    let pool = PoolCoordinator::with_gradio(Arc::new(pool_config)).unwrap();
    SpeechService::new(pool, config)
}

#[tokio::test]
async fn sentences_are_synthesized_in_order() {
    let mock = MockGradio::start().await;
    mock.healthy(0).await;
    let config = config_for(&mock.uri());

    let outcome = service(&config)
        .speak("今天下雨了。我有点难过！", Some("mika"), Some("难过"))
        .await
        .unwrap();

    let SpeechOutcome::Voice { voice_info, segments, total } = outcome else {
        panic!("expected voice outcome");
    };
    assert_eq!(voice_info, "mika:伤心");
    assert_eq!(total, 2);
    assert!(segments.iter().all(|s| s.endpoint == "studio"));
    assert_eq!(mock.hits("/gradio_api/queue/join").await, 2);
}

#[tokio::test]
async fn preset_and_split_flag_reach_the_wire() {
    let mock = MockGradio::start().await;
    mock.healthy(0).await;
    Mock::given(method("POST"))
        .and(path("/gradio_api/queue/join"))
        .and(body_partial_json(json!({
            "data": ["mika", "你好", false, "preset", "开心", null, null]
        })))
        .respond_with(ResponseTemplate::new(200))
        .with_priority(1)
        .expect(1)
        .mount(&mock.server)
        .await;
    let config = config_for(&mock.uri());

    service(&config)
        .speak("你好", Some("mika:开心"), Some("伤心"))
        .await
        .unwrap();
}

#[tokio::test]
async fn long_text_never_reaches_the_endpoint() {
    let mock = MockGradio::start().await;
    mock.healthy(0).await;
    let config = config_for(&mock.uri());

    let text = "这是一段很长的文字".repeat(5);
    let outcome = service(&config).speak(&text, None, None).await.unwrap();
    assert!(matches!(
        outcome,
        SpeechOutcome::TextFallback {
            reason: FallbackReason::TooLong { max: 30, .. },
            ..
        }
    ));
    assert!(mock.server.received_requests().await.unwrap_or_default().is_empty());
}
