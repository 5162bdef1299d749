//! エンドポイントプールのフェイルオーバー（HTTP越し）

use crate::support::gradio::MockGradio;
use easytts::common::error::{FailureStage, TtsError};
use easytts::config::{PoolConfig, Timeouts};
use easytts::pool::PoolCoordinator;
use easytts::types::endpoint::Endpoint;
use easytts::types::synthesis::SynthesisRequest;
use std::sync::Arc;
use std::time::Duration;

fn pool(endpoints: Vec<Endpoint>) -> PoolCoordinator {
    let timeouts = Timeouts {
        status: Duration::from_millis(300),
        ..Timeouts::default()
    };
    let config = PoolConfig::new(endpoints).unwrap().with_timeouts(timeouts);
    PoolCoordinator::with_gradio(Arc::new(config)).unwrap()
}

fn request() -> SynthesisRequest {
    SynthesisRequest::preset("你好。", "mika", "普通")
}

/// A(キュー2・正常) / B(キュー0・合成失敗) / C(到達不能)
#[tokio::test]
async fn least_busy_fails_then_next_succeeds() {
    let a = MockGradio::start().await;
    a.healthy(2).await;
    let b = MockGradio::start().await;
    b.queue(0).await;
    b.join(500).await;
    let c = MockGradio::start().await;
    c.slow_queue(Duration::from_secs(5)).await;

    let pool = pool(vec![a.endpoint("A"), b.endpoint("B"), c.endpoint("C")]);
    let result = pool.synthesize(&request()).await.unwrap();

    assert_eq!(result.endpoint, "A");
    assert_eq!(b.hits("/gradio_api/queue/join").await, 1);
    assert_eq!(a.hits("/gradio_api/queue/join").await, 1);
    assert_eq!(c.hits("/gradio_api/queue/join").await, 0);
}

#[tokio::test]
async fn equal_queues_use_config_order() {
    let first = MockGradio::start().await;
    first.healthy(1).await;
    let second = MockGradio::start().await;
    second.healthy(1).await;

    let pool = pool(vec![first.endpoint("first"), second.endpoint("second")]);
    let result = pool.synthesize(&request()).await.unwrap();
    assert_eq!(result.endpoint, "first");
    assert_eq!(second.hits("/gradio_api/queue/join").await, 0);
}

#[tokio::test]
async fn every_endpoint_failing_reports_each_once() {
    let a = MockGradio::start().await;
    a.queue(2).await;
    a.join(503).await;
    let b = MockGradio::start().await;
    b.queue(0).await;
    b.join(500).await;
    let c = MockGradio::start().await;
    c.queue_error(502).await;

    let pool = pool(vec![a.endpoint("A"), b.endpoint("B"), c.endpoint("C")]);
    let err = pool.synthesize(&request()).await.unwrap_err();

    let TtsError::PoolExhausted(failures) = &err else {
        panic!("expected PoolExhausted, got {err:?}");
    };
    let summary: Vec<(&str, FailureStage)> = failures
        .iter()
        .map(|f| (f.endpoint.as_str(), f.stage))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("A", FailureStage::Invoke),
            ("B", FailureStage::Invoke),
            ("C", FailureStage::Probe),
        ]
    );
    assert_eq!(a.hits("/gradio_api/queue/join").await, 1);
    assert_eq!(b.hits("/gradio_api/queue/join").await, 1);
}

#[tokio::test]
async fn invalid_request_reaches_no_endpoint() {
    let a = MockGradio::start().await;
    a.healthy(0).await;

    let pool = pool(vec![a.endpoint("A")]);
    let err = pool
        .synthesize(&SynthesisRequest::preset("   ", "mika", "普通"))
        .await
        .unwrap_err();
    assert!(matches!(err, TtsError::InputValidation(_)));
    assert!(a.server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn statuses_and_ranking() {
    let a = MockGradio::start().await;
    a.queue(3).await;
    let b = MockGradio::start().await;
    b.queue(1).await;
    let c = MockGradio::start().await;
    c.queue_error(500).await;

    let pool = pool(vec![a.endpoint("A"), b.endpoint("B"), c.endpoint("C")]);
    let statuses = pool.statuses().await;
    let names: Vec<&str> = statuses.iter().map(|s| s.endpoint.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
    assert!(!statuses[2].queue.is_available());

    let ranking = pool.rank(&statuses);
    let ranked: Vec<&str> = ranking.iter().map(|r| r.name).collect();
    assert_eq!(ranked, vec!["B", "A"]);
    assert!(ranking.iter().all(|r| r.busy));
}
