use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use embedding::{build_provider, EmbeddingConfig, EmbeddingError, RetryConfig};
use serde_json::{json, Value};

#[derive(Clone)]
struct Mock {
    calls: Arc<AtomicU32>,
    fail_first: u32,
    fail_status: StatusCode,
}

async fn embeddings(State(mock): State<Mock>, Json(body): Json<Value>) -> impl IntoResponse {
    let call = mock.calls.fetch_add(1, Ordering::SeqCst);
    if call < mock.fail_first {
        return (mock.fail_status, Json(json!({ "error": "try again" })));
    }
    let inputs = body["input"].as_array().cloned().unwrap_or_default();
    let data: Vec<Value> = inputs
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let len = text.as_str().map(str::len).unwrap_or(0) as f32;
            json!({ "index": i, "embedding": [len, 1.0, 0.0] })
        })
        .collect();
    (StatusCode::OK, Json(json!({ "data": data })))
}

async fn spawn_mock(fail_first: u32, fail_status: StatusCode) -> anyhow::Result<(String, Arc<AtomicU32>)> {
    let calls = Arc::new(AtomicU32::new(0));
    let app = Router::new()
        .route("/v1/embeddings", post(embeddings))
        .with_state(Mock {
            calls: calls.clone(),
            fail_first,
            fail_status,
        });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}/v1/embeddings"), calls))
}

fn config(url: String) -> EmbeddingConfig {
    EmbeddingConfig {
        api_url: Some(url),
        api_key: Some("sk-test".into()),
        batch_size: 2,
        retry: RetryConfig::default()
            .with_max_retries(3)
            .with_base_delay(Duration::from_millis(5))
            .with_jitter(false),
        ..Default::default()
    }
}

#[tokio::test]
async fn rate_limited_requests_are_retried() -> anyhow::Result<()> {
    let (url, calls) = spawn_mock(2, StatusCode::TOO_MANY_REQUESTS).await?;
    let provider = build_provider(&config(url))?;

    let vector = provider.embed("robotics").await?;

    assert_eq!(vector, vec![8.0, 1.0, 0.0]);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    Ok(())
}

#[tokio::test]
async fn batches_are_split_and_kept_in_order() -> anyhow::Result<()> {
    let (url, calls) = spawn_mock(0, StatusCode::OK).await?;
    let provider = build_provider(&config(url))?;
    let texts: Vec<String> = ["a", "bb", "ccc", "dddd", "eeeee"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let vectors = provider.embed_batch(&texts).await?;

    let firsts: Vec<f32> = vectors.iter().map(|v| v[0]).collect();
    assert_eq!(firsts, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    // batch_size = 2 -> three requests
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    Ok(())
}

#[tokio::test]
async fn client_errors_are_not_retried() -> anyhow::Result<()> {
    let (url, calls) = spawn_mock(u32::MAX, StatusCode::UNAUTHORIZED).await?;
    let provider = build_provider(&config(url))?;

    let err = provider.embed("anything").await.unwrap_err();

    assert!(matches!(err, EmbeddingError::Provider { status: 401, .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn exhausted_rate_limit_surfaces_error() -> anyhow::Result<()> {
    let (url, calls) = spawn_mock(u32::MAX, StatusCode::TOO_MANY_REQUESTS).await?;
    let provider = build_provider(&config(url))?;

    let err = provider.embed("anything").await.unwrap_err();

    assert!(matches!(err, EmbeddingError::RateLimited(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    Ok(())
}
