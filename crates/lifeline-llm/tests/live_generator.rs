//! The live generator against a local HTTP stand-in for an LLM API.

#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

use std::path::Path;

use chrono::NaiveDate;
use lifeline_core::generator::{EpochRequest, GenerationContext, GenerationError, StoryGenerator};
use lifeline_llm::{BackendType, LlmBackendConfig, LlmConfig, LlmStoryGenerator};
use lifeline_types::{LifePhase, YearProgress};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve every connection with the same status line and JSON body.
async fn serve(status: &'static str, body: serde_json::Value) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body = body.to_string();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let body = body.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0_u8; 4096];
                while !request_complete(&buf) {
                    match stream.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let response = format!(
                    "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    format!("http://{addr}/v1")
}

fn request_complete(buf: &[u8]) -> bool {
    let Some(head_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let head = String::from_utf8_lossy(&buf[..head_end]);
    let length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    buf.len() >= head_end + 4 + length
}

fn backend(backend_type: BackendType, api_url: String) -> LlmBackendConfig {
    LlmBackendConfig {
        backend_type,
        api_url,
        api_key: "test".to_owned(),
        model: "test-model".to_owned(),
        max_tokens: 256,
    }
}

fn templates() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, body) in [
        ("system.j2", "You are {{ request.protagonist }}."),
        ("posts.j2", "Write {{ request.posts_requested }} posts."),
        ("digest.j2", "Summarise."),
        ("epoch.j2", "Epoch {{ request.epoch_index }}."),
    ] {
        std::fs::write(dir.path().join(name), body).unwrap();
    }
    dir
}

fn generator(config: &LlmConfig, dir: &Path) -> LlmStoryGenerator {
    LlmStoryGenerator::new(config, dir).unwrap()
}

fn context() -> GenerationContext {
    GenerationContext {
        protagonist: "Xavier".to_owned(),
        age: 22.0,
        phase: LifePhase::EarlyCareer,
        phase_profile: None,
        year_progress: YearProgress::default(),
        simulated_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        total_posts: 0,
        posts_requested: 2,
        max_post_chars: 280,
        last_digest: None,
        ranked_comments: Vec::new(),
        active_epoch: None,
        upcoming_epoch: None,
        plot_points: Vec::new(),
        relationships: Vec::new(),
        recent_posts: Vec::new(),
    }
}

#[tokio::test]
async fn openai_posts_are_parsed() {
    let url = serve(
        "200 OK",
        json!({"choices": [{"message": {"content": "{\"posts\": [\"first\", \"second\"]}"}}]}),
    )
    .await;
    let dir = templates();
    let config = LlmConfig {
        primary: backend(BackendType::OpenAi, url),
        fallback: None,
    };

    let posts = generator(&config, dir.path())
        .generate_posts(&context())
        .await
        .unwrap();
    assert_eq!(posts, vec!["first", "second"]);
}

#[tokio::test]
async fn failing_primary_falls_back() {
    let broken = serve("500 Internal Server Error", json!({"error": "boom"})).await;
    let healthy = serve(
        "200 OK",
        json!({"content": [{"type": "text", "text": "{\"mainstream\": [\"AR glasses\"], \"emerging\": [\"neural links\"]}"}]}),
    )
    .await;
    let dir = templates();
    let config = LlmConfig {
        primary: backend(BackendType::OpenAi, broken),
        fallback: Some(backend(BackendType::Anthropic, healthy)),
    };

    let draft = generator(&config, dir.path())
        .generate_tech_epoch(&EpochRequest {
            epoch_index: 0,
            year_range_start: 2025,
            year_range_end: 2030,
            acceleration: 1.0,
            previous: None,
        })
        .await
        .unwrap();
    assert!(draft.mainstream.contains("AR glasses"));
    assert!(draft.emerging.contains("neural links"));
}

#[tokio::test]
async fn backend_errors_are_unavailable() {
    let broken = serve("503 Service Unavailable", json!({"error": "overloaded"})).await;
    let dir = templates();
    let config = LlmConfig {
        primary: backend(BackendType::OpenAi, broken),
        fallback: None,
    };

    let err = generator(&config, dir.path())
        .generate_posts(&context())
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Unavailable { .. }), "{err}");
}

#[tokio::test]
async fn unusable_output_is_invalid() {
    let url = serve(
        "200 OK",
        json!({"choices": [{"message": {"content": "I would rather not."}}]}),
    )
    .await;
    let dir = templates();
    let config = LlmConfig {
        primary: backend(BackendType::OpenAi, url),
        fallback: None,
    };

    // Two posts were requested, so prose is not accepted.
    let err = generator(&config, dir.path())
        .generate_posts(&context())
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::InvalidResponse { .. }), "{err}");
}
