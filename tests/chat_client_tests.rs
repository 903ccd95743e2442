use std::sync::Arc;
use std::time::Duration;

use daybook_app_lib::error::{AppError, AttemptError};
use daybook_app_lib::models::ai::PromptMessage;
use daybook_app_lib::models::settings::AiSettings;
use daybook_app_lib::services::chat_client::{ChatCompletionClient, ChatExecutor};
use daybook_app_lib::services::rate_limiter::RateLimiter;
use daybook_app_lib::utils::clock::testing::{ManualClock, RecordingSleeper};
use httpmock::prelude::*;
use serde_json::json;

struct Harness {
    client: ChatCompletionClient,
    retry_sleeper: RecordingSleeper,
    limiter_sleeper: RecordingSleeper,
}

fn settings_for(base_url: &str) -> AiSettings {
    AiSettings {
        api_key: Some("test-key".to_string()),
        base_url: base_url.to_string(),
        ..AiSettings::default()
    }
}

fn harness(settings: AiSettings) -> Harness {
    let limiter_clock = ManualClock::new();
    let limiter_sleeper = RecordingSleeper::new(limiter_clock.clone());
    let limiter = Arc::new(RateLimiter::with_clock(
        settings.min_request_interval(),
        Arc::new(limiter_clock),
        Arc::new(limiter_sleeper.clone()),
    ));

    let retry_sleeper = RecordingSleeper::new(ManualClock::new());
    let client = ChatCompletionClient::try_new(&settings, limiter)
        .expect("client")
        .with_sleeper(Arc::new(retry_sleeper.clone()));

    Harness {
        client,
        retry_sleeper,
        limiter_sleeper,
    }
}

fn conversation() -> Vec<PromptMessage> {
    vec![
        PromptMessage::system("你是一个任务分析专家"),
        PromptMessage::user("任务列表：\n买菜"),
    ]
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "cmpl-1",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    })
}

#[tokio::test]
async fn success_returns_fence_stripped_content() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .header("authorization", "Bearer test-key")
                .header("content-type", "application/json")
                .json_body_partial(
                    r#"{
                        "model": "deepseek-ai/DeepSeek-R1-Distill-Qwen-1.5B",
                        "temperature": 0.3,
                        "max_tokens": 2048,
                        "stream": false,
                        "presence_penalty": 0.0,
                        "frequency_penalty": 0.0,
                        "top_p": 0.95,
                        "messages": [
                            { "role": "system", "content": "你是一个任务分析专家" },
                            { "role": "user", "content": "任务列表：\n买菜" }
                        ]
                    }"#,
                );
            then.status(200)
                .json_body(completion("```json\n[{\"title\":\"买菜\"}]\n```\n"));
        })
        .await;

    let harness = harness(settings_for(&server.base_url()));
    let content = harness
        .client
        .execute(&conversation())
        .await
        .expect("completion");

    assert_eq!(content, "[{\"title\":\"买菜\"}]");
    assert_eq!(mock.hits_async().await, 1);
    assert!(harness.retry_sleeper.calls().is_empty());
}

#[tokio::test]
async fn always_failing_endpoint_makes_five_attempts_with_backoff() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(503)
                .json_body(json!({ "error": { "message": "upstream busy" } }));
        })
        .await;

    let harness = harness(settings_for(&server.base_url()));
    let error = harness
        .client
        .execute(&conversation())
        .await
        .expect_err("exhausted");

    assert_eq!(mock.hits_async().await, 5);
    assert_eq!(
        harness.retry_sleeper.calls(),
        vec![
            Duration::from_millis(1000),
            Duration::from_millis(2000),
            Duration::from_millis(4000),
            Duration::from_millis(8000),
        ]
    );

    match &error {
        AppError::RequestFailure {
            attempts,
            correlation_id,
            source,
        } => {
            assert_eq!(*attempts, 5);
            assert!(correlation_id.is_some());
            assert_eq!(
                source,
                &AttemptError::HttpStatus {
                    status: 503,
                    message: "upstream busy".into()
                }
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        error.last_attempt_error().map(ToString::to_string).as_deref(),
        Some("API 请求失败: 503 - upstream busy")
    );
}

#[tokio::test]
async fn error_body_without_message_uses_generic_text() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(401).body("unauthorized");
        })
        .await;

    let harness = harness(AiSettings {
        max_attempts: 1,
        ..settings_for(&server.base_url())
    });
    let error = harness
        .client
        .execute(&conversation())
        .await
        .expect_err("unauthorized");

    assert_eq!(
        error.last_attempt_error(),
        Some(&AttemptError::HttpStatus {
            status: 401,
            message: "未知错误".into()
        })
    );
}

#[tokio::test]
async fn blank_content_is_retried_then_reported_as_malformed() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).json_body(completion("```json\n   \n```"));
        })
        .await;

    let harness = harness(settings_for(&server.base_url()));
    let error = harness
        .client
        .execute(&conversation())
        .await
        .expect_err("malformed");

    assert_eq!(mock.hits_async().await, 5);
    assert!(matches!(error, AppError::MalformedResponse { .. }));
    assert!(error.correlation_id().is_some());
}

#[tokio::test]
async fn unreadable_success_body_is_malformed() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).body("<html>gateway</html>");
        })
        .await;

    let harness = harness(AiSettings {
        max_attempts: 2,
        ..settings_for(&server.base_url())
    });
    let error = harness
        .client
        .execute(&conversation())
        .await
        .expect_err("malformed");

    assert!(matches!(error, AppError::MalformedResponse { .. }));
    assert_eq!(harness.retry_sleeper.calls(), vec![Duration::from_millis(1000)]);
}

#[tokio::test]
async fn slow_endpoint_times_out_per_attempt() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200)
                .delay(Duration::from_millis(2500))
                .json_body(completion("[]"));
        })
        .await;

    let harness = harness(AiSettings {
        request_timeout_secs: 1,
        max_attempts: 2,
        ..settings_for(&server.base_url())
    });
    let error = harness
        .client
        .execute(&conversation())
        .await
        .expect_err("timeout");

    assert_eq!(mock.hits_async().await, 2);
    assert_eq!(error.last_attempt_error(), Some(&AttemptError::Timeout));
}

#[tokio::test]
async fn unreachable_host_is_a_network_failure() {
    let harness = harness(AiSettings {
        max_attempts: 1,
        ..settings_for("http://127.0.0.1:1")
    });
    let error = harness
        .client
        .execute(&conversation())
        .await
        .expect_err("refused");

    assert!(matches!(
        error.last_attempt_error(),
        Some(AttemptError::Network(_))
    ));
}

#[tokio::test]
async fn rate_limiter_gate_is_taken_once_per_execute() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).json_body(completion("{\"ok\":true}"));
        })
        .await;

    let harness = harness(settings_for(&server.base_url()));
    harness.client.execute(&conversation()).await.expect("first");
    harness.client.execute(&conversation()).await.expect("second");

    assert_eq!(mock.hits_async().await, 2);
    assert_eq!(
        harness.limiter_sleeper.calls(),
        vec![Duration::from_millis(1000)]
    );
    assert!(harness.retry_sleeper.calls().is_empty());
}

#[test]
fn endpoint_is_derived_from_base_url() {
    let harness = harness(settings_for("https://example.test/v1/"));
    assert_eq!(harness.client.endpoint(), "https://example.test/v1/chat/completions");
}
