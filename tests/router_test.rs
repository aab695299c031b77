// tests/router_test.rs
// Model router: registration, dispatch by request kind, error surfacing, deadlines

mod common;

use aiden::llm::{
    ChatMessage, ModelAdapter, ModelRouter, ProviderError, RouteError, RouteOutput, RoutePayload,
};
use common::{BLOCKING_REPORT, ScriptedAdapter};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_last_registration_wins() {
    let router = ModelRouter::new();
    let first = Arc::new(ScriptedAdapter::replying("first", "from first"));
    let second = Arc::new(ScriptedAdapter::replying("second", "from second"));

    assert!(router.register("gpt-4", first.clone()).await.is_none());
    let replaced = router.register("gpt-4", second.clone()).await;
    assert_eq!(replaced.map(|a| a.name().to_string()), Some("first".to_string()));

    let output = router
        .route("gpt-4", "chat", RoutePayload::chat(vec![ChatMessage::user("hi")]))
        .await
        .unwrap();
    assert_eq!(output, RouteOutput::Text("from second".into()));
    assert_eq!(first.calls(), 0);
    assert_eq!(second.calls(), 1);
    assert_eq!(router.model_names().await, vec!["gpt-4"]);
}

#[tokio::test]
async fn test_one_adapter_under_several_names() {
    let router = ModelRouter::new();
    let shared = Arc::new(ScriptedAdapter::replying("openai", "ok"));
    router.register("gpt-4", shared.clone()).await;
    router.register("gpt-3.5-turbo", shared.clone()).await;

    for name in ["gpt-4", "gpt-3.5-turbo"] {
        router
            .chat(name, vec![ChatMessage::user("ping")], Default::default())
            .await
            .unwrap();
    }
    assert_eq!(shared.calls(), 2);
}

// ============================================================================
// Rejections happen before any provider call
// ============================================================================

#[tokio::test]
async fn test_unknown_model_not_found() {
    let router = ModelRouter::new();
    let adapter = Arc::new(ScriptedAdapter::replying("openai", "ok"));
    router.register("gpt-4", adapter.clone()).await;

    let err = router
        .route("gpt-5", "chat", RoutePayload::chat(vec![ChatMessage::user("hi")]))
        .await
        .unwrap_err();
    assert!(matches!(&err, RouteError::ModelNotFound(name) if name == "gpt-5"));
    assert_eq!(err.to_string(), "Model gpt-5 not found");
    assert_eq!(adapter.calls(), 0);
}

#[tokio::test]
async fn test_unknown_request_kind() {
    let router = ModelRouter::new();
    let adapter = Arc::new(ScriptedAdapter::replying("openai", "ok"));
    router.register("gpt-4", adapter.clone()).await;

    let err = router
        .route("gpt-4", "summarize", RoutePayload::chat(vec![ChatMessage::user("hi")]))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Unknown request type: summarize");
    assert_eq!(adapter.calls(), 0);
}

#[tokio::test]
async fn test_model_checked_before_kind() {
    let router = ModelRouter::new();
    let err = router
        .route("nope", "summarize", RoutePayload::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RouteError::ModelNotFound(_)));
}

#[tokio::test]
async fn test_missing_payload_fields() {
    let router = ModelRouter::new();
    let adapter = Arc::new(ScriptedAdapter::replying("openai", "ok"));
    router.register("gpt-4", adapter.clone()).await;

    let err = router
        .route("gpt-4", "code_analysis", RoutePayload::chat(vec![ChatMessage::user("hi")]))
        .await
        .unwrap_err();
    assert!(matches!(err, RouteError::MissingPayload { field: "code", .. }));

    let err = router
        .route("gpt-4", "chat", RoutePayload::code("x = 1"))
        .await
        .unwrap_err();
    assert!(matches!(err, RouteError::MissingPayload { field: "messages", .. }));

    assert_eq!(adapter.calls(), 0);
}

// ============================================================================
// Dispatch
// ============================================================================

#[tokio::test]
async fn test_chat_passes_messages_through() {
    let router = ModelRouter::new();
    let adapter = Arc::new(ScriptedAdapter::replying("claude", "hello back"));
    router.register("claude", adapter.clone()).await;

    let messages = vec![ChatMessage::system("be brief"), ChatMessage::user("hello")];
    let reply = router
        .chat("claude", messages.clone(), Default::default())
        .await
        .unwrap();
    assert_eq!(reply, "hello back");
    assert_eq!(adapter.seen_messages(), messages);
}

#[tokio::test]
async fn test_code_analysis_returns_structured_report() {
    let router = ModelRouter::new();
    let adapter = Arc::new(ScriptedAdapter::replying("openai", "").with_analysis(BLOCKING_REPORT));
    router.register("gpt-4", adapter.clone()).await;

    let output = router
        .route("gpt-4", "code_analysis", RoutePayload::code("def f(): pass"))
        .await
        .unwrap();
    let RouteOutput::Analysis(analysis) = output else {
        panic!("expected an analysis");
    };
    assert_eq!(analysis.potential_issues.len(), 1);
    assert_eq!(analysis.critical_issues().len(), 1);
    assert_eq!(adapter.seen_code().as_deref(), Some("def f(): pass"));
}

#[tokio::test]
async fn test_provider_failure_names_provider() {
    let router = ModelRouter::new();
    router
        .register("claude", Arc::new(ScriptedAdapter::failing("claude", "connection refused")))
        .await;

    let err = router
        .route("claude", "code_analysis", RoutePayload::code("print('hi')"))
        .await
        .unwrap_err();
    match err {
        RouteError::Provider(ProviderError::CallFailed { provider, message }) => {
            assert_eq!(provider, "claude");
            assert!(message.contains("connection refused"));
        }
        other => panic!("expected CallFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unparseable_analysis_is_parse_failure() {
    let router = ModelRouter::new();
    router
        .register(
            "gpt-4",
            Arc::new(ScriptedAdapter::replying("openai", "").with_analysis("{'potential_issues': []}")),
        )
        .await;

    let err = router
        .analyze_code("gpt-4", "x = 1", Default::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RouteError::Provider(ProviderError::ResponseParseFailed { .. })
    ));
}

// ============================================================================
// Deadlines
// ============================================================================

#[tokio::test]
async fn test_slow_adapter_times_out() {
    let router = ModelRouter::new().with_timeout(Some(Duration::from_millis(50)));
    router
        .register(
            "gpt-4",
            Arc::new(ScriptedAdapter::replying("openai", "late").with_delay(Duration::from_secs(5))),
        )
        .await;

    let err = router
        .chat("gpt-4", vec![ChatMessage::user("hi")], Default::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RouteError::TimedOut { ref model, .. } if model == "gpt-4"));
}

#[tokio::test]
async fn test_concurrent_requests_share_registry() {
    let router = Arc::new(ModelRouter::new());
    let adapter = Arc::new(ScriptedAdapter::replying("openai", "ok").with_delay(Duration::from_millis(20)));
    router.register("gpt-4", adapter.clone()).await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let router = router.clone();
        handles.push(tokio::spawn(async move {
            router
                .chat("gpt-4", vec![ChatMessage::user(format!("req {i}"))], Default::default())
                .await
        }));
    }
    // Registration is not blocked by in-flight calls
    router
        .register("claude", Arc::new(ScriptedAdapter::replying("claude", "ok")))
        .await;

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "ok");
    }
    assert_eq!(adapter.calls(), 8);
}
