//! Cohere connector tests against a mock HTTP server

use std::sync::{Arc, Mutex};

use ai_connectors::cohere::{CohereChatGenerator, CohereConfig, CohereGenerator};
use ai_connectors::{AIConnectorError, ChatGenerator, ChatMessage, StreamingChunk};
use genai_config::Secret;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> CohereConfig {
    CohereConfig::new(Secret::from_token("test-api-key")).with_base_url(server.uri())
}

#[tokio::test]
async fn test_generator_run_returns_first_reply() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat"))
        .and(header("Authorization", "Bearer test-api-key"))
        .and(body_partial_json(json!({
            "message": "What's the capital of France?",
            "model": "command-r",
            "chat_history": [],
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "Paris",
            "generation_id": "gen-1",
            "finish_reason": "COMPLETE",
            "meta": { "billed_units": { "input_tokens": 7, "output_tokens": 1 } }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let generator = CohereGenerator::new(config(&mock_server)).unwrap();
    let output = generator.run("What's the capital of France?").await.unwrap();

    assert_eq!(output.replies, vec!["Paris".to_string()]);
    assert_eq!(output.meta.len(), 1);
    let meta = &output.meta[0];
    assert_eq!(meta["finish_reason"], json!("COMPLETE"));
    assert_eq!(meta["model"], json!("command-r"));
    assert_eq!(meta["index"], json!(0));
    assert_eq!(
        meta["usage"],
        json!({ "prompt_tokens": 7, "completion_tokens": 1 })
    );
}

#[tokio::test]
async fn test_generator_forwards_extra_kwargs() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat"))
        .and(body_partial_json(json!({
            "model": "command-r-plus",
            "temperature": 0.5,
            "max_tokens": 20
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "ok",
            "finish_reason": "COMPLETE"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut kwargs = ai_connectors::Meta::new();
    kwargs.insert("temperature".to_string(), json!(0.5));
    kwargs.insert("max_tokens".to_string(), json!(20));
    let generator = CohereGenerator::new(
        config(&mock_server)
            .with_model("command-r-plus")
            .with_generation_kwargs(kwargs),
    )
    .unwrap();

    let output = generator.run("hello").await.unwrap();
    assert_eq!(output.replies, vec!["ok".to_string()]);
    assert!(output.meta[0].get("usage").is_none());
}

#[tokio::test]
async fn test_chat_sends_history_and_citations() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat"))
        .and(body_partial_json(json!({
            "message": "And Germany?",
            "chat_history": [
                { "role": "USER", "message": "Capital of France?" },
                { "role": "CHATBOT", "message": "Paris" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "Berlin",
            "finish_reason": "COMPLETE",
            "citations": [{ "start": 0, "end": 6, "text": "Berlin", "document_ids": ["doc_0"] }],
            "documents": [{ "id": "doc_0", "snippet": "Berlin is the capital" }]
        })))
        .mount(&mock_server)
        .await;

    let chat = CohereChatGenerator::new(config(&mock_server)).unwrap();
    let replies = chat
        .run(&[
            ChatMessage::from_user("Capital of France?"),
            ChatMessage::from_assistant("Paris"),
            ChatMessage::from_user("And Germany?"),
        ])
        .await
        .unwrap();

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].text, "Berlin");
    assert_eq!(replies[0].meta["citations"][0]["document_ids"], json!(["doc_0"]));
    assert_eq!(replies[0].meta["documents"][0]["id"], json!("doc_0"));
}

#[tokio::test]
async fn test_streaming_invokes_callback_per_chunk() {
    let mock_server = MockServer::start().await;

    let events = [
        json!({ "is_finished": false, "event_type": "stream-start", "generation_id": "gen-2" }),
        json!({ "is_finished": false, "event_type": "text-generation", "text": "The" }),
        json!({ "is_finished": false, "event_type": "text-generation", "text": " capital" }),
        json!({ "is_finished": false, "event_type": "text-generation", "text": " is Paris." }),
        json!({
            "is_finished": true,
            "event_type": "stream-end",
            "finish_reason": "COMPLETE",
            "response": {
                "text": "The capital is Paris.",
                "finish_reason": "COMPLETE",
                "meta": { "billed_units": { "input_tokens": 5, "output_tokens": 4 } }
            }
        }),
    ];
    let ndjson = events
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n");

    Mock::given(method("POST"))
        .and(path("/v1/chat"))
        .and(body_partial_json(json!({ "stream": true })))
        .respond_with(ResponseTemplate::new(200).set_body_string(ndjson))
        .expect(1)
        .mount(&mock_server)
        .await;

    let chunks: Arc<Mutex<Vec<StreamingChunk>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = chunks.clone();
    let generator = CohereGenerator::new(
        config(&mock_server).with_streaming_callback(Arc::new(move |chunk: &StreamingChunk| {
            sink.lock().unwrap().push(chunk.clone());
        })),
    )
    .unwrap();

    let output = generator.run("What's the capital of France?").await.unwrap();

    let received: Vec<String> = chunks
        .lock()
        .unwrap()
        .iter()
        .map(|c| c.content.clone())
        .collect();
    assert_eq!(received, vec!["The", " capital", " is Paris."]);
    assert_eq!(output.replies, vec!["The capital is Paris.".to_string()]);
    assert_eq!(output.meta[0]["finish_reason"], json!("COMPLETE"));
    assert_eq!(
        output.meta[0]["usage"],
        json!({ "prompt_tokens": 5, "completion_tokens": 4 })
    );
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "invalid api token" })),
        )
        .mount(&mock_server)
        .await;

    let generator = CohereGenerator::new(config(&mock_server)).unwrap();
    let err = generator.run("hello").await.unwrap_err();
    assert!(matches!(err, AIConnectorError::AuthenticationError(_)));
    assert!(err.to_string().contains("invalid api token"));
}

#[tokio::test]
async fn test_api_key_resolved_from_fallback_env_var() {
    std::env::remove_var("COHERE_IT_PRIMARY_KEY");
    std::env::set_var("COHERE_IT_FALLBACK_KEY", "fallback-key");

    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat"))
        .and(header("Authorization", "Bearer fallback-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "hi" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = CohereConfig::new(Secret::from_env_var([
        "COHERE_IT_PRIMARY_KEY",
        "COHERE_IT_FALLBACK_KEY",
    ]))
    .with_base_url(mock_server.uri());
    let generator = CohereGenerator::new(config).unwrap();

    let output = generator.run("hello").await.unwrap();
    assert_eq!(output.replies, vec!["hi".to_string()]);
}

#[test]
fn test_missing_api_key_fails_construction() {
    let config = CohereConfig::new(Secret::from_env_var([
        "COHERE_IT_UNSET_PRIMARY",
        "COHERE_IT_UNSET_FALLBACK",
    ]));
    assert!(matches!(
        CohereGenerator::new(config),
        Err(AIConnectorError::MissingCredential(_))
    ));
}

#[tokio::test]
async fn test_slow_response_maps_to_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "text": "too late" }))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let generator = CohereGenerator::new(CohereConfig {
        timeout_seconds: 1,
        ..config(&mock_server)
    })
    .unwrap();

    assert!(matches!(
        generator.run("hello").await,
        Err(AIConnectorError::Timeout(_))
    ));
}
