//! End-to-end tests of the API client against a mock server.

use casechat_client::{ApiClient, ClientConfig, ClientError, MessageStore};
use casechat_core::{CaseId, Citation, ConversationId, Role};
use casechat_streaming::{Completion, Phase, StreamError, StreamSession};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ApiClient {
    let config = ClientConfig::new(&format!("{}/api", server.uri())).unwrap();
    ApiClient::new(config).unwrap()
}

fn sse(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/event-stream")
}

#[tokio::test]
async fn test_streamed_exchange() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"type\":\"token\",\"content\":\"Rent is due \"}\n\n",
        "data: {\"type\":\"token\",\"content\":\"monthly [Source 1].\"}\n\n",
        "data: {\"type\":\"done\",\"content\":\"\",\"citations\":[",
        "{\"source_index\":1,\"document_name\":\"lease.pdf\",\"page_numbers\":[2],\"snippet\":\"payable monthly\"}",
        "]}\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/api/conversations/c-1/messages"))
        .and(body_json(json!({"content": "When is rent due?"})))
        .respond_with(sse(body))
        .expect(1)
        .mount(&server)
        .await;

    let completions = Arc::new(Mutex::new(Vec::new()));
    let seen = completions.clone();
    let session = StreamSession::new(Arc::new(client_for(&server)))
        .with_completion_handler(move |c: &Completion| seen.lock().unwrap().push(c.clone()));

    let exchange = session
        .send(&ConversationId::from("c-1"), "When is rent due?")
        .await
        .unwrap();

    assert_eq!(exchange.text, "Rent is due monthly [Source 1].");
    assert_eq!(
        exchange.citations,
        vec![Citation::new(1, "lease.pdf", vec![2], "payable monthly")]
    );
    assert!(exchange.saw_done);
    assert_eq!(session.phase(), Phase::Idle);

    let completions = completions.lock().unwrap();
    assert_eq!(completions.len(), 1);
    assert!(completions[0].is_success());
}

#[tokio::test]
async fn test_server_error_fails_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/conversations/c-1/messages"))
        .respond_with(ResponseTemplate::new(500).set_body_string("index offline"))
        .mount(&server)
        .await;

    let session = StreamSession::new(Arc::new(client_for(&server)));
    let err = session
        .send(&ConversationId::from("c-1"), "hello")
        .await
        .unwrap_err();

    match err {
        StreamError::Http { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "index offline");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let state = session.state();
    assert_eq!(state.phase(), Phase::Error);
    assert!(state.error().is_some());
    assert_eq!(state.accumulated_text(), "");
}

#[tokio::test]
async fn test_reply_without_done_is_truncated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(sse("data: {\"type\":\"token\",\"content\":\"partial\"}\n\n"))
        .mount(&server)
        .await;

    let session = StreamSession::new(Arc::new(client_for(&server)));
    let exchange = session
        .send(&ConversationId::from("c-1"), "hello")
        .await
        .unwrap();

    assert_eq!(exchange.text, "partial");
    assert!(exchange.is_truncated());
    assert_eq!(session.phase(), Phase::Idle);
}

#[tokio::test]
async fn test_get_messages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/conversations/c-1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "m-1", "conversation_id": "c-1", "role": "user", "content": "q",
             "created_at": "2024-05-01T10:00:00Z"},
            {"id": "m-2", "conversation_id": "c-1", "role": "assistant", "content": "a [Source 1]",
             "citations": [{"source_index": 1, "document_name": "d.pdf", "page_numbers": [1], "snippet": "s"}],
             "created_at": "2024-05-01T10:00:05Z"}
        ])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let messages = client
        .fetch_messages(&ConversationId::from("c-1"))
        .await
        .unwrap();

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[1].citations.len(), 1);
}

#[tokio::test]
async fn test_get_messages_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such conversation"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_messages(&ConversationId::from("missing"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_invalid_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_messages(&ConversationId::from("c-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Serialization(_)));
}

#[tokio::test]
async fn test_json_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let config = ClientConfig::new(&format!("{}/api", server.uri()))
        .unwrap()
        .with_timeout(Duration::from_millis(100));
    let err = ApiClient::new(config)
        .unwrap()
        .get_messages(&ConversationId::from("c-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Timeout(_)));
}

#[tokio::test]
async fn test_list_and_create_conversations() {
    let server = MockServer::start().await;
    let conversation = json!({
        "id": "c-7", "case_id": "k-1", "title": "New Conversation",
        "created_at": "2024-05-01T10:00:00Z"
    });
    Mock::given(method("GET"))
        .and(path("/api/cases/k-1/conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([conversation.clone()])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/cases/k-1/conversations"))
        .and(body_json(json!({"title": "New Conversation"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(conversation))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let case_id = CaseId::from("k-1");

    let created = client.create_conversation(&case_id, Some("  ")).await.unwrap();
    assert_eq!(created.id.as_str(), "c-7");
    assert_eq!(created.title, "New Conversation");

    let listed = client.list_conversations(&case_id).await.unwrap();
    assert_eq!(listed, vec![created]);
}
