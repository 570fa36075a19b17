//! End-to-end webhook tests
//!
//! Drive both webhook endpoints against mocked platform APIs. The
//! pipelines run on spawned tasks after the ack, so assertions poll
//! the mock servers instead of reading the response.

use std::sync::Arc;
use std::time::Duration;

use application::{DispatchService, RelayPolicy, RelayService};
use axum_test::TestServer;
use integration_chatwoot::{ChatwootClient, ChatwootClientConfig};
use integration_zapi::{ZapiClient, ZapiClientConfig};
use presentation_http::{AppState, create_router};
use secrecy::SecretString;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn test_server(inbox_api: &MockServer, gateway_api: &MockServer) -> TestServer {
    let inbox = ChatwootClient::new(ChatwootClientConfig {
        base_url: inbox_api.uri(),
        access_token: SecretString::from("cw-token"),
        account_id: 1,
        inbox_id: 2,
    })
    .unwrap();
    let gateway = ZapiClient::new(ZapiClientConfig {
        base_url: gateway_api.uri(),
        instance_id: "inst".to_string(),
        instance_token: SecretString::from("tok"),
        client_token: None,
    })
    .unwrap();

    let policy = RelayPolicy {
        settle_delay: Duration::from_millis(0),
        ..RelayPolicy::default()
    };
    let state = AppState {
        relay: Arc::new(RelayService::new(Arc::new(inbox), policy)),
        dispatch: Arc::new(DispatchService::new(Arc::new(gateway))),
    };

    TestServer::new(create_router(state)).unwrap()
}

/// Poll until the mock server has seen at least `min` requests; the
/// pipeline runs detached from the webhook response.
async fn wait_for_requests(server: &MockServer, min: usize) -> Vec<Request> {
    for _ in 0..150 {
        let requests = server.received_requests().await.unwrap_or_default();
        if requests.len() >= min {
            return requests;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    server.received_requests().await.unwrap_or_default()
}

async fn mount_happy_inbox_path(inbox_api: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/1/contacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "payload": {
                "contact": {
                    "id": 41,
                    "contact_inboxes": [
                        { "source_id": "src-41", "inbox": { "id": 2 } }
                    ]
                }
            }
        })))
        .mount(inbox_api)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/1/conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 9,
            "labels": []
        })))
        .mount(inbox_api)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/1/conversations/9/labels"))
        .respond_with(ResponseTemplate::new(200))
        .mount(inbox_api)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/1/conversations/9/messages"))
        .respond_with(ResponseTemplate::new(200))
        .mount(inbox_api)
        .await;
}

#[tokio::test]
async fn inbound_text_is_relayed_through_the_full_pipeline() {
    let inbox_api = MockServer::start().await;
    let gateway_api = MockServer::start().await;
    mount_happy_inbox_path(&inbox_api).await;

    let server = test_server(&inbox_api, &gateway_api);
    let response = server
        .post("/webhook/zapi")
        .json(&serde_json::json!({
            "type": "ReceivedCallback",
            "isGroup": false,
            "fromMe": false,
            "phone": "5511888887777",
            "senderName": "Maria",
            "text": { "message": "Oi, preciso de ajuda" }
        }))
        .await;
    response.assert_status_ok();
    response.assert_text("ok");

    let requests = wait_for_requests(&inbox_api, 4).await;
    let paths: Vec<_> = requests
        .iter()
        .map(|request| request.url.path().to_string())
        .collect();
    assert_eq!(
        paths,
        vec![
            "/api/v1/accounts/1/contacts",
            "/api/v1/accounts/1/conversations",
            "/api/v1/accounts/1/conversations/9/labels",
            "/api/v1/accounts/1/conversations/9/messages",
        ]
    );

    let message: serde_json::Value = serde_json::from_slice(&requests[3].body).unwrap();
    assert_eq!(message["content"], "Oi, preciso de ajuda");
    assert_eq!(message["message_type"], "incoming");
    assert_eq!(message["private"], false);

    let labels: serde_json::Value = serde_json::from_slice(&requests[2].body).unwrap();
    assert_eq!(labels["labels"], serde_json::json!(["workflow"]));
}

#[tokio::test]
async fn inbound_conflict_reconciles_against_the_existing_contact() {
    let inbox_api = MockServer::start().await;
    let gateway_api = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/1/contacts"))
        .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
            "message": "Phone number has already been taken"
        })))
        .mount(&inbox_api)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/accounts/1/contacts/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "payload": [
                {
                    "id": 41,
                    "contact_inboxes": [
                        { "source_id": "src-41", "inbox": { "id": 2 } }
                    ]
                }
            ]
        })))
        .mount(&inbox_api)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/1/conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 9,
            "labels": ["workflow"]
        })))
        .mount(&inbox_api)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/1/conversations/9/messages"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&inbox_api)
        .await;

    let server = test_server(&inbox_api, &gateway_api);
    server
        .post("/webhook/zapi")
        .json(&serde_json::json!({
            "type": "ReceivedCallback",
            "phone": "5511888887777",
            "senderName": "Maria",
            "text": "Oi de novo"
        }))
        .await
        .assert_status_ok();

    let requests = wait_for_requests(&inbox_api, 4).await;
    let paths: Vec<_> = requests
        .iter()
        .map(|request| request.url.path().to_string())
        .collect();
    // Workflow label already present, so no labels write happens.
    assert_eq!(
        paths,
        vec![
            "/api/v1/accounts/1/contacts",
            "/api/v1/accounts/1/contacts/search",
            "/api/v1/accounts/1/conversations",
            "/api/v1/accounts/1/conversations/9/messages",
        ]
    );
}

#[tokio::test]
async fn own_echoes_are_acked_and_ignored() {
    let inbox_api = MockServer::start().await;
    let gateway_api = MockServer::start().await;

    let server = test_server(&inbox_api, &gateway_api);
    server
        .post("/webhook/zapi")
        .json(&serde_json::json!({
            "type": "ReceivedCallback",
            "fromMe": true,
            "phone": "5511888887777",
            "text": "echo of our own send"
        }))
        .await
        .assert_status_ok();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(inbox_api.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn agent_image_reply_is_sent_through_the_gateway() {
    let inbox_api = MockServer::start().await;
    let gateway_api = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/instances/inst/token/tok/send-image"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&gateway_api)
        .await;

    let server = test_server(&inbox_api, &gateway_api);
    server
        .post("/webhook/chatwoot")
        .json(&serde_json::json!({
            "event": "message_created",
            "message_type": "outgoing",
            "private": false,
            "content": "look at this",
            "conversation": {
                "contact_inbox": {
                    "contact": { "phone_number": "+55 11 99999-9999" }
                }
            },
            "attachments": [
                { "data_url": "https://cdn.example/photo.jpg", "file_type": "image" }
            ]
        }))
        .await
        .assert_status_ok();

    let requests = wait_for_requests(&gateway_api, 1).await;
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["phone"], "5511999999999");
    assert_eq!(body["image"], "https://cdn.example/photo.jpg");
    assert_eq!(body["caption"], "look at this");
}

#[tokio::test]
async fn agent_text_reply_is_sent_as_text() {
    let inbox_api = MockServer::start().await;
    let gateway_api = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/instances/inst/token/tok/send-text"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&gateway_api)
        .await;

    let server = test_server(&inbox_api, &gateway_api);
    server
        .post("/webhook/chatwoot")
        .json(&serde_json::json!({
            "event": "message_created",
            "message_type": "outgoing",
            "private": false,
            "content": "Resolvido!",
            "conversation": {
                "meta": { "sender": { "phone_number": "+5511999999999" } }
            }
        }))
        .await
        .assert_status_ok();

    let requests = wait_for_requests(&gateway_api, 1).await;
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["phone"], "5511999999999");
    assert_eq!(body["message"], "Resolvido!");
}

#[tokio::test]
async fn private_notes_never_reach_the_gateway() {
    let inbox_api = MockServer::start().await;
    let gateway_api = MockServer::start().await;

    let server = test_server(&inbox_api, &gateway_api);
    server
        .post("/webhook/chatwoot")
        .json(&serde_json::json!({
            "event": "message_created",
            "message_type": "outgoing",
            "private": true,
            "content": "internal note, do not forward",
            "conversation": {
                "contact_inbox": {
                    "contact": { "phone_number": "+5511999999999" }
                }
            }
        }))
        .await
        .assert_status_ok();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(gateway_api.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn health_endpoints_respond() {
    let inbox_api = MockServer::start().await;
    let gateway_api = MockServer::start().await;
    let server = test_server(&inbox_api, &gateway_api);

    server.get("/").await.assert_text("ok");

    let health = server.get("/health").await;
    health.assert_status_ok();
    let body: serde_json::Value = health.json();
    assert_eq!(body["status"], "ok");
}
