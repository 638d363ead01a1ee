//! HTTP-level tests for the notification gateway and the token cache.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ticketops_core::auth::TokenCache;
use ticketops_core::config::{AuthConfig, GatewayConfig};
use ticketops_core::error::Error;
use ticketops_core::gateway::{FeedbackReceipt, HttpNotificationGateway, NotificationGateway};

fn gateway_config(server: &MockServer) -> GatewayConfig {
    GatewayConfig {
        template_api_url: format!("{}/messages", server.uri()),
        template_api_key: "test-key".to_string(),
        template_namespace: "test-namespace".to_string(),
        receipt_api_url: format!("{}/receipts", server.uri()),
        feedback_question: "How did we do?".to_string(),
        retry_attempts: 3,
        retry_base_delay_ms: 5,
        ..GatewayConfig::default()
    }
}

fn auth_config(server: &MockServer) -> AuthConfig {
    AuthConfig {
        token_url: format!("{}/token", server.uri()),
        client_id: "3".to_string(),
        client_secret: "secret".to_string(),
        ..AuthConfig::default()
    }
}

fn token_body(token: &str, expires_in: u64) -> serde_json::Value {
    serde_json::json!({ "access_token": token, "expires_in": expires_in })
}

fn receipt() -> FeedbackReceipt {
    FeedbackReceipt {
        destination: "+62812000111".to_string(),
        customer_id: Some(501),
        ticket_id: 1,
        update_id: 42,
        assigned_seq: 2,
    }
}

// ============================================================================
// Template sends
// ============================================================================

#[tokio::test]
async fn template_send_carries_the_api_key_and_body_parameter() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("X-Api-Key", "test-key"))
        .and(body_partial_json(serde_json::json!({
            "to": "+62812000111",
            "template": {
                "name": "feedback_score_v05",
                "language": { "code": "id" },
                "components": [
                    { "type": "body", "parameters": [{ "type": "text", "text": "Helpdesk Agent" }] },
                ],
            },
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = HttpNotificationGateway::new(
        gateway_config(&server),
        Arc::new(TokenCache::new(AuthConfig::default())),
    );
    gateway
        .send_feedback_template("+62812000111", "Helpdesk Agent")
        .await
        .unwrap();
}

#[tokio::test]
async fn rate_limited_send_retries_and_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = HttpNotificationGateway::new(
        gateway_config(&server),
        Arc::new(TokenCache::new(AuthConfig::default())),
    );
    gateway
        .send_feedback_template("+62812000111", "Helpdesk Agent")
        .await
        .unwrap();
}

#[tokio::test]
async fn rate_limited_send_gives_up_after_the_ceiling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let gateway = HttpNotificationGateway::new(
        gateway_config(&server),
        Arc::new(TokenCache::new(AuthConfig::default())),
    );
    let error = gateway
        .send_feedback_template("+62812000111", "Helpdesk Agent")
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        Error::RateLimited {
            service: "feedback template",
            attempts: 3,
        }
    ));
}

#[tokio::test]
async fn other_send_errors_propagate_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = HttpNotificationGateway::new(
        gateway_config(&server),
        Arc::new(TokenCache::new(AuthConfig::default())),
    );
    let error = gateway
        .send_feedback_template("+62812000111", "Helpdesk Agent")
        .await
        .unwrap_err();

    assert!(matches!(error, Error::Http(_)));
}

// ============================================================================
// Receipts and the token cache
// ============================================================================

#[tokio::test]
async fn receipt_is_sent_with_a_cached_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok-1", 7200)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/receipts"))
        .and(header("Authorization", "Bearer tok-1"))
        .and(body_partial_json(serde_json::json!({
            "destination": "+62812000111",
            "ticket_id": 1,
            "update_id": 42,
            "assigned_no": 2,
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let tokens = Arc::new(TokenCache::new(auth_config(&server)));
    let gateway = HttpNotificationGateway::new(gateway_config(&server), tokens);

    gateway.persist_feedback_receipt(&receipt()).await.unwrap();
    gateway.persist_feedback_receipt(&receipt()).await.unwrap();
}

#[tokio::test]
async fn rejected_token_is_invalidated_and_refetched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok-1", 7200)))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/receipts"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let tokens = Arc::new(TokenCache::new(auth_config(&server)));
    let gateway = HttpNotificationGateway::new(gateway_config(&server), tokens);

    assert!(gateway.persist_feedback_receipt(&receipt()).await.is_err());
    assert!(gateway.persist_feedback_receipt(&receipt()).await.is_err());
}

#[tokio::test]
async fn token_inside_the_refresh_margin_is_refreshed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok-1", 100)))
        .expect(2)
        .mount(&server)
        .await;

    // expires_in 100s sits inside the default 3600s refresh margin, so the
    // second call cannot reuse the cache.
    let tokens = TokenCache::new(auth_config(&server));
    tokens.bearer_token().await.unwrap();
    tokens.bearer_token().await.unwrap();
}

#[tokio::test]
async fn concurrent_callers_share_a_single_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("tok-1", 7200))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tokens = Arc::new(TokenCache::new(auth_config(&server)));
    let (a, b) = tokio::join!(tokens.bearer_token(), tokens.bearer_token());
    assert_eq!(a.unwrap(), "tok-1");
    assert_eq!(b.unwrap(), "tok-1");
}

#[tokio::test]
async fn missing_token_url_is_a_configuration_error() {
    let tokens = TokenCache::new(AuthConfig::default());
    assert!(matches!(
        tokens.bearer_token().await.unwrap_err(),
        Error::Auth(_)
    ));
}
