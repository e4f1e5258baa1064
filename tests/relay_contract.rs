//! Mail Relay Contract Tests
//!
//! Verify the request the relay transport sends and how it maps relay
//! responses and stalls onto notify errors.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use visitor_presence::notify::{Notification, Notifier, RelayNotifier, dispatch};
use visitor_presence::visitor::{JsonFilePersistence, StoreOptions};
use visitor_presence::{PresenceStore, VisitorError};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn relay(server: &MockServer, timeout: Duration) -> RelayNotifier {
    RelayNotifier::new(
        format!("{}/send", server.uri()),
        "desk@example.com",
        "security@example.com",
        "relay-secret",
        timeout,
    )
    .expect("build relay")
}

#[tokio::test]
async fn test_request_carries_addresses_subject_and_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/send"))
        .and(header("authorization", "Bearer relay-secret"))
        .and(body_partial_json(json!({
            "from": "desk@example.com",
            "to": "security@example.com",
            "subject": "Sign In Confirmation",
            "text": "hello"
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&mock_server)
        .await;

    let notifier = relay(&mock_server, Duration::from_secs(5));
    let result = notifier
        .notify(&Notification::new("Sign In Confirmation", "hello"))
        .await;

    assert!(result.is_ok(), "relay send failed: {result:?}");
}

#[tokio::test]
async fn test_error_status_is_notify_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(502).set_body_string("smtp upstream down"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let notifier = relay(&mock_server, Duration::from_secs(5));
    let err = notifier
        .notify(&Notification::new("s", "b"))
        .await
        .expect_err("502 should fail");

    match err {
        VisitorError::Notify(msg) => {
            assert!(msg.contains("502"), "message was: {msg}");
            assert!(msg.contains("smtp upstream down"), "message was: {msg}");
        }
        other => panic!("expected Notify, got {other:?}"),
    }
}

#[tokio::test]
async fn test_stalled_relay_is_bounded_by_dispatch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&mock_server)
        .await;

    let notifier = relay(&mock_server, Duration::from_secs(30));
    let started = std::time::Instant::now();
    let result = dispatch(
        &notifier,
        &Notification::new("s", "b"),
        Duration::from_millis(200),
    )
    .await;

    assert!(result.is_err());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_relay_outage_does_not_undo_sign_in() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let store = PresenceStore::open(
        Arc::new(JsonFilePersistence::new(dir.path().join("visitors.json"))),
        Arc::new(relay(&mock_server, Duration::from_secs(5))),
        StoreOptions::default(),
    )
    .expect("open store");

    store
        .sign_in("Jane Doe", "Acme", "555-1234", "Bob")
        .await
        .expect("sign-in succeeds despite relay outage");
    assert_eq!(store.list_present().await, vec!["Jane Doe".to_owned()]);

    let closed = store
        .sign_out("Jane Doe")
        .await
        .expect("sign-out succeeds despite relay outage");
    assert!(closed.signed_out());
}
