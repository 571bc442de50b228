mod common;

use std::{sync::Arc, time::Duration};

use common::{FakeBackend, PASSWORD};
use nutriscan::{
    core::{Session, SessionStore},
    protocol::{types::Role, ApiClient, ApiError},
};
use tokio_test::{assert_err, assert_ok};

fn client(base: &str, access: Option<&str>) -> Arc<ApiClient> {
    let session = Arc::new(SessionStore::in_memory());
    if let Some(access) = access {
        session
            .set(Session {
                access_token: access.to_string(),
                refresh_token: "refresh-0".to_string(),
                expires_at: None,
                user: None,
            })
            .unwrap();
    }
    Arc::new(ApiClient::new(base, Duration::from_secs(5), session).unwrap())
}

#[tokio::test]
async fn test_login_stores_session() {
    let fake = FakeBackend::new();
    let base = fake.spawn().await;
    let client = client(&base, None);

    let user = client.auth().login(" ana@example.com ", PASSWORD).await.unwrap();

    assert_eq!(user.name, "Ana");
    assert_eq!(user.role, Role::User);
    assert!(client.session().is_authenticated());
    assert_eq!(client.session().access_token().as_deref(), Some("access-0"));
    assert_eq!(client.users().profile().await.unwrap().id, "u1");
}

#[tokio::test]
async fn test_bad_credentials_surface_server_message() {
    let fake = FakeBackend::new();
    let base = fake.spawn().await;
    let client = client(&base, None);

    let err = client.auth().login("ana@example.com", "nope").await.unwrap_err();

    match err.downcast_ref::<ApiError>() {
        Some(ApiError::Server { status, message }) => {
            assert_eq!(*status, 401);
            assert_eq!(message, "Invalid credentials");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fake.refresh_calls(), 0);
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn test_expired_token_refreshes_and_retries() {
    let fake = FakeBackend::new();
    let base = fake.spawn().await;
    let client = client(&base, Some("expired"));

    let user = assert_ok!(client.users().profile().await);

    assert_eq!(user.email, "ana@example.com");
    assert_eq!(fake.refresh_calls(), 1);
    assert_eq!(client.session().access_token().as_deref(), Some("access-1"));
    assert_eq!(client.session().refresh_token().as_deref(), Some("refresh-1"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_unauthorized_requests_share_one_refresh() {
    let fake = FakeBackend::new();
    fake.inner.lock().refresh_delay = Duration::from_millis(100);
    let base = fake.spawn().await;
    let client = client(&base, Some("expired"));

    let requests = (0..5).map(|_| {
        let client = client.clone();
        async move { client.users().profile().await }
    });
    let results = futures::future::join_all(requests).await;

    assert!(results.iter().all(|result| result.is_ok()));
    assert_eq!(fake.refresh_calls(), 1);
    assert_eq!(client.session().access_token().as_deref(), Some("access-1"));
}

#[tokio::test]
async fn test_failed_refresh_ends_session() {
    let fake = FakeBackend::new();
    fake.inner.lock().refresh_fails = true;
    let base = fake.spawn().await;
    let client = client(&base, Some("expired"));

    let err = assert_err!(client.users().profile().await);

    assert!(matches!(err, ApiError::SessionExpired));
    assert_eq!(fake.refresh_calls(), 1);
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn test_missing_correction_list_is_empty() {
    let fake = FakeBackend::new();
    let base = fake.spawn().await;
    let client = client(&base, Some("access-0"));

    let corrections = client.corrections().list("s1").await.unwrap();

    assert!(corrections.is_empty());
    assert_eq!(fake.refresh_calls(), 0);
}

#[tokio::test]
async fn test_blank_barcode_rejected_locally() {
    let fake = FakeBackend::new();
    let base = fake.spawn().await;
    let client = client(&base, Some("access-0"));

    let err = client.products().by_barcode("   ").await.unwrap_err();

    assert!(matches!(err, ApiError::Validation { .. }));
}
