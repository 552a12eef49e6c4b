use std::sync::Arc;

use serde_json::json;
use tumiki_auth::password::hash_password;
use tumiki_auth::{
    AdapterCredentialStore, AuthError, Credential, LoginService, SessionTokenIssuer,
};
use tumiki_db_memory::InMemoryDocumentStore;
use tumiki_storage::StorageAdapter;

async fn service() -> (Arc<InMemoryDocumentStore>, LoginService) {
    let store = InMemoryDocumentStore::shared();
    let credentials = AdapterCredentialStore::new(StorageAdapter::new(store.clone()));
    credentials
        .save(&Credential {
            id: "alice".into(),
            password_hash: hash_password("pw123").unwrap(),
            name: Some("Alice".into()),
            role: "admin".into(),
            permission: json!("all"),
            affiliation: Some("Tumiki".into()),
            workplace: None,
            furigana: Some("ありす".into()),
        })
        .await
        .unwrap();

    let issuer = Arc::new(SessionTokenIssuer::new("login-test-secret").unwrap());
    (store, LoginService::new(Arc::new(credentials), issuer))
}

#[tokio::test]
async fn valid_credentials_yield_token_and_profile() {
    let (_, service) = service().await;
    let outcome = service.login("alice", "pw123").await.unwrap();

    assert_eq!(outcome.user.id, "alice");
    assert_eq!(outcome.user.username, "alice");
    assert_eq!(outcome.user.role, "admin");
    assert_eq!(outcome.user.name.as_deref(), Some("Alice"));

    let claims = service.issuer().verify(&outcome.token).unwrap();
    assert_eq!(claims.subject(), "alice");
    assert_eq!(claims.identity.permission, json!("all"));
}

#[tokio::test]
async fn wrong_password_and_unknown_user_fail_identically() {
    let (_, service) = service().await;

    let wrong = service.login("alice", "nope").await.unwrap_err();
    let unknown = service.login("mallory", "pw123").await.unwrap_err();

    assert!(matches!(wrong, AuthError::InvalidCredentials));
    assert!(matches!(unknown, AuthError::InvalidCredentials));
    assert_eq!(wrong.to_string(), unknown.to_string());
}

#[tokio::test]
async fn missing_fields_are_validation_errors() {
    let (store, service) = service().await;
    store.reset_stats();

    assert!(matches!(
        service.login("", "pw123").await,
        Err(AuthError::Validation { .. })
    ));
    assert!(matches!(
        service.login("alice", "").await,
        Err(AuthError::Validation { .. })
    ));
    assert_eq!(store.stats().gets, 0);
}
