use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_cell::models::{AuthCellError, LoginRequest, SignUpRequest};
use auth_cell::services::auth::AuthService;
use auth_cell::services::identity::IdentityToolkitClient;
use shared_database::{HierarchicalStore, MemoryStore};
use shared_utils::jwt::validate_token;
use shared_utils::test_utils::{StoreFixtures, TestConfig};

async fn setup(store: MemoryStore) -> (MockServer, AuthService) {
    let server = MockServer::start().await;
    let config = TestConfig::default().to_arc();
    let identity = IdentityToolkitClient::with_base_url(&server.uri(), &config.identity_api_key);
    let service = AuthService::new(config, Arc::new(identity), Arc::new(store));
    (server, service)
}

fn account(uid: &str, email: &str) -> serde_json::Value {
    json!({
        "localId": uid,
        "email": email,
        "idToken": format!("id-token-{}", uid),
        "refreshToken": "refresh",
        "expiresIn": "3600"
    })
}

fn provider_error(code: &str) -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(json!({
        "error": {"code": 400, "message": code, "errors": []}
    }))
}

async fn mock_sign_in(server: &MockServer, uid: &str, email: &str, verified: bool) {
    Mock::given(method("POST"))
        .and(path("/accounts:signInWithPassword"))
        .and(query_param("key", "test-api-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(account(uid, email)))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/accounts:lookup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [{"localId": uid, "email": email, "emailVerified": verified}]
        })))
        .mount(server)
        .await;
}

fn sign_up_request() -> SignUpRequest {
    SignUpRequest {
        email: "ada@example.com".into(),
        password: "hunter22".into(),
        name: "Ada".into(),
        age: "36".into(),
        gender: "Female".into(),
        blood_group: "A+".into(),
        health_number: "HN-77".into(),
        height: Some("170".into()),
        weight: None,
    }
}

#[tokio::test]
async fn test_sign_up_writes_profile_and_sends_verification() {
    let store = MemoryStore::new();
    let (server, service) = setup(store.clone()).await;
    Mock::given(method("POST"))
        .and(path("/accounts:signUp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(account("uid-1", "ada@example.com")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/accounts:sendOobCode"))
        .and(body_partial_json(json!({"requestType": "VERIFY_EMAIL", "idToken": "id-token-uid-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"email": "ada@example.com"})))
        .expect(1)
        .mount(&server)
        .await;

    let created = service.sign_up(sign_up_request()).await.unwrap();

    assert_eq!(created.user_id, "uid-1");
    assert!(created.verification_sent);
    let profile = store.read("users/uid-1").await.unwrap().unwrap();
    assert_eq!(profile["healthNumber"], json!("HN-77"));
    assert_eq!(profile["bloodGroup"], json!("A+"));
    assert_eq!(profile["height"], json!("170"));
}

#[tokio::test]
async fn test_sign_up_with_taken_email() {
    let store = MemoryStore::new();
    let (server, service) = setup(store.clone()).await;
    Mock::given(method("POST"))
        .and(path("/accounts:signUp"))
        .respond_with(provider_error("EMAIL_EXISTS"))
        .mount(&server)
        .await;

    let result = service.sign_up(sign_up_request()).await;

    assert_matches!(result, Err(AuthCellError::EmailExists));
    assert_eq!(store.snapshot().await, serde_json::Value::Null);
}

#[tokio::test]
async fn test_verified_patient_gets_session() {
    let store = MemoryStore::with_data(json!({
        "users": {"uid-1": StoreFixtures::patient_record("Ada", "ada@example.com", "36", "HN-77")}
    }));
    let (server, service) = setup(store).await;
    mock_sign_in(&server, "uid-1", "ada@example.com", true).await;

    let session = service
        .login_patient(LoginRequest { email: "ada@example.com".into(), password: "hunter22".into() })
        .await
        .unwrap();

    assert_eq!(session.role, "patient");
    assert_eq!(session.profile.unwrap()["name"], json!("Ada"));
    let user = validate_token(&session.access_token, &TestConfig::default().jwt_secret).unwrap();
    assert_eq!(user.id, "uid-1");
    assert!(user.is_patient());
}

#[tokio::test]
async fn test_unverified_patient_is_refused() {
    let (server, service) = setup(MemoryStore::new()).await;
    mock_sign_in(&server, "uid-2", "new@example.com", false).await;

    let result = service
        .login_patient(LoginRequest { email: "new@example.com".into(), password: "pw1234".into() })
        .await;

    assert_matches!(result, Err(AuthCellError::EmailNotVerified));
}

#[tokio::test]
async fn test_wrong_password() {
    let (server, service) = setup(MemoryStore::new()).await;
    Mock::given(method("POST"))
        .and(path("/accounts:signInWithPassword"))
        .respond_with(provider_error("INVALID_LOGIN_CREDENTIALS"))
        .mount(&server)
        .await;

    let result = service
        .login_patient(LoginRequest { email: "ada@example.com".into(), password: "nope".into() })
        .await;

    assert_matches!(result, Err(AuthCellError::InvalidCredentials));
}

#[tokio::test]
async fn test_doctor_session_uses_store_key() {
    let store = MemoryStore::with_data(json!({
        "doctors": {"house@clinic": StoreFixtures::doctor_record("Dr. House", "Diagnostics", "House@clinic.com")}
    }));
    let (server, service) = setup(store).await;
    mock_sign_in(&server, "uid-doc", "House@clinic.com", true).await;

    let session = service
        .login_doctor(LoginRequest { email: "House@clinic.com".into(), password: "vicodin".into() })
        .await
        .unwrap();

    assert_eq!(session.user_id, "house@clinic");
    assert_eq!(session.role, "doctor");
    assert_eq!(session.profile.unwrap()["Spl"], json!("Diagnostics"));
}

#[tokio::test]
async fn test_account_without_doctor_profile_cannot_sign_in_as_doctor() {
    let (server, service) = setup(MemoryStore::new()).await;
    mock_sign_in(&server, "uid-1", "ada@example.com", true).await;

    let result = service
        .login_doctor(LoginRequest { email: "ada@example.com".into(), password: "hunter22".into() })
        .await;

    assert_matches!(result, Err(AuthCellError::NotADoctor));
}

#[tokio::test]
async fn test_doctor_login_with_non_com_address_is_not_a_doctor() {
    let (server, service) = setup(MemoryStore::new()).await;
    mock_sign_in(&server, "uid-3", "x@y.org", true).await;

    let result = service
        .login_doctor(LoginRequest { email: "x@y.org".into(), password: "hunter22".into() })
        .await;

    assert_matches!(result, Err(AuthCellError::NotADoctor));
}

#[tokio::test]
async fn test_password_reset_sends_oob_code() {
    let (server, service) = setup(MemoryStore::new()).await;
    Mock::given(method("POST"))
        .and(path("/accounts:sendOobCode"))
        .and(body_partial_json(json!({"requestType": "PASSWORD_RESET", "email": "ada@example.com"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"email": "ada@example.com"})))
        .expect(1)
        .mount(&server)
        .await;

    service.request_password_reset(" ada@example.com ").await.unwrap();
}
