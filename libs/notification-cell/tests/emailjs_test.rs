use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use notification_cell::{
    EmailJsDispatcher, Notification, NotificationDispatcher, NotificationError, NotificationTemplate,
};
use shared_config::AppConfig;

fn config_for(server: &MockServer) -> AppConfig {
    AppConfig {
        database_url: String::new(),
        database_secret: String::new(),
        identity_api_key: String::new(),
        identity_base_url: String::new(),
        storage_bucket: String::new(),
        storage_base_url: String::new(),
        session_jwt_secret: String::new(),
        session_ttl_hours: 24,
        emailjs_service_id: "service_clinic".to_string(),
        emailjs_public_key: "pub".to_string(),
        emailjs_private_key: "priv".to_string(),
        emailjs_template_new_booking: "template_booking".to_string(),
        emailjs_template_confirmation: "template_confirm".to_string(),
        emailjs_template_prescription: String::new(),
        emailjs_base_url: server.uri(),
        clinic_utc_offset_minutes: 0,
        conflict_ignore_cancelled: false,
        subscription_poll_seconds: 5,
    }
}

#[tokio::test]
async fn test_confirmation_is_posted_with_template_params() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/email/send"))
        .and(body_partial_json(json!({
            "service_id": "service_clinic",
            "template_id": "template_confirm",
            "user_id": "pub",
            "template_params": { "patientEmail": "ada@example.com", "doctorName": "Dr. Grey" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = EmailJsDispatcher::new(&config_for(&server));
    let notification = Notification::new(NotificationTemplate::Confirmation)
        .with("patientEmail", "ada@example.com")
        .with("doctorName", "Dr. Grey");

    dispatcher.send(&notification).await.unwrap();
}

#[tokio::test]
async fn test_rejection_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/email/send"))
        .respond_with(ResponseTemplate::new(400).set_body_string("The template ID is invalid"))
        .mount(&server)
        .await;

    let dispatcher = EmailJsDispatcher::new(&config_for(&server));
    let result = dispatcher
        .send(&Notification::new(NotificationTemplate::NewBooking))
        .await;

    assert_matches!(result, Err(NotificationError::Rejected { status: 400, .. }));
}

#[tokio::test]
async fn test_missing_template_is_not_configured() {
    let server = MockServer::start().await;
    let dispatcher = EmailJsDispatcher::new(&config_for(&server));

    let result = dispatcher
        .send(&Notification::new(NotificationTemplate::Prescription))
        .await;

    assert_matches!(result, Err(NotificationError::NotConfigured));
}
