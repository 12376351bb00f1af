use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use appointment_cell::{appointment_routes, AppointmentState};
use notification_cell::RecordingDispatcher;
use shared_database::{HierarchicalStore, MemoryStore};
use shared_utils::test_utils::{JwtTestUtils, StoreFixtures, TestConfig, TestUser};

const DOCTOR_EMAIL: &str = "grey@clinic.com";

struct TestApp {
    router: Router,
    store: MemoryStore,
    config: TestConfig,
    doctor: TestUser,
    patient: TestUser,
}

impl TestApp {
    fn new() -> Self {
        let config = TestConfig::default();
        let doctor = TestUser::doctor(DOCTOR_EMAIL);
        let patient = TestUser::patient("meredith@example.com");
        let booked = Utc.with_ymd_and_hms(2025, 3, 14, 10, 0, 0).unwrap();

        let store = MemoryStore::with_data(json!({
            "doctors": {
                doctor.id.clone(): StoreFixtures::doctor_record("Dr. Grey", "Surgery", DOCTOR_EMAIL)
            },
            "users": {
                patient.id.clone(): StoreFixtures::patient_record("Meredith", "meredith@example.com", "29", "HN-9")
            },
            "appointments": {
                doctor.id.clone(): {
                    patient.id.clone(): {
                        "existing": StoreFixtures::appointment_record("existing", &doctor.id, &patient.id, booked, "Pending")
                    }
                }
            }
        }));

        let state = AppointmentState::new(
            config.to_arc(),
            Arc::new(store.clone()),
            Arc::new(RecordingDispatcher::new()),
        );

        Self {
            router: appointment_routes(state),
            store,
            config,
            doctor,
            patient,
        }
    }

    fn token(&self, user: &TestUser) -> String {
        JwtTestUtils::create_test_token(user, &self.config.jwt_secret, None)
    }

    async fn send(&self, method: Method, uri: &str, user: Option<&TestUser>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token(user)));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn status_uri(&self, appointment_id: &str, action: &str) -> String {
        format!("/{}/{}/{}/{}", self.doctor.id, self.patient.id, appointment_id, action)
    }
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let app = TestApp::new();
    let uri = format!("/doctors/{}/slots?date=2025-03-14", app.doctor.id);

    let (status, body) = app.send(Method::GET, &uri, None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_doctor_directory_endpoint() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/doctors", Some(&app.patient), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], json!(1));
    assert_eq!(body["doctors"][0]["doctor_id"], json!(app.doctor.id));
    assert_eq!(body["doctors"][0]["name"], json!("Dr. Grey"));
    assert_eq!(body["doctors"][0]["specialty"], json!("Surgery"));

    let (status, _) = app.send(Method::GET, "/doctors", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_slots_endpoint_marks_booked_slot() {
    let app = TestApp::new();
    let uri = format!("/doctors/{}/slots?date=2025-03-14", app.doctor.id);

    let (status, body) = app.send(Method::GET, &uri, Some(&app.patient), None).await;

    assert_eq!(status, StatusCode::OK);
    let slots = body["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 16);
    let disabled: Vec<&str> = slots
        .iter()
        .filter(|s| s["is_disabled"] == json!(true))
        .map(|s| s["time"].as_str().unwrap())
        .collect();
    assert_eq!(disabled, vec!["10:00"]);
}

#[tokio::test]
async fn test_patient_books_free_slot() {
    let app = TestApp::new();
    let request = json!({
        "doctor_id": app.doctor.id,
        "date": "2025-03-14",
        "time": "11:00",
        "note": "Follow-up"
    });

    let (status, body) = app.send(Method::POST, "/", Some(&app.patient), Some(request)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["appointment"]["status"], json!("Pending"));
    assert_eq!(body["appointment"]["patient_id"], json!(app.patient.id));
}

#[tokio::test]
async fn test_conflicting_booking_returns_409() {
    let app = TestApp::new();
    let request = json!({"doctor_id": app.doctor.id, "date": "2025-03-14", "time": "10:00"});

    let (status, body) = app.send(Method::POST, "/", Some(&app.patient), Some(request)).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("15 minutes"));
}

#[tokio::test]
async fn test_doctor_cannot_book() {
    let app = TestApp::new();
    let request = json!({"doctor_id": app.doctor.id, "date": "2025-03-14", "time": "12:00"});

    let (status, _) = app.send(Method::POST, "/", Some(&app.doctor), Some(request)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_doctor_confirms_then_cancel_is_rejected() {
    let app = TestApp::new();
    let uri = app.status_uri("existing", "status");

    let (status, body) = app
        .send(Method::PATCH, &uri, Some(&app.doctor), Some(json!({"status": "Confirmed"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointment"]["status"], json!("Confirmed"));

    let (status, _) = app
        .send(Method::PATCH, &uri, Some(&app.doctor), Some(json!({"status": "Cancelled"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let stored = app
        .store
        .read(&format!("appointments/{}/{}/existing/Status", app.doctor.id, app.patient.id))
        .await
        .unwrap();
    assert_eq!(stored, Some(json!("Confirmed")));
}

#[tokio::test]
async fn test_patient_reschedules_through_api() {
    let app = TestApp::new();
    let uri = app.status_uri("existing", "reschedule");

    let (status, body) = app
        .send(
            Method::PATCH,
            &uri,
            Some(&app.patient),
            Some(json!({"date": "2025-03-15", "time": "09:30"})),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointment"]["appointment_id"], json!("existing"));
    assert_eq!(body["appointment"]["status"], json!("Rescheduled"));
    assert_eq!(body["appointment"]["date_time"], json!("2025-03-15T09:30:00Z"));
}

#[tokio::test]
async fn test_unknown_appointment_is_404() {
    let app = TestApp::new();
    let uri = app.status_uri("nope", "status");

    let (status, _) = app
        .send(Method::PATCH, &uri, Some(&app.doctor), Some(json!({"status": "Confirmed"})))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_listings_are_scoped_to_caller() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/doctor?pending=true", Some(&app.doctor), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], json!(1));

    let (status, body) = app.send(Method::GET, "/patient", Some(&app.patient), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointments"][0]["appointment_id"], json!("existing"));

    let (status, _) = app.send(Method::GET, "/doctor", Some(&app.patient), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_reports_for_doctors() {
    let app = TestApp::new();

    let (status, body) = app
        .send(Method::GET, "/reports/daily?date=2025-03-14", Some(&app.doctor), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["total"], json!(1));

    let (status, _) = app
        .send(Method::GET, "/reports/monthly?month=2025-3x", Some(&app.doctor), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
