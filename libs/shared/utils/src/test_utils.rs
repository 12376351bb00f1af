use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{doctor_key_from_email, Role, User};

use crate::jwt::issue_token;

pub struct TestConfig {
    pub jwt_secret: String,
    pub database_url: String,
    pub identity_base_url: String,
    pub storage_base_url: String,
    pub emailjs_base_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            database_url: "http://localhost:9000".to_string(),
            identity_base_url: "http://localhost:9099/v1".to_string(),
            storage_base_url: "http://localhost:9199/v0".to_string(),
            emailjs_base_url: "http://localhost:9300/api/v1.0".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            database_url: self.database_url.clone(),
            database_secret: String::new(),
            identity_api_key: "test-api-key".to_string(),
            identity_base_url: self.identity_base_url.clone(),
            storage_bucket: "clinic-test.appspot.com".to_string(),
            storage_base_url: self.storage_base_url.clone(),
            session_jwt_secret: self.jwt_secret.clone(),
            session_ttl_hours: 24,
            emailjs_service_id: "service_test".to_string(),
            emailjs_public_key: "public_test".to_string(),
            emailjs_private_key: "private_test".to_string(),
            emailjs_template_new_booking: "template_booking".to_string(),
            emailjs_template_confirmation: "template_confirm".to_string(),
            emailjs_template_prescription: "template_rx".to_string(),
            emailjs_base_url: self.emailjs_base_url.clone(),
            clinic_utc_offset_minutes: 0,
            conflict_ignore_cancelled: false,
            subscription_poll_seconds: 1,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: Role,
}

impl TestUser {
    pub fn new(id: &str, email: &str, role: Role) -> Self {
        Self {
            id: id.to_string(),
            email: email.to_string(),
            role,
        }
    }

    /// Doctors are keyed by their e-mail in the store, e.g. `jane@clinic`.
    pub fn doctor(email: &str) -> Self {
        Self::new(&doctor_key_from_email(email), email, Role::Doctor)
    }

    pub fn patient(email: &str) -> Self {
        Self::new(&Uuid::new_v4().simple().to_string(), email, Role::Patient)
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.to_string()),
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        issue_token(&user.id, Some(&user.email), user.role, secret, exp_hours.unwrap_or(24))
            .expect("test secret must not be empty")
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// JSON records shaped the way the clinic store keeps them.
pub struct StoreFixtures;

impl StoreFixtures {
    pub fn doctor_record(name: &str, specialty: &str, email: &str) -> Value {
        json!({
            "Name": name,
            "Spl": specialty,
            "email": email,
            "image": null
        })
    }

    pub fn patient_record(name: &str, email: &str, age: &str, health_number: &str) -> Value {
        json!({
            "email": email,
            "name": name,
            "age": age,
            "gender": "Female",
            "bloodGroup": "O+",
            "height": "165",
            "weight": "60",
            "healthNumber": health_number
        })
    }

    pub fn appointment_record(
        appointment_id: &str,
        doctor_id: &str,
        patient_id: &str,
        date_time: DateTime<Utc>,
        status: &str,
    ) -> Value {
        json!({
            "AppointmentID": appointment_id,
            "DoctorID": doctor_id,
            "PatientID": patient_id,
            "DateTime": date_time.to_rfc3339(),
            "PatientName": "Test Patient",
            "DoctorName": "Dr. Test",
            "Note": "",
            "Status": status,
            "email": "patient@example.com"
        })
    }
}
