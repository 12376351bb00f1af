use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_secret: String,
    pub identity_api_key: String,
    pub identity_base_url: String,
    pub storage_bucket: String,
    pub storage_base_url: String,
    pub session_jwt_secret: String,
    pub session_ttl_hours: i64,
    pub emailjs_service_id: String,
    pub emailjs_public_key: String,
    pub emailjs_private_key: String,
    pub emailjs_template_new_booking: String,
    pub emailjs_template_confirmation: String,
    pub emailjs_template_prescription: String,
    pub emailjs_base_url: String,
    pub clinic_utc_offset_minutes: i32,
    pub conflict_ignore_cancelled: bool,
    pub subscription_poll_seconds: u64,
}

fn required(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        warn!("{} not set, using empty value", key);
        String::new()
    })
}

fn with_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        warn!("{} not set, using default", key);
        default.to_string()
    })
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            database_url: required("DATABASE_URL"),
            database_secret: required("DATABASE_SECRET"),
            identity_api_key: required("IDENTITY_API_KEY"),
            identity_base_url: with_default(
                "IDENTITY_BASE_URL",
                "https://identitytoolkit.googleapis.com/v1",
            ),
            storage_bucket: required("STORAGE_BUCKET"),
            storage_base_url: with_default(
                "STORAGE_BASE_URL",
                "https://firebasestorage.googleapis.com/v0",
            ),
            session_jwt_secret: required("SESSION_JWT_SECRET"),
            session_ttl_hours: parsed("SESSION_TTL_HOURS", 24),
            emailjs_service_id: required("EMAILJS_SERVICE_ID"),
            emailjs_public_key: required("EMAILJS_PUBLIC_KEY"),
            emailjs_private_key: required("EMAILJS_PRIVATE_KEY"),
            emailjs_template_new_booking: required("EMAILJS_TEMPLATE_NEW_BOOKING"),
            emailjs_template_confirmation: required("EMAILJS_TEMPLATE_CONFIRMATION"),
            emailjs_template_prescription: required("EMAILJS_TEMPLATE_PRESCRIPTION"),
            emailjs_base_url: with_default("EMAILJS_BASE_URL", "https://api.emailjs.com/api/v1.0"),
            clinic_utc_offset_minutes: parsed("CLINIC_UTC_OFFSET_MINUTES", 0),
            conflict_ignore_cancelled: parsed("CONFLICT_IGNORE_CANCELLED", false),
            subscription_poll_seconds: parsed("SUBSCRIPTION_POLL_SECONDS", 5),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.database_url.is_empty()
            && !self.identity_api_key.is_empty()
            && !self.session_jwt_secret.is_empty()
    }

    pub fn is_notification_configured(&self) -> bool {
        !self.emailjs_service_id.is_empty()
            && !self.emailjs_public_key.is_empty()
            && !self.emailjs_base_url.is_empty()
    }

    pub fn is_storage_configured(&self) -> bool {
        !self.storage_bucket.is_empty() && !self.storage_base_url.is_empty()
    }
}
