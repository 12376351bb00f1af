use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::json;
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::{join_path, HierarchicalStore, StoreError};
use shared_models::auth::{doctor_key_from_email, Role};
use shared_utils::jwt::issue_token;

use crate::models::{
    AuthCellError, IdentityAccount, LoginRequest, SessionResponse, SignUpRequest, SignUpResponse,
};
use crate::services::identity::IdentityProvider;

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("e-mail pattern compiles")
    })
}

pub fn validate_email(email: &str) -> Result<(), AuthCellError> {
    if email.len() <= 254 && email_pattern().is_match(email) {
        Ok(())
    } else {
        Err(AuthCellError::Validation("Please enter a valid e-mail address".to_string()))
    }
}

fn validate_sign_up(request: &SignUpRequest) -> Result<(), AuthCellError> {
    let required = [
        ("email", &request.email),
        ("password", &request.password),
        ("name", &request.name),
        ("age", &request.age),
        ("gender", &request.gender),
        ("bloodGroup", &request.blood_group),
        ("healthNumber", &request.health_number),
    ];
    let missing: Vec<&str> = required
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| *field)
        .collect();

    if !missing.is_empty() {
        return Err(AuthCellError::Validation(format!(
            "Please fill in all fields: {}",
            missing.join(", ")
        )));
    }
    validate_email(request.email.trim())
}

pub struct AuthService {
    config: Arc<AppConfig>,
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn HierarchicalStore>,
}

impl AuthService {
    pub fn new(
        config: Arc<AppConfig>,
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn HierarchicalStore>,
    ) -> Self {
        Self { config, identity, store }
    }

    /// Create a patient account, send the verification e-mail and write the
    /// patient profile. The account cannot sign in until the e-mail is
    /// verified.
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpResponse, AuthCellError> {
        validate_sign_up(&request)?;
        let email = request.email.trim().to_string();
        info!("Signing up patient {}", email);

        let account = self.identity.sign_up(&email, &request.password).await?;

        let verification_sent = match self.identity.send_email_verification(&account.id_token).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Verification e-mail for {} failed: {}", account.local_id, e);
                false
            }
        };

        let profile = json!({
            "email": email,
            "name": request.name.trim(),
            "age": request.age.trim(),
            "gender": request.gender,
            "bloodGroup": request.blood_group,
            "height": request.height.unwrap_or_default(),
            "weight": request.weight.unwrap_or_default(),
            "healthNumber": request.health_number.trim(),
        });
        self.store
            .set(&join_path(&["users", &account.local_id]), profile)
            .await?;

        Ok(SignUpResponse {
            user_id: account.local_id,
            email,
            verification_sent,
        })
    }

    pub async fn login_patient(&self, request: LoginRequest) -> Result<SessionResponse, AuthCellError> {
        let email = request.email.trim();
        validate_email(email)?;
        debug!("Patient sign-in for {}", email);

        let account = self.identity.sign_in(email, &request.password).await?;
        let info = self.identity.lookup(&account.id_token).await?;
        if !info.email_verified {
            warn!("Patient {} signed in with unverified e-mail", account.local_id);
            return Err(AuthCellError::EmailNotVerified);
        }

        let profile = self
            .store
            .read(&join_path(&["users", &account.local_id]))
            .await?;

        self.session(account.local_id.clone(), &account, Role::Patient, profile)
    }

    /// Doctors sign in with the provider and must have a profile under
    /// `doctors/{key}`; their session subject is that key.
    pub async fn login_doctor(&self, request: LoginRequest) -> Result<SessionResponse, AuthCellError> {
        let email = request.email.trim();
        validate_email(email)?;
        debug!("Doctor sign-in for {}", email);

        let account = self.identity.sign_in(email, &request.password).await?;

        // Addresses outside `.com` keep a `.` in their key, which no doctor
        // profile can be stored under.
        let doctor_key = doctor_key_from_email(email);
        let profile = match self.store.read(&join_path(&["doctors", &doctor_key])).await {
            Ok(Some(profile)) => profile,
            Ok(None) => return Err(AuthCellError::NotADoctor),
            Err(StoreError::InvalidPath(reason)) => {
                warn!("No doctor profile can exist for {}: {}", email, reason);
                return Err(AuthCellError::NotADoctor);
            }
            Err(e) => return Err(e.into()),
        };

        self.session(doctor_key, &account, Role::Doctor, Some(profile))
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthCellError> {
        let email = email.trim();
        validate_email(email)?;
        info!("Password reset requested for {}", email);

        self.identity.send_password_reset(email).await
    }

    fn session(
        &self,
        subject: String,
        account: &IdentityAccount,
        role: Role,
        profile: Option<serde_json::Value>,
    ) -> Result<SessionResponse, AuthCellError> {
        let ttl_hours = self.config.session_ttl_hours;
        let access_token = issue_token(
            &subject,
            Some(&account.email),
            role,
            &self.config.session_jwt_secret,
            ttl_hours,
        )?;

        info!("{} {} signed in", role, subject);
        Ok(SessionResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: ttl_hours * 3600,
            user_id: subject,
            email: account.email.clone(),
            role: role.to_string(),
            profile,
        })
    }
}
