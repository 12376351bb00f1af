use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::models::{AccountInfo, AuthCellError, IdentityAccount};

/// E-mail/password account provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<IdentityAccount, AuthCellError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<IdentityAccount, AuthCellError>;

    async fn send_email_verification(&self, id_token: &str) -> Result<(), AuthCellError>;

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthCellError>;

    async fn lookup(&self, id_token: &str) -> Result<AccountInfo, AuthCellError>;
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: ProviderError,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AccountInfo>,
}

/// REST client for the identity toolkit `accounts:*` endpoints.
pub struct IdentityToolkitClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl IdentityToolkitClient {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_base_url(&config.identity_base_url, &config.identity_api_key)
    }

    pub fn with_base_url(base_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn call<T: DeserializeOwned>(&self, action: &str, body: Value) -> Result<T, AuthCellError> {
        let url = format!("{}/accounts:{}", self.base_url, action);
        debug!("Calling identity provider action {}", action);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            error!("Identity provider error ({}) on {}: {}", status, action, text);
            let code = serde_json::from_str::<ProviderErrorBody>(&text)
                .map(|body| body.error.message)
                .unwrap_or(text);
            return Err(map_provider_error(&code));
        }

        response
            .json()
            .await
            .map_err(|e| AuthCellError::Provider(format!("Unexpected response: {}", e)))
    }
}

/// Provider error codes look like `EMAIL_EXISTS` or
/// `WEAK_PASSWORD : Password should be at least 6 characters`.
fn map_provider_error(message: &str) -> AuthCellError {
    let code = message.split(':').next().unwrap_or_default().trim();
    match code {
        "EMAIL_EXISTS" => AuthCellError::EmailExists,
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            AuthCellError::InvalidCredentials
        }
        "INVALID_EMAIL" => AuthCellError::Validation("Invalid e-mail address".to_string()),
        "WEAK_PASSWORD" => AuthCellError::Validation(message.to_string()),
        _ => AuthCellError::Provider(message.to_string()),
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<IdentityAccount, AuthCellError> {
        self.call(
            "signUp",
            json!({ "email": email, "password": password, "returnSecureToken": true }),
        )
        .await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<IdentityAccount, AuthCellError> {
        self.call(
            "signInWithPassword",
            json!({ "email": email, "password": password, "returnSecureToken": true }),
        )
        .await
    }

    async fn send_email_verification(&self, id_token: &str) -> Result<(), AuthCellError> {
        let _: Value = self
            .call("sendOobCode", json!({ "requestType": "VERIFY_EMAIL", "idToken": id_token }))
            .await?;
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthCellError> {
        let _: Value = self
            .call("sendOobCode", json!({ "requestType": "PASSWORD_RESET", "email": email }))
            .await?;
        Ok(())
    }

    async fn lookup(&self, id_token: &str) -> Result<AccountInfo, AuthCellError> {
        let response: LookupResponse = self.call("lookup", json!({ "idToken": id_token })).await?;
        response
            .users
            .into_iter()
            .next()
            .ok_or(AuthCellError::InvalidCredentials)
    }
}
