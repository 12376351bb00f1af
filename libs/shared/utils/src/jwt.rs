use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

use shared_models::auth::{JwtClaims, Role, User};

type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session secret is not set")]
    MissingSecret,

    #[error("Invalid token format")]
    Malformed,

    #[error("Invalid token signature")]
    BadSignature,

    #[error("Token expired")]
    Expired,
}

fn sign(signing_input: &str, secret: &str) -> Result<Vec<u8>, SessionError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SessionError::MissingSecret)?;
    mac.update(signing_input.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Issue an HS256 session token for an authenticated caller.
pub fn issue_token(
    user_id: &str,
    email: Option<&str>,
    role: Role,
    secret: &str,
    ttl_hours: i64,
) -> Result<String, SessionError> {
    if secret.is_empty() {
        return Err(SessionError::MissingSecret);
    }

    let now = Utc::now();
    let claims = JwtClaims {
        sub: user_id.to_string(),
        exp: Some((now + Duration::hours(ttl_hours)).timestamp().max(0) as u64),
        email: email.map(str::to_string),
        role: Some(role.to_string()),
        iat: Some(now.timestamp().max(0) as u64),
    };

    let header = json!({ "alg": "HS256", "typ": "JWT" });
    let claims_json = serde_json::to_string(&claims).map_err(|_| SessionError::Malformed)?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(claims_json)
    );
    let signature = URL_SAFE_NO_PAD.encode(sign(&signing_input, secret)?);

    Ok(format!("{}.{}", signing_input, signature))
}

pub fn validate_token(token: &str, secret: &str) -> Result<User, SessionError> {
    if secret.is_empty() {
        return Err(SessionError::MissingSecret);
    }

    let parts: Vec<&str> = token.split('.').collect();
    let [header_b64, claims_b64, signature_b64] = parts.as_slice() else {
        return Err(SessionError::Malformed);
    };

    let signature = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|e| {
        debug!("Failed to decode signature: {}", e);
        SessionError::Malformed
    })?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SessionError::MissingSecret)?;
    mac.update(format!("{}.{}", header_b64, claims_b64).as_bytes());
    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err(SessionError::BadSignature);
    }

    let claims_bytes = URL_SAFE_NO_PAD.decode(claims_b64).map_err(|_| SessionError::Malformed)?;
    let claims: JwtClaims = serde_json::from_slice(&claims_bytes).map_err(|e| {
        debug!("Failed to parse claims: {}", e);
        SessionError::Malformed
    })?;

    if let Some(exp) = claims.exp {
        let now = Utc::now().timestamp().max(0) as u64;
        if exp <= now {
            debug!("Token expired at {} (now: {})", exp, now);
            return Err(SessionError::Expired);
        }
    }

    let created_at = claims
        .iat
        .and_then(|timestamp| Utc.timestamp_opt(timestamp as i64, 0).single());

    let user = User {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
        created_at,
    };

    debug!("Token validated successfully for user: {}", user.id);
    Ok(user)
}
