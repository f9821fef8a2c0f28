// src/api/auth.rs
//! Control API authentication gate
//!
//! Credentials come from the environment. With none configured the API is
//! open; otherwise a request must carry the token or valid Basic credentials.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose};
use std::sync::Arc;

/// Environment variable holding the API token
pub const TOKEN_ENV: &str = "API_TOKEN";
/// Environment variable holding the Basic auth user
pub const BASIC_USER_ENV: &str = "API_BASIC_USER";
/// Environment variable holding the Basic auth password
pub const BASIC_PASSWORD_ENV: &str = "API_BASIC_PASSWORD";
/// Header accepted as an alternative to `Authorization`
pub const TOKEN_HEADER: &str = "x-api-token";
/// Challenge sent with every 401
pub const CHALLENGE: &str = "Basic realm=\"DropsMiner\"";

/// Accepted credentials
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthConfig {
    /// Shared token for `Bearer`/`Token` schemes and `X-Api-Token`
    pub token: Option<String>,
    /// Basic auth user
    pub basic_user: Option<String>,
    /// Basic auth password
    pub basic_password: Option<String>,
}

impl AuthConfig {
    /// Reads credentials from the environment; empty values count as unset
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            token: var(TOKEN_ENV),
            basic_user: var(BASIC_USER_ENV),
            basic_password: var(BASIC_PASSWORD_ENV),
        }
    }

    /// True if any credential is configured
    pub fn is_required(&self) -> bool {
        self.token.is_some() || self.basic_user.is_some() || self.basic_password.is_some()
    }

    /// Checks a request's headers against the configured credentials
    pub fn authorize(&self, headers: &HeaderMap) -> bool {
        if !self.is_required() {
            return true;
        }
        if let Some(token) = &self.token {
            if extract_token(headers).as_deref() == Some(token.as_str()) {
                return true;
            }
        }
        match (&self.basic_user, &self.basic_password) {
            (Some(user), Some(password)) => validate_basic(headers, user, password),
            _ => false,
        }
    }
}

/// Token from `Authorization: Bearer|Token …`, or from `X-Api-Token` when
/// there is no `Authorization` header
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let Some(auth) = headers.get(header::AUTHORIZATION) else {
        return headers
            .get(TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
    };
    let auth = auth.to_str().ok()?;
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("Token "))
        .map(|t| t.trim().to_string())
}

fn validate_basic(headers: &HeaderMap, user: &str, password: &str) -> bool {
    let Some(encoded) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
    else {
        return false;
    };
    let Ok(decoded) = general_purpose::STANDARD.decode(encoded.trim()) else {
        return false;
    };
    let Ok(decoded) = String::from_utf8(decoded) else {
        return false;
    };
    match decoded.split_once(':') {
        Some((u, p)) => u == user && p == password,
        None => false,
    }
}

/// Rejects unauthenticated requests with 401 and a Basic challenge
pub async fn auth_middleware(
    State(auth): State<Arc<AuthConfig>>,
    request: Request,
    next: Next,
) -> Response {
    if auth.authorize(request.headers()) {
        return next.run(request).await;
    }
    log::warn!(
        target: crate::utils::logging::TARGET_API,
        "Rejected unauthenticated request to {}",
        request.uri().path()
    );
    (StatusCode::UNAUTHORIZED, [(header::WWW_AUTHENTICATE, CHALLENGE)]).into_response()
}
