//! Auth routes — email access-code flow and session management.

use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use time::Duration;

use crate::services::email_auth::{self, EmailAuthError};
use crate::services::session;
use crate::state::AppState;

const COOKIE_NAME: &str = "session_token";

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

pub(crate) fn cookie_secure() -> bool {
    env_bool("COOKIE_SECURE").unwrap_or(false)
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(cookie_secure())
        .build()
}

fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(cookie_secure())
        .max_age(Duration::ZERO)
        .build()
}

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated user extracted from the session cookie.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub user: session::SessionUser,
    pub token: String,
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar.get(COOKIE_NAME).map(Cookie::value).unwrap_or_default();
        if token.is_empty() {
            return Err(StatusCode::UNAUTHORIZED);
        }

        let app_state = AppState::from_ref(state);
        let user = session::validate_session(&app_state.pool, token)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(Self { user, token: token.to_owned() })
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Deserialize)]
pub struct RequestCodeBody {
    pub email: String,
}

/// `POST /api/auth/email/request-code` — issue an access code and deliver
/// it by email. Without delivery config the code is logged so local
/// development stays usable.
pub async fn request_email_code(State(state): State<AppState>, Json(body): Json<RequestCodeBody>) -> Response {
    let code = match email_auth::request_access_code(&state.pool, &body.email).await {
        Ok(code) => code,
        Err(EmailAuthError::InvalidEmail) => {
            return (StatusCode::BAD_REQUEST, "invalid email").into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "access code issue failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "failed to issue code").into_response();
        }
    };

    if let Some(email_cfg) = &state.email {
        if let Err(e) = email_auth::send_access_code_email(&email_cfg.api_key, &email_cfg.from, &body.email, &code).await
        {
            tracing::error!(error = %e, "access code delivery failed");
            return (StatusCode::BAD_GATEWAY, "email delivery failed").into_response();
        }
    } else {
        tracing::info!(email = %body.email, %code, "email delivery not configured; access code logged");
    }

    Json(serde_json::json!({ "ok": true })).into_response()
}

#[derive(Deserialize)]
pub struct VerifyCodeBody {
    pub email: String,
    pub code: String,
}

/// `POST /api/auth/email/verify-code` — verify the code, create a session,
/// set the cookie, and return the signed-in user.
pub async fn verify_email_code(State(state): State<AppState>, Json(body): Json<VerifyCodeBody>) -> Response {
    let user_id = match email_auth::verify_access_code(&state.pool, &body.email, &body.code).await {
        Ok(id) => id,
        Err(EmailAuthError::InvalidEmail | EmailAuthError::InvalidCode) => {
            return (StatusCode::BAD_REQUEST, "invalid email or code").into_response();
        }
        Err(EmailAuthError::VerificationFailed) => {
            return (StatusCode::UNAUTHORIZED, "expired or incorrect code").into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "code verification failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "verification failed").into_response();
        }
    };

    let token = match session::create_session(&state.pool, user_id).await {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(error = %e, "session creation failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "failed to create session").into_response();
        }
    };

    let user = match session::user_by_id(&state.pool, user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return (StatusCode::INTERNAL_SERVER_ERROR, "user vanished").into_response(),
        Err(e) => {
            tracing::error!(error = %e, "user lookup failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "user lookup failed").into_response();
        }
    };

    let jar = CookieJar::new().add(session_cookie(token));
    (jar, Json(user)).into_response()
}

/// `GET /api/auth/me` — return current user.
pub async fn me(auth: AuthUser) -> Json<session::SessionUser> {
    Json(auth.user)
}

/// `POST /api/auth/logout` — delete session, clear cookie.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    let _ = session::delete_session(&state.pool, &auth.token).await;

    let jar = CookieJar::new().add(clear_session_cookie());
    (jar, StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
