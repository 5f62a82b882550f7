use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

use super::AppState;
use crate::error::AppError;

pub const SESSION_COOKIE: &str = "session_token";

/// A signed-in caller, resolved from the session cookie or the
/// `Authorization` header
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub token: String,
}

fn token_from_cookies(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(Cookie::value)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn token_from_authorization(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Raw token presented by the request, valid or not
pub fn presented_token(headers: &HeaderMap) -> Option<String> {
    token_from_cookies(headers).or_else(|| token_from_authorization(headers))
}

fn not_authenticated() -> AppError {
    AppError::Unauthorized("Not authenticated".to_string())
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = presented_token(&parts.headers).ok_or_else(not_authenticated)?;
        let record = state
            .accounts
            .session(&token)
            .await?
            .ok_or_else(not_authenticated)?;

        Ok(Session {
            user_id: record.user_id,
            token,
        })
    }
}

/// Session cookie for a freshly opened session. With `max_age_secs` the cookie
/// outlives the browser session.
pub fn session_cookie(token: String, max_age_secs: Option<i64>) -> Cookie<'static> {
    let mut builder = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    if let Some(secs) = max_age_secs {
        builder = builder.max_age(time::Duration::seconds(secs));
    }
    builder.build()
}

/// Cookie that, once removed from a jar, clears the session on the client
pub fn cleared_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .same_site(SameSite::Lax)
        .build()
}
