use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::{
    api::{
        session::{cleared_session_cookie, presented_token, session_cookie},
        AppState, Session,
    },
    error::{AppError, AppResult},
    models::{Preferences, UserProfile},
    services::accounts::SignUp,
};

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub preferences: Option<Preferences>,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    pub user: UserProfile,
}

/// Creates an account and signs it in for the browser session
pub async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<SignUpRequest>,
) -> AppResult<(CookieJar, Json<AuthResponse>)> {
    let form = SignUp::parse(&body.username, &body.email, &body.password, body.preferences)?;
    let (user, session) = state.accounts.sign_up(form).await?;

    Ok((
        jar.add(session_cookie(session.token, None)),
        Json(AuthResponse {
            success: true,
            message: "Account created successfully",
            user: Some(UserProfile::without_preferences(&user)),
        }),
    ))
}

/// Signs in; `remember_me` keeps the cookie past the browser session
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<SignInRequest>,
) -> AppResult<(CookieJar, Json<AuthResponse>)> {
    let (user, session) = state.accounts.sign_in(&body.email, &body.password).await?;

    let max_age = body
        .remember_me
        .then(|| state.accounts.session_ttl().num_seconds());

    Ok((
        jar.add(session_cookie(session.token, max_age)),
        Json(AuthResponse {
            success: true,
            message: "Sign in successful",
            user: Some(UserProfile::from(&user)),
        }),
    ))
}

/// Always succeeds; a presented token is revoked even if it already expired
pub async fn sign_out(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<AuthResponse>)> {
    if let Some(token) = presented_token(&headers) {
        state.accounts.sign_out(&token).await?;
    }

    Ok((
        jar.remove(cleared_session_cookie()),
        Json(AuthResponse {
            success: true,
            message: "Signed out successfully",
            user: None,
        }),
    ))
}

/// The signed-in user's profile. A session whose user has vanished is
/// revoked and answered with 404.
pub async fn current_user(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
) -> AppResult<Response> {
    match state.store.find_user_by_id(session.user_id).await? {
        Some(user) => Ok(Json(CurrentUserResponse {
            user: UserProfile::from(&user),
        })
        .into_response()),
        None => {
            tracing::warn!(user_id = %session.user_id, "Session refers to a missing user");
            state.accounts.sign_out(&session.token).await?;
            Ok((
                jar.remove(cleared_session_cookie()),
                AppError::NotFound("User not found".to_string()),
            )
                .into_response())
        }
    }
}
