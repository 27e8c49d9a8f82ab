use axum::{Extension, Json, extract::State, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::{info, warn};

use lounge_auth::SESSION_COOKIE;
use lounge_types::api::{AdminLoginRequest, PublishRequest, StatusMessage};

use crate::auth::{AppState, run_blocking};
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::CurrentSession;

/// Grants the admin role on the caller's session. Leaves any user identity alone.
pub async fn admin_login(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    jar: CookieJar,
    ApiJson(req): ApiJson<AdminLoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.as_deref().unwrap_or_default().trim();
    let password = req.password.as_deref().unwrap_or_default();
    let phase_key = req.phasekey.as_deref().unwrap_or_default().trim();

    let Some(admin) = state
        .admin
        .as_ref()
        .and_then(|creds| creds.authenticate(username, password, phase_key))
    else {
        warn!("Failed admin login as '{}'", username);
        return Err(ApiError::InvalidCredentials);
    };

    info!("Admin {} authenticated", admin.name);
    let token = state
        .sessions
        .establish_admin(current.token.as_deref(), admin)
        .await;

    Ok((
        jar.add(state.session_cookie(token)),
        Json(StatusMessage::new("Admin authenticated")),
    ))
}

/// Drops only the admin role.
pub async fn admin_logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    jar: CookieJar,
) -> impl IntoResponse {
    let mut jar = jar;
    if let Some(token) = &current.token {
        state.sessions.clear_admin(token).await;
        // Nothing left on the session: stop sending a dead cookie
        if state.sessions.get(token).await.is_none() {
            jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
        }
    }

    (jar, Json(StatusMessage::new("Admin logged out")))
}

pub async fn publish(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    ApiJson(req): ApiJson<PublishRequest>,
) -> Result<Json<StatusMessage>, ApiError> {
    let admin = current.admin()?.clone();
    let title = req.title.unwrap_or_default();
    let content = req.content.unwrap_or_default();

    let posts = state.posts.clone();
    let post = run_blocking(move || Ok(posts.publish(&admin, &title, &content)?)).await?;

    info!("Post {} published by {}", post.id, post.author);
    Ok(Json(StatusMessage::new("Post published")))
}
