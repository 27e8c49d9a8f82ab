use std::sync::Arc;
use std::time::Duration;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::{error, info, warn};

use lounge_auth::password::{hash_password, verify_password};
use lounge_auth::{AdminCredentials, RateLimiter, SESSION_COOKIE, SessionStore};
use lounge_db::{Database, MessageLedger, PostLedger, StoreError};
use lounge_gateway::{Dispatcher, Gateway};
use lounge_types::api::{LoginRequest, MeResponse, ProfileRequest, SignupRequest, StatusMessage};
use lounge_types::models::UserIdentity;
use lounge_types::text::{PASSWORD_MIN_LEN, valid_identity};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::CurrentSession;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub messages: MessageLedger,
    pub posts: PostLedger,
    pub sessions: SessionStore,
    pub limiter: RateLimiter,
    pub admin: Option<AdminCredentials>,
    pub gateway: Gateway,
    pub secure_cookies: bool,
}

/// Knobs the server passes in from configuration.
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub admin: Option<AdminCredentials>,
    pub session_ttl: Duration,
    pub secure_cookies: bool,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            admin: None,
            session_ttl: lounge_auth::session::DEFAULT_SESSION_TTL,
            secure_cookies: false,
        }
    }
}

impl AppStateInner {
    /// Wire every component around one database handle.
    pub fn build(db: Arc<Database>, options: AppOptions) -> AppState {
        let sessions = SessionStore::new(options.session_ttl);
        let messages = MessageLedger::new(db.clone());
        let gateway = Gateway {
            dispatcher: Dispatcher::new(),
            sessions: sessions.clone(),
            ledger: messages.clone(),
        };

        Arc::new(Self {
            posts: PostLedger::new(db.clone()),
            db,
            messages,
            sessions,
            limiter: RateLimiter::new(),
            admin: options.admin,
            gateway,
            secure_cookies: options.secure_cookies,
        })
    }

    pub(crate) fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .secure(self.secure_cookies)
            .build()
    }
}

/// Run blocking store work off the async runtime.
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow::anyhow!("blocking task failed: {}", e))
    })?
}

pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<Json<StatusMessage>, ApiError> {
    let username = req.username.as_deref().unwrap_or_default().trim().to_string();
    let password = req.password.unwrap_or_default();
    let confirm = req.confirm.unwrap_or_default();

    if username.is_empty() || password.is_empty() || confirm.is_empty() {
        return Err(ApiError::validation("All fields required"));
    }
    if password != confirm {
        return Err(ApiError::validation("Passwords do not match"));
    }
    if !valid_identity(&username) {
        return Err(ApiError::validation("Invalid username"));
    }
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(ApiError::validation("Password too short"));
    }

    let db = state.db.clone();
    let name = username.clone();
    let id = run_blocking(move || {
        let hash = hash_password(&password)?;
        Ok(db.create_account(&name, &hash)?)
    })
    .await?;

    info!("Account {} created for {}", id, username);
    Ok(Json(StatusMessage::new("Registered successfully")))
}

pub async fn login(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    jar: CookieJar,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.as_deref().unwrap_or_default().trim().to_string();
    let password = req.password.unwrap_or_default();

    if username.is_empty() || password.is_empty() {
        return Err(ApiError::validation("Missing credentials"));
    }

    let db = state.db.clone();
    let lookup = username.clone();
    let user = run_blocking(move || {
        let Some(account) = db.get_account_by_username(&lookup)? else {
            return Ok(None);
        };
        if !verify_password(&password, &account.password) {
            return Ok(None);
        }
        Ok(Some(UserIdentity {
            id: account.id,
            username: account.username,
        }))
    })
    .await?;

    let Some(user) = user else {
        warn!("Failed login for {}", username);
        return Err(ApiError::InvalidCredentials);
    };

    info!("{} ({}) logged in", user.username, user.id);
    let token = state
        .sessions
        .establish_user(current.token.as_deref(), user)
        .await;

    Ok((
        jar.add(state.session_cookie(token)),
        Json(StatusMessage::new("Login successful")),
    ))
}

/// Clears user and admin state alike. Always succeeds.
pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    jar: CookieJar,
) -> impl IntoResponse {
    if let Some(token) = &current.token {
        state.sessions.destroy(token).await;
    }

    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Json(StatusMessage::new("Logged out")),
    )
}

pub async fn me(Extension(current): Extension<CurrentSession>) -> impl IntoResponse {
    let user = current.session.user;
    let status = if user.is_some() {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    };
    (status, Json(MeResponse { user }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    ApiJson(req): ApiJson<ProfileRequest>,
) -> Result<Json<StatusMessage>, ApiError> {
    let user = current.user()?;
    let Some(token) = current.token.as_deref() else {
        return Err(ApiError::Unauthenticated);
    };

    let nickname = req.nickname.as_deref().unwrap_or_default().trim().to_string();
    if !valid_identity(&nickname) {
        return Err(ApiError::validation("Invalid nickname"));
    }

    let db = state.db.clone();
    let new_name = nickname.clone();
    let renamed = state
        .sessions
        .rename_user(token, &nickname, |account| {
            run_blocking(move || match db.rename_account(account.id, &new_name) {
                Ok(found) => Ok(found),
                Err(StoreError::Duplicate) => {
                    Err(ApiError::DuplicateIdentity("Nickname already taken".into()))
                }
                Err(e) => Err(e.into()),
            })
        })
        .await?;

    match renamed {
        Some(renamed) => {
            info!("{} ({}) is now {}", user.username, renamed.id, renamed.username);
            Ok(Json(StatusMessage::new("Nickname updated")))
        }
        None => {
            warn!("Profile update for vanished account {}", user.id);
            Err(ApiError::Unauthenticated)
        }
    }
}
