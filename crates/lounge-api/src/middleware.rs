use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use lounge_auth::{Policy, RateLimiter, SESSION_COOKIE, Session};
use lounge_types::models::{AdminIdentity, UserIdentity};

use crate::auth::AppState;
use crate::error::ApiError;

/// The caller's session as loaded at the start of the request.
#[derive(Debug, Clone, Default)]
pub struct CurrentSession {
    /// Cookie token, present only if it names a live session.
    pub token: Option<String>,
    pub session: Session,
}

impl CurrentSession {
    /// The user identity, or `Unauthenticated`.
    pub fn user(&self) -> Result<&UserIdentity, ApiError> {
        self.session.user.as_ref().ok_or(ApiError::Unauthenticated)
    }

    /// The admin identity, or `Unauthorized`. A user identity does not count.
    pub fn admin(&self) -> Result<&AdminIdentity, ApiError> {
        self.session.admin.as_ref().ok_or(ApiError::Unauthorized)
    }
}

/// Resolve the session cookie and stash the result for handlers.
pub async fn attach_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let mut current = CurrentSession::default();

    if let Some(token) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
        if let Some(session) = state.sessions.get(&token).await {
            current = CurrentSession {
                token: Some(token),
                session,
            };
        }
    }

    req.extensions_mut().insert(current);
    next.run(req).await
}

/// Per-address quota check; runs before the handler touches any credentials.
pub async fn rate_limit(
    State((limiter, policy)): State<(RateLimiter, Policy)>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    limiter.check(policy, client_ip(&req))?;
    Ok(next.run(req).await)
}

/// Peer address from the connection; unspecified when served without connect info.
pub fn client_ip(req: &Request) -> IpAddr {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}
