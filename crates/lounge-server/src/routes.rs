use std::path::Path;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use lounge_api::middleware::{attach_session, rate_limit};
use lounge_api::{AppState, ApiError, admin, auth, messages, posts};
use lounge_auth::{Policy, SESSION_COOKIE};

/// Assemble the full HTTP surface: REST, the realtime upgrade and, when a
/// directory is given, static files for everything else.
pub fn build_router(state: AppState, static_dir: Option<&Path>) -> Router {
    let limited = |policy: Policy| {
        middleware::from_fn_with_state((state.limiter.clone(), policy), rate_limit)
    };

    let login_routes = Router::new()
        .route("/api/login", post(auth::login))
        .route_layer(limited(Policy::Login));

    let admin_login_routes = Router::new()
        .route("/admin/login", post(admin::admin_login))
        .route_layer(limited(Policy::AdminLogin));

    let api_routes = Router::new()
        .route("/api/signup", post(auth::signup))
        .route("/api/logout", post(auth::logout))
        .route("/api/me", get(auth::me))
        .route("/api/profile", post(auth::update_profile))
        .route("/api/messages", get(messages::get_messages))
        .route("/api/posts", get(posts::list_posts))
        .route("/admin/logout", post(admin::admin_logout))
        .route("/admin/post", post(admin::publish))
        .route_layer(limited(Policy::Default));

    let rest = Router::new()
        .merge(login_routes)
        .merge(admin_login_routes)
        .merge(api_routes)
        .layer(middleware::from_fn_with_state(state.clone(), attach_session))
        .with_state(state.clone());

    let ws_route = Router::new()
        .route("/ws", get(ws_upgrade))
        .with_state(state);

    let mut app = Router::new().merge(rest).merge(ws_route);
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(TraceLayer::new_for_http())
}

/// Realtime handshake: refused with 401 unless the cookie names a session
/// that carries a user identity.
async fn ws_upgrade(
    State(state): State<AppState>,
    jar: CookieJar,
    ws: WebSocketUpgrade,
) -> Response {
    let token = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());

    let (Some(token), Some(user)) = (
        token.clone(),
        state.gateway.authorize(token.as_deref()).await,
    ) else {
        return ApiError::Unauthenticated.into_response();
    };

    let gateway = state.gateway.clone();
    ws.on_upgrade(move |socket| gateway.handle_connection(socket, token, user))
}
