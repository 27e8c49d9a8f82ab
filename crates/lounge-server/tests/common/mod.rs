#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use lounge_api::{AppOptions, AppState, AppStateInner};
use lounge_auth::{AdminCredentials, SESSION_COOKIE};
use lounge_db::Database;
use lounge_server::build_router;

pub const ADMIN_USER: &str = "keeper";
pub const ADMIN_PASS: &str = "open-sesame";
pub const ADMIN_KEY: &str = "phase-7";

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub ip: IpAddr,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    /// Session token from a `Set-Cookie` header, if one was set (empty when cleared).
    pub session: Option<String>,
}

impl TestApp {
    pub fn new() -> Self {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let options = AppOptions {
            admin: AdminCredentials::new(ADMIN_USER.into(), ADMIN_PASS.into(), ADMIN_KEY.into()),
            ..AppOptions::default()
        };
        let state = AppStateInner::build(db, options);
        let router = build_router(state.clone(), None);
        Self {
            state,
            router,
            ip: IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)),
        }
    }

    /// Subsequent requests come from a different client address.
    pub fn from_ip(&mut self, last_octet: u8) -> &mut Self {
        self.ip = IpAddr::V4(Ipv4Addr::new(192, 0, 2, last_octet));
        self
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        session: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = session {
            builder = builder.header(header::COOKIE, format!("{SESSION_COOKIE}={token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let mut request = builder.body(body).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::new(self.ip, 40_000)));

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let session = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|c| {
                c.strip_prefix(&format!("{SESSION_COOKIE}="))
                    .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
            });
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        TestResponse {
            status,
            body,
            session,
        }
    }

    pub async fn post(&self, uri: &str, body: Value, session: Option<&str>) -> TestResponse {
        self.send("POST", uri, Some(body), session).await
    }

    pub async fn get(&self, uri: &str, session: Option<&str>) -> TestResponse {
        self.send("GET", uri, None, session).await
    }

    pub async fn signup(&self, username: &str, password: &str) -> TestResponse {
        self.post(
            "/api/signup",
            serde_json::json!({ "username": username, "password": password, "confirm": password }),
            None,
        )
        .await
    }

    /// Log in and return the session token.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .post(
                "/api/login",
                serde_json::json!({ "username": username, "password": password }),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {:?}", response.body);
        response.session.expect("login sets a session cookie")
    }

    pub async fn admin_login(&self, session: Option<&str>) -> TestResponse {
        self.post(
            "/admin/login",
            serde_json::json!({ "username": ADMIN_USER, "password": ADMIN_PASS, "phasekey": ADMIN_KEY }),
            session,
        )
        .await
    }
}
