mod common;

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{StatusCode, header};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::{self, Message, client::IntoClientRequest};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use common::TestApp;
use lounge_auth::SESSION_COOKIE;
use lounge_server::build_router;
use lounge_types::models::UserIdentity;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server(app: &TestApp) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = build_router(app.state.clone(), None);
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

/// Create an account directly and hand back a session token for it.
async fn session_for(app: &TestApp, username: &str) -> String {
    let id = app.state.db.create_account(username, "not-a-real-hash").unwrap();
    app.state
        .sessions
        .establish_user(
            None,
            UserIdentity {
                id,
                username: username.into(),
            },
        )
        .await
}

async fn connect(addr: SocketAddr, token: Option<&str>) -> Result<Client, tungstenite::Error> {
    let mut request = format!("ws://{addr}/ws").into_client_request()?;
    if let Some(token) = token {
        request.headers_mut().insert(
            header::COOKIE,
            format!("{SESSION_COOKIE}={token}").parse().unwrap(),
        );
    }
    connect_async(request).await.map(|(ws, _)| ws)
}

/// Next server event, skipping control frames.
async fn next_event(client: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for an event")
            .expect("connection closed")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn say(client: &mut Client, msg: &str) {
    let command = json!({ "type": "message", "data": { "msg": msg } });
    client
        .send(Message::Text(command.to_string().into()))
        .await
        .unwrap();
}

fn system(msg: &str) -> Value {
    json!({ "type": "system", "data": { "msg": msg } })
}

fn chat(user: &str, msg: &str) -> Value {
    json!({ "type": "chat", "data": { "user": user, "msg": msg } })
}

#[tokio::test]
async fn handshake_without_a_user_session_is_refused() {
    let app = TestApp::new();
    let addr = spawn_server(&app).await;

    let err = connect(addr, None).await.unwrap_err();
    match err {
        tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED)
        }
        other => panic!("expected an HTTP refusal, got {other:?}"),
    }

    // An admin-only session is not enough either
    let admin = app.admin_login(None).await.session.unwrap();
    assert!(connect(addr, Some(&admin)).await.is_err());
    assert!(connect(addr, Some("made-up-token")).await.is_err());
    assert_eq!(app.state.gateway.dispatcher.connection_count().await, 0);
}

#[tokio::test]
async fn chat_flows_between_connections() {
    let app = TestApp::new();
    let addr = spawn_server(&app).await;
    let alice_token = session_for(&app, "alice").await;
    let bob_token = session_for(&app, "bob").await;

    let mut alice = connect(addr, Some(&alice_token)).await.unwrap();
    assert_eq!(next_event(&mut alice).await, system("alice joined the chat."));

    let mut bob = connect(addr, Some(&bob_token)).await.unwrap();
    assert_eq!(next_event(&mut bob).await, system("bob joined the chat."));
    assert_eq!(next_event(&mut alice).await, system("bob joined the chat."));

    say(&mut bob, "hi").await;
    assert_eq!(next_event(&mut alice).await, chat("bob", "hi"));
    assert_eq!(next_event(&mut bob).await, chat("bob", "hi"));

    // Blank lines are dropped without a broadcast
    say(&mut alice, "   ").await;
    say(&mut alice, " <hello> ").await;
    assert_eq!(next_event(&mut bob).await, chat("alice", "&lt;hello&gt;"));
    assert_eq!(next_event(&mut alice).await, chat("alice", "&lt;hello&gt;"));

    let ledger = app.state.messages.clone();
    let history = tokio::task::spawn_blocking(move || ledger.recent(30).unwrap())
        .await
        .unwrap();
    let bodies: Vec<_> = history.iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies, ["hi", "&lt;hello&gt;"]);

    alice.close(None).await.unwrap();
    assert_eq!(next_event(&mut bob).await, system("alice left the chat."));
}

#[tokio::test]
async fn logged_out_connection_cannot_chat() {
    let app = TestApp::new();
    let addr = spawn_server(&app).await;
    let carol_token = session_for(&app, "carol").await;
    let dave_token = session_for(&app, "dave").await;

    let mut carol = connect(addr, Some(&carol_token)).await.unwrap();
    assert_eq!(next_event(&mut carol).await, system("carol joined the chat."));
    let mut dave = connect(addr, Some(&dave_token)).await.unwrap();
    assert_eq!(next_event(&mut dave).await, system("dave joined the chat."));
    assert_eq!(next_event(&mut carol).await, system("dave joined the chat."));

    app.state.sessions.destroy(&carol_token).await;
    say(&mut carol, "still here?").await;
    assert_eq!(
        next_event(&mut carol).await,
        json!({ "type": "error", "data": { "msg": "You must be logged in." } })
    );

    // Dave never saw the rejected line
    say(&mut dave, "ping").await;
    assert_eq!(next_event(&mut dave).await, chat("dave", "ping"));
    assert_eq!(next_event(&mut carol).await, chat("dave", "ping"));
}

#[tokio::test]
async fn renamed_user_leaves_under_the_new_name() {
    let app = TestApp::new();
    let addr = spawn_server(&app).await;
    let erin_token = session_for(&app, "erin").await;
    let frank_token = session_for(&app, "frank").await;

    let mut erin = connect(addr, Some(&erin_token)).await.unwrap();
    assert_eq!(next_event(&mut erin).await, system("erin joined the chat."));
    let mut frank = connect(addr, Some(&frank_token)).await.unwrap();
    assert_eq!(next_event(&mut frank).await, system("frank joined the chat."));
    assert_eq!(next_event(&mut erin).await, system("frank joined the chat."));

    let renamed = app
        .post(
            "/api/profile",
            json!({ "nickname": "erin2" }),
            Some(&erin_token),
        )
        .await;
    assert_eq!(renamed.status, StatusCode::OK);

    say(&mut erin, "new me").await;
    assert_eq!(next_event(&mut frank).await, chat("erin2", "new me"));

    erin.close(None).await.unwrap();
    assert_eq!(next_event(&mut frank).await, system("erin2 left the chat."));
}
