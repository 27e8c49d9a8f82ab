use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use lounge_auth::SessionStore;
use lounge_db::MessageLedger;
use lounge_types::events::{ClientCommand, ServerEvent};
use lounge_types::models::UserIdentity;

use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Lifecycle of one realtime connection.
///
/// `Connecting -> Authorized -> Active -> Closed`, or `Connecting -> Closed`
/// when the handshake carries no user session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Authorized,
    Active,
    Closed,
}

impl ConnectionState {
    pub fn can_advance_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Connecting, Authorized) | (Connecting, Closed) | (Authorized, Active) | (Authorized, Closed) | (Active, Closed)
        )
    }

    fn advance(&mut self, next: ConnectionState, conn: &str) {
        debug_assert!(self.can_advance_to(next), "{self:?} -> {next:?}");
        debug!("{}: {:?} -> {:?}", conn, self, next);
        *self = next;
    }
}

/// Everything a connection task needs, handed in by the server at startup.
#[derive(Clone)]
pub struct Gateway {
    pub dispatcher: Dispatcher,
    pub sessions: SessionStore,
    pub ledger: MessageLedger,
}

impl Gateway {
    /// Handshake check. Only a live session with a user identity may connect;
    /// anything else is refused before the upgrade and nobody is notified.
    pub async fn authorize(&self, token: Option<&str>) -> Option<UserIdentity> {
        let user = match token {
            Some(token) => self.sessions.user(token).await,
            None => None,
        };
        if user.is_none() {
            debug!("Realtime handshake refused: no user session");
        }
        user
    }

    /// Run an authorized connection until either side closes it.
    pub async fn handle_connection(self, socket: WebSocket, token: String, user: UserIdentity) {
        let label = format!("{} ({})", user.username, user.id);
        let mut state = ConnectionState::Authorized;

        let (mut sender, mut receiver) = socket.split();

        let (conn_id, mut events) = self.dispatcher.join(user.username.clone()).await;
        state.advance(ConnectionState::Active, &label);
        info!("{} joined the chat", label);

        let pong_received = Arc::new(AtomicBool::new(true));
        let pong_flag_send = pong_received.clone();
        let pong_flag_recv = pong_received.clone();

        // Forward hub events -> client, with heartbeat
        let mut send_task = tokio::spawn(async move {
            let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
            heartbeat.tick().await;
            let mut missed_heartbeats: u8 = 0;

            loop {
                tokio::select! {
                    event = events.recv() => {
                        let Some(event) = event else { break };
                        let text = match serde_json::to_string(&event) {
                            Ok(text) => text,
                            Err(e) => {
                                error!("Failed to encode {:?}: {}", event, e);
                                continue;
                            }
                        };
                        if sender.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    _ = heartbeat.tick() => {
                        if pong_flag_send.swap(false, Ordering::Acquire) {
                            missed_heartbeats = 0;
                        } else {
                            missed_heartbeats += 1;
                            if missed_heartbeats >= 2 {
                                warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                                break;
                            }
                        }
                        if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        // Read commands from client. Commands are handled one at a time, so a
        // sender's chat lines are persisted and broadcast in the order sent.
        let gateway = self.clone();
        let recv_token = token.clone();
        let recv_label = label.clone();
        let mut recv_task = tokio::spawn(async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientCommand>(&text) {
                        Ok(cmd) => gateway.handle_command(conn_id, &recv_token, cmd).await,
                        Err(e) => {
                            warn!(
                                "{} bad command: {} -- raw: {}",
                                recv_label,
                                e,
                                text.chars().take(200).collect::<String>()
                            );
                        }
                    },
                    Message::Pong(_) => {
                        pong_flag_recv.store(true, Ordering::Release);
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        });

        // Wait for either task to finish
        tokio::select! {
            _ = &mut send_task => recv_task.abort(),
            _ = &mut recv_task => send_task.abort(),
        }

        // Announce under the latest name the session knows, if it still has one
        let current = self.sessions.user(&token).await.map(|u| u.username);
        self.dispatcher
            .leave(conn_id, Some(current.as_deref().unwrap_or(&user.username)))
            .await;
        state.advance(ConnectionState::Closed, &label);
        info!("{} left the chat", label);
    }

    async fn handle_command(&self, conn_id: Uuid, token: &str, cmd: ClientCommand) {
        match cmd {
            ClientCommand::Message { msg } => self.send_chat(conn_id, token, msg).await,
        }
    }

    /// Re-check the session, persist, then broadcast. Broadcast never precedes
    /// its own persistence.
    async fn send_chat(&self, conn_id: Uuid, token: &str, msg: String) {
        let Some(user) = self.sessions.user(token).await else {
            self.dispatcher
                .send_to(
                    conn_id,
                    ServerEvent::Error {
                        msg: "You must be logged in.".into(),
                    },
                )
                .await;
            return;
        };

        let ledger = self.ledger.clone();
        let appended = tokio::task::spawn_blocking(move || ledger.append(&user, &msg)).await;

        match appended {
            Ok(Ok(Some(stored))) => {
                self.dispatcher
                    .broadcast(ServerEvent::Chat {
                        user: stored.author_username,
                        msg: stored.body,
                    })
                    .await;
            }
            // Blank line: neither stored nor broadcast
            Ok(Ok(None)) => {}
            Ok(Err(e)) => {
                error!("Failed to store chat message: {:#}", e);
                self.dispatcher
                    .send_to(
                        conn_id,
                        ServerEvent::Error {
                            msg: "Message could not be sent.".into(),
                        },
                    )
                    .await;
            }
            Err(e) => error!("spawn_blocking join error: {}", e),
        }
    }
}
