use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::debug;
use uuid::Uuid;

use lounge_types::events::ServerEvent;

struct Participant {
    username: String,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

/// The broadcast hub: every active, authenticated realtime connection.
///
/// All fan-out happens with the registry locked, so the lock is the single
/// serialization point for emitted events: one event reaches every
/// participant before the next one starts.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

#[derive(Default)]
struct DispatcherInner {
    /// conn_id -> participant
    participants: Mutex<HashMap<Uuid, Participant>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection and announce it to everyone, itself included.
    /// Returns the connection id and its outbound event stream.
    pub async fn join(&self, username: String) -> (Uuid, mpsc::UnboundedReceiver<ServerEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut participants = self.inner.participants.lock().await;
        let event = ServerEvent::joined(&username);
        participants.insert(conn_id, Participant { username, tx });
        fan_out(&participants, event);

        (conn_id, rx)
    }

    /// Remove a connection. If it was registered, `farewell` names the user in
    /// the "left" notice sent to everyone still connected.
    pub async fn leave(&self, conn_id: Uuid, farewell: Option<&str>) {
        let mut participants = self.inner.participants.lock().await;
        let Some(gone) = participants.remove(&conn_id) else {
            return;
        };

        let name = farewell.unwrap_or(&gone.username);
        fan_out(&participants, ServerEvent::left(name));
    }

    /// Deliver an event to every active connection.
    pub async fn broadcast(&self, event: ServerEvent) {
        let participants = self.inner.participants.lock().await;
        fan_out(&participants, event);
    }

    /// Deliver an event to one connection only. Returns `false` if it is gone.
    pub async fn send_to(&self, conn_id: Uuid, event: ServerEvent) -> bool {
        let participants = self.inner.participants.lock().await;
        participants
            .get(&conn_id)
            .is_some_and(|p| p.tx.send(event).is_ok())
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.participants.lock().await.len()
    }
}

/// Send to all. A closed receiver is skipped, not unregistered: the
/// connection task still owns its slot and announces the departure in `leave`.
fn fan_out(participants: &HashMap<Uuid, Participant>, event: ServerEvent) {
    for (conn_id, p) in participants {
        if p.tx.send(event.clone()).is_err() {
            debug!("Skipping closed connection {} ({})", conn_id, p.username);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(user: &str, msg: &str) -> ServerEvent {
        ServerEvent::Chat {
            user: user.into(),
            msg: msg.into(),
        }
    }

    #[tokio::test]
    async fn join_is_announced_to_everyone_including_newcomer() {
        let hub = Dispatcher::new();
        let (_a, mut rx_a) = hub.join("alice".into()).await;
        assert_eq!(rx_a.recv().await, Some(ServerEvent::joined("alice")));

        let (_b, mut rx_b) = hub.join("bob".into()).await;
        assert_eq!(rx_a.recv().await, Some(ServerEvent::joined("bob")));
        assert_eq!(rx_b.recv().await, Some(ServerEvent::joined("bob")));
    }

    #[tokio::test]
    async fn broadcast_reaches_all_in_emission_order() {
        let hub = Dispatcher::new();
        let (_a, mut rx_a) = hub.join("alice".into()).await;
        let (_b, mut rx_b) = hub.join("bob".into()).await;
        rx_a.recv().await;
        rx_a.recv().await;
        rx_b.recv().await;

        hub.broadcast(chat("alice", "one")).await;
        hub.broadcast(chat("bob", "two")).await;

        for rx in [&mut rx_a, &mut rx_b] {
            assert_eq!(rx.recv().await, Some(chat("alice", "one")));
            assert_eq!(rx.recv().await, Some(chat("bob", "two")));
        }
    }

    #[tokio::test]
    async fn targeted_send_reaches_only_that_connection() {
        let hub = Dispatcher::new();
        let (a, mut rx_a) = hub.join("alice".into()).await;
        let (_b, mut rx_b) = hub.join("bob".into()).await;
        while rx_a.try_recv().is_ok() {}
        while rx_b.try_recv().is_ok() {}

        let err = ServerEvent::Error { msg: "nope".into() };
        assert!(hub.send_to(a, err.clone()).await);
        assert_eq!(rx_a.try_recv().ok(), Some(err));
        assert!(rx_b.try_recv().is_err());

        assert!(!hub.send_to(Uuid::new_v4(), chat("x", "y")).await);
    }

    #[tokio::test]
    async fn leave_notifies_remaining_and_is_idempotent() {
        let hub = Dispatcher::new();
        let (a, rx_a) = hub.join("alice".into()).await;
        let (_b, mut rx_b) = hub.join("bob".into()).await;
        while rx_b.try_recv().is_ok() {}
        drop(rx_a);

        hub.leave(a, Some("alicia")).await;
        assert_eq!(rx_b.recv().await, Some(ServerEvent::left("alicia")));

        hub.leave(a, None).await;
        assert!(rx_b.try_recv().is_err());
        assert_eq!(hub.connection_count().await, 1);
    }

    #[tokio::test]
    async fn closed_connection_is_still_announced_on_leave() {
        let hub = Dispatcher::new();
        let (a, rx_a) = hub.join("alice".into()).await;
        let (_b, mut rx_b) = hub.join("bob".into()).await;
        while rx_b.try_recv().is_ok() {}

        // Alice's socket is gone but her task has not reached `leave` yet
        drop(rx_a);
        hub.broadcast(chat("bob", "anyone?")).await;
        assert_eq!(rx_b.try_recv().ok(), Some(chat("bob", "anyone?")));
        assert_eq!(hub.connection_count().await, 2);

        hub.leave(a, Some("alice")).await;
        assert_eq!(rx_b.try_recv().ok(), Some(ServerEvent::left("alice")));
        assert_eq!(hub.connection_count().await, 1);
    }
}
