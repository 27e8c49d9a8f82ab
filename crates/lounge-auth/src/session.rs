//! Server-side session records keyed by an opaque cookie token.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use tokio::sync::RwLock;
use tracing::debug;

use lounge_types::models::{AdminIdentity, UserIdentity};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "lounge_session";

/// Default session lifetime (7 days).
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7);

const TOKEN_BYTES: usize = 32;

/// What a session knows about its holder.
///
/// The two identities are independent: being an admin never implies being a
/// chat user, and the reverse. Every protected operation checks the one it needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<UserIdentity>,
    pub admin: Option<AdminIdentity>,
}

impl Session {
    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.admin.is_none()
    }
}

/// One session behind its own lock, so a slow update to one session never
/// stalls lookups of the others.
struct Slot {
    session: RwLock<Session>,
    expires_at: Instant,
}

impl Slot {
    fn live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-memory session authority. Cheap to clone; all clones share state.
///
/// The table lock is only held to find, insert or remove a slot.
#[derive(Clone)]
pub struct SessionStore {
    slots: Arc<RwLock<HashMap<String, Arc<Slot>>>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slots: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    async fn slot(&self, token: &str) -> Option<Arc<Slot>> {
        let slots = self.slots.read().await;
        slots.get(token).filter(|s| s.live(Instant::now())).cloned()
    }

    /// Snapshot of a live session. Expired or unknown tokens yield `None`.
    pub async fn get(&self, token: &str) -> Option<Session> {
        let slot = self.slot(token).await?;
        let session = slot.session.read().await.clone();
        Some(session)
    }

    /// The user identity currently attached to `token`, if any.
    pub async fn user(&self, token: &str) -> Option<UserIdentity> {
        self.get(token).await.and_then(|s| s.user)
    }

    /// Attach a user identity, reusing the caller's live session when there is
    /// one. Returns the token to hand back in the cookie.
    pub async fn establish_user(&self, token: Option<&str>, user: UserIdentity) -> String {
        self.establish(token, |s| s.user = Some(user)).await
    }

    /// Attach an admin identity. Any user identity on the session is left alone.
    pub async fn establish_admin(&self, token: Option<&str>, admin: AdminIdentity) -> String {
        self.establish(token, |s| s.admin = Some(admin)).await
    }

    async fn establish(&self, token: Option<&str>, apply: impl FnOnce(&mut Session)) -> String {
        if let Some(token) = token {
            if let Some(slot) = self.slot(token).await {
                apply(&mut *slot.session.write().await);
                return token.to_string();
            }
        }

        let now = Instant::now();
        let mut session = Session::default();
        apply(&mut session);
        let slot = Arc::new(Slot {
            session: RwLock::new(session),
            expires_at: now + self.ttl,
        });

        let token = generate_token();
        let mut slots = self.slots.write().await;
        slots.retain(|_, s| s.live(now));
        slots.insert(token.clone(), slot);
        debug!("Session created ({} live)", slots.len());
        token
    }

    /// Forget the session entirely. Unknown tokens are ignored.
    pub async fn destroy(&self, token: &str) {
        self.slots.write().await.remove(token);
    }

    /// Drop only the admin identity; the session is removed if nothing is left.
    pub async fn clear_admin(&self, token: &str) {
        let Some(slot) = self.slot(token).await else {
            return;
        };
        let emptied = {
            let mut session = slot.session.write().await;
            session.admin = None;
            session.is_empty()
        };
        if !emptied {
            return;
        }

        let mut slots = self.slots.write().await;
        // A login may have refilled the session in between
        if slots.get(token).is_some_and(|s| Arc::ptr_eq(s, &slot))
            && slot.session.read().await.is_empty()
        {
            slots.remove(token);
        }
    }

    /// Rename the session's user, running `write` (the durable store update)
    /// while this session is locked so no reader sees the old name after the
    /// store has the new one. Other sessions are not held up.
    ///
    /// `write` returns whether the account still exists. Returns the refreshed
    /// identity, or `None` if the session carries no user (or the account is
    /// gone, in which case the user identity is dropped from the session).
    pub async fn rename_user<F, Fut, E>(
        &self,
        token: &str,
        new_name: &str,
        write: F,
    ) -> Result<Option<UserIdentity>, E>
    where
        F: FnOnce(UserIdentity) -> Fut,
        Fut: Future<Output = Result<bool, E>>,
    {
        let Some(slot) = self.slot(token).await else {
            return Ok(None);
        };
        let mut session = slot.session.write().await;
        let Some(current) = session.user.clone() else {
            return Ok(None);
        };

        if write(current).await? {
            let user = session.user.as_mut().map(|u| {
                u.username = new_name.to_string();
                u.clone()
            });
            Ok(user)
        } else {
            session.user = None;
            Ok(None)
        }
    }
}

fn generate_token() -> String {
    let mut buffer = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}
