use std::fmt;

use lounge_types::models::AdminIdentity;

/// Static admin credentials taken from configuration.
///
/// Compared by plain equality: this is a configured shared secret, not a
/// stored user credential.
#[derive(Clone)]
pub struct AdminCredentials {
    username: String,
    password: String,
    phase_key: String,
}

impl AdminCredentials {
    /// `None` if any part is empty, which leaves admin login disabled.
    pub fn new(username: String, password: String, phase_key: String) -> Option<Self> {
        if username.is_empty() || password.is_empty() || phase_key.is_empty() {
            return None;
        }
        Some(Self {
            username,
            password,
            phase_key,
        })
    }

    /// All three fields must match.
    pub fn authenticate(&self, username: &str, password: &str, phase_key: &str) -> Option<AdminIdentity> {
        let matches =
            username == self.username && password == self.password && phase_key == self.phase_key;

        matches.then(|| AdminIdentity {
            name: self.username.clone(),
        })
    }
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("phase_key", &"<redacted>")
            .finish()
    }
}
