//! Identity plumbing shared by the REST layer and the realtime gateway.

pub mod admin;
pub mod password;
pub mod rate_limit;
pub mod session;

pub use admin::AdminCredentials;
pub use rate_limit::{Policy, RateLimited, RateLimiter};
pub use session::{SESSION_COOKIE, Session, SessionStore};
