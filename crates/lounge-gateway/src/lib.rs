pub mod connection;
pub mod dispatcher;

pub use connection::{ConnectionState, Gateway};
pub use dispatcher::Dispatcher;
