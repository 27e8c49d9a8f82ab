pub mod config;
pub mod retention;
pub mod routes;

pub use config::Config;
pub use routes::build_router;
