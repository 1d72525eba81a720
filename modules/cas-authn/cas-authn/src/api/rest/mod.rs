//! REST surface: the receptor endpoint called back by the CAS server.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use routes::{DEFAULT_CALLBACK_PATH, register_routes};
