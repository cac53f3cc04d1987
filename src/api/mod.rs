//! HTTP façade of the command proxy
//!
//! Exposes login, device listing, discovery, state and command routes over
//! the active [`BridgeSession`](crate::bridge::BridgeSession).

pub mod http;
pub mod rest;
pub mod state;

pub use http::create_router;
pub use state::AppState;
