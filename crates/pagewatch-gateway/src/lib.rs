//! # Pagewatch Gateway
//! The HTTP/WebSocket surface around the watch pipeline: a one-off
//! execution endpoint that bypasses policy and fan-out, task management
//! routes that keep timers in sync with the store, and the live-socket
//! push that drains the notification hub.

pub mod routes;
pub mod server;
pub mod ws;

pub use server::{AppState, build_router};
