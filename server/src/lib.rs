//! WebSocket session dispatcher for the tandem backend.

pub mod broadcast;
pub mod config;
pub mod session;
