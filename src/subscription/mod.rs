//! WebSocket subscription handling: per-connection lifecycle and the
//! client/server message protocol.

pub mod manager;
pub mod protocol;

pub use manager::ConnectionManager;
pub use protocol::{ClientMessage, StreamChannel};
