//! WebSocket transport
//!
//! JSON text frames carrying `{"event": ..., "data": ...}` objects.

mod handler;
mod server;

pub use handler::WsClientConnection;
pub use server::{SignalingServer, SignalingServerHandle};
