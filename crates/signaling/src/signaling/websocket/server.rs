//! WebSocket signaling server
//!
//! Accepts sockets and spawns one handler task per connection. The accept
//! loop runs until [`SignalingServerHandle::shutdown`] is called.

use super::handler::handle_connection;
use crate::registry::RoomRegistry;
use crate::{Error, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// WebSocket signaling server
pub struct SignalingServer {
    /// Address to bind
    addr: SocketAddr,

    registry: Arc<RoomRegistry>,
}

impl SignalingServer {
    /// Create a server bound to the registry's configured address
    pub fn new(registry: Arc<RoomRegistry>) -> Result<Self> {
        let addr = registry
            .config()
            .bind_address
            .parse::<SocketAddr>()
            .map_err(|e| {
                Error::InvalidConfig(format!(
                    "Invalid bind address {}: {}",
                    registry.config().bind_address,
                    e
                ))
            })?;

        Ok(Self { addr, registry })
    }

    /// Get the configured address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Bind the listener and start accepting connections
    ///
    /// Returns once the socket is bound.
    pub async fn start(self) -> Result<SignalingServerHandle> {
        let listener = TcpListener::bind(self.addr).await.map_err(|e| {
            error!("Failed to bind WebSocket server to {}: {}", self.addr, e);
            Error::IoError(e)
        })?;
        let local_addr = listener.local_addr()?;

        info!("Signaling server listening on ws://{}", local_addr);

        let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
        let registry = self.registry;

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, peer_addr)) => {
                                let registry = Arc::clone(&registry);
                                tokio::spawn(async move {
                                    if let Err(e) = handle_connection(stream, registry).await {
                                        error!("WebSocket connection error from {}: {}", peer_addr, e);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Failed to accept WebSocket connection: {}", e);
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Signaling server received shutdown signal");
                        break;
                    }
                }
            }

            info!("Signaling server accept loop exited");
        });

        Ok(SignalingServerHandle {
            local_addr,
            shutdown_tx,
            task,
        })
    }
}

/// Handle for controlling a running signaling server
pub struct SignalingServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl SignalingServerHandle {
    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for the accept loop to exit
    pub async fn shutdown(self) {
        info!("Sending shutdown signal to signaling server");
        let _ = self.shutdown_tx.send(());

        if let Err(e) = self.task.await {
            error!("Signaling server task failed: {}", e);
        }
    }
}
