//! Accepts inbound connections and drives them through the handshake
//! before handing them to the caller-supplied callback (§4.4, §4.5 "Join").

use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use wardenrt::util::NodeId;

use super::connection::{handshake, spawn_pump, ConnectionHandle, Inbound};
use crate::error::ClusterError;

/// One accepted, handshaken connection, handed back to the listener's
/// caller so it can be registered in the membership table.
pub struct Accepted {
    pub handle: ConnectionHandle,
}

/// Binds `host:port` and accepts connections until the task is dropped.
/// Every accepted socket is handshaken and its pump spawned; the resulting
/// [`ConnectionHandle`] and the peer's `NodeId` (on `handle.peer`) are
/// pushed onto `accepted_tx` for the cluster orchestrator to register.
pub async fn run(
    host: String,
    port: u16,
    local: NodeId,
    secret: Option<String>,
    handshake_timeout: Duration,
    inbound: mpsc::UnboundedSender<Inbound>,
    accepted_tx: mpsc::UnboundedSender<Accepted>,
) -> Result<(), ClusterError> {
    let listener = TcpListener::bind((host.as_str(), port)).await.map_err(|err| ClusterError::BindFailed {
        host: host.clone(),
        port,
        reason: err.to_string(),
    })?;
    tracing::info!(%host, port, "cluster transport listening");

    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                tracing::warn!(error = %err, "accept failed");
                continue;
            }
        };
        let local = local.clone();
        let secret = secret.clone();
        let inbound = inbound.clone();
        let accepted_tx = accepted_tx.clone();

        tokio::spawn(async move {
            match handshake(stream, &local, false, handshake_timeout).await {
                Ok((framed, peer)) => {
                    let handle = spawn_pump(framed, local, peer, secret, inbound);
                    let _ = accepted_tx.send(Accepted { handle });
                }
                Err(err) => {
                    tracing::warn!(%peer_addr, error = %err, "inbound handshake failed");
                }
            }
        });
    }
}
