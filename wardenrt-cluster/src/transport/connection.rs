//! One persistent TCP connection to a peer node (§4.4 "Connection
//! management"): a steady-state read/write pump task plus the handshake
//! that establishes it.
//!
//! Ownership of the underlying socket, once the pump is spawned, belongs
//! entirely to that task — everything else talks to it through
//! [`ConnectionHandle`]'s channel, mirroring how `wardenrt::engine`'s
//! worker owns an actor's state exclusively.

use std::time::Duration;

use chrono::Utc;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;

use wardenrt::util::NodeId;

use super::super::error::TransportError;
use super::super::wire::{EnvelopeCodec, MessageEnvelope, WireMessage};

/// One decoded, signature-verified frame received from a peer.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub from: NodeId,
    pub payload: WireMessage,
    pub received_at: chrono::DateTime<Utc>,
}

/// A handle to a running connection pump. Cheap to clone; every clone can
/// enqueue outbound envelopes independently.
#[derive(Clone)]
pub struct ConnectionHandle {
    pub peer: NodeId,
    tx: mpsc::UnboundedSender<WireMessage>,
}

impl ConnectionHandle {
    /// Enqueue `msg` for delivery to `self.peer`. Fails only once the pump
    /// task has exited (socket closed).
    pub fn send(&self, msg: WireMessage) -> Result<(), TransportError> {
        self.tx
            .send(msg)
            .map_err(|_| TransportError::ConnectionClosed(self.peer.clone()))
    }
}

/// Exchange `Hello` frames over a freshly connected/accepted socket and
/// return the framed connection plus the peer's advertised `NodeId`.
///
/// `initiator` sends first; the accepting side always replies before
/// reading further, so both ends observe a symmetric two-frame handshake
/// regardless of who dialed.
pub async fn handshake(
    stream: TcpStream,
    local: &NodeId,
    initiator: bool,
    timeout: Duration,
) -> Result<(Framed<TcpStream, EnvelopeCodec>, NodeId), TransportError> {
    let mut framed = Framed::new(stream, EnvelopeCodec::new());
    let hello = WireMessage::Hello { node_id: local.clone(), capabilities: vec!["wardenrt/1".to_string()] };

    let exchange = async {
        if initiator {
            framed
                .send(MessageEnvelope::new(local.clone(), Utc::now().timestamp_millis(), hello))
                .await?;
            let Some(envelope) = framed.next().await else {
                return Err(TransportError::ConnectionClosed(local.clone()));
            };
            let envelope = envelope?;
            match envelope.payload {
                WireMessage::Hello { node_id, .. } => Ok(node_id),
                _ => Err(TransportError::Codec("expected Hello".to_string())),
            }
        } else {
            let Some(envelope) = framed.next().await else {
                return Err(TransportError::ConnectionClosed(local.clone()));
            };
            let envelope = envelope?;
            let peer = match envelope.payload {
                WireMessage::Hello { node_id, .. } => node_id,
                _ => return Err(TransportError::Codec("expected Hello".to_string())),
            };
            framed
                .send(MessageEnvelope::new(local.clone(), Utc::now().timestamp_millis(), hello))
                .await?;
            Ok(peer)
        }
    };

    match tokio::time::timeout(timeout, exchange).await {
        Ok(Ok(peer)) => Ok((framed, peer)),
        Ok(Err(err)) => Err(err),
        Err(_elapsed) => Err(TransportError::HandshakeTimeout(local.clone())),
    }
}

/// Spawn the steady-state read/write pump for an already-handshaken
/// connection. Incoming frames are signature-checked against `secret` and
/// forwarded to `inbound`; a frame that fails verification is dropped with
/// a `warn` log rather than closing the connection (§4.4 "Authentication":
/// "incoming envelopes without a matching signature are dropped").
pub fn spawn_pump(
    mut framed: Framed<TcpStream, EnvelopeCodec>,
    local: NodeId,
    peer: NodeId,
    secret: Option<String>,
    inbound: mpsc::UnboundedSender<Inbound>,
) -> ConnectionHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<WireMessage>();
    let handle_peer = peer.clone();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                outgoing = rx.recv() => {
                    let Some(msg) = outgoing else {
                        tracing::debug!(peer = %peer, "connection pump: outbound channel closed");
                        break;
                    };
                    let kind = msg.kind_label();
                    let mut envelope = MessageEnvelope::new(local.clone(), Utc::now().timestamp_millis(), msg);
                    if let Some(secret) = &secret {
                        if let Err(err) = envelope.sign(secret) {
                            tracing::warn!(peer = %peer, error = %err, "failed to sign outgoing envelope");
                            continue;
                        }
                    }
                    if let Err(err) = framed.send(envelope).await {
                        tracing::warn!(peer = %peer, %kind, error = %err, "failed to send frame, closing connection");
                        break;
                    }
                }
                incoming = framed.next() => {
                    match incoming {
                        Some(Ok(envelope)) => {
                            if envelope.verify(secret.as_deref()).is_err() {
                                tracing::warn!(peer = %peer, "dropping envelope with invalid signature");
                                continue;
                            }
                            let received = Inbound {
                                from: envelope.from,
                                payload: envelope.payload,
                                received_at: Utc::now(),
                            };
                            if inbound.send(received).is_err() {
                                break;
                            }
                        }
                        Some(Err(err)) => {
                            tracing::warn!(peer = %peer, error = %err, "frame decode error, closing connection");
                            break;
                        }
                        None => {
                            tracing::info!(peer = %peer, "peer closed connection");
                            break;
                        }
                    }
                }
            }
        }
    });

    ConnectionHandle { peer: handle_peer, tx }
}

/// Exponential backoff for reconnect attempts (§4.4 "Connection management"):
/// starts at 1s, factor 1.5, capped at 30s, no jitter.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    current: Duration,
}

impl ReconnectBackoff {
    const INITIAL: Duration = Duration::from_secs(1);
    const FACTOR: f64 = 1.5;
    const CAP: Duration = Duration::from_secs(30);

    pub fn new() -> Self {
        Self { current: Self::INITIAL }
    }

    /// The delay to wait before the next attempt, then advance.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        let scaled = self.current.mul_f64(Self::FACTOR);
        self.current = scaled.min(Self::CAP);
        delay
    }

    /// Reset to the initial delay after a successful connection.
    pub fn reset(&mut self) {
        self.current = Self::INITIAL;
    }
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new()
    }
}

/// Tie-break rule for which side of a node pair owns the single persistent
/// connection: the lexicographically smaller `NodeId` string initiates
/// (§4.4 "owned by the initiator of the pair, lower NodeId string wins on
/// tie").
pub fn should_initiate(local: &NodeId, peer: &NodeId) -> bool {
    local.as_str() < peer.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str) -> NodeId {
        NodeId::new(name, "127.0.0.1", 9000)
    }

    #[test]
    fn backoff_grows_by_factor_and_caps() {
        let mut backoff = ReconnectBackoff::new();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_millis(1500));
        assert_eq!(backoff.next_delay(), Duration::from_millis(2250));
        for _ in 0..20 {
            backoff.next_delay();
        }
        assert_eq!(backoff.next_delay(), Duration::from_secs(30));
    }

    #[test]
    fn backoff_resets() {
        let mut backoff = ReconnectBackoff::new();
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn lower_node_id_string_initiates() {
        assert!(should_initiate(&node("alpha"), &node("beta")));
        assert!(!should_initiate(&node("beta"), &node("alpha")));
    }

    #[tokio::test]
    async fn handshake_exchanges_node_ids() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            handshake(stream, &node("server"), false, Duration::from_secs(1)).await
        });

        let client_stream = TcpStream::connect(addr).await.expect("connect");
        let (_, peer) = handshake(client_stream, &node("client"), true, Duration::from_secs(1))
            .await
            .expect("client handshake");
        assert_eq!(peer, node("server"));

        let (_, peer) = server.await.expect("join").expect("server handshake");
        assert_eq!(peer, node("client"));
    }
}
