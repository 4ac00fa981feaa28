//! Subscriber Session
//!
//! One task per WebSocket subscriber. The session registers a queue-backed
//! handle, then runs a writer and a reader until either finishes:
//!
//! - the writer drains the queue into the socket, one text message per
//!   frame, with a write timeout, and pings on an interval;
//! - the reader treats every inbound message as a liveness signal and ends
//!   on close, error or end of stream.
//!
//! The [`RegistrationGuard`] unregisters the subscriber when the session
//! returns.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};
use tokio_util::sync::CancellationToken;

use super::GatewayState;
use super::registration::RegistrationGuard;
use crate::domain::registry::{SubscriberHandle, SubscriberId};
use crate::infrastructure::broadcast::{FrameReceiver, subscriber_channel};
use crate::infrastructure::metrics;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client sent a close frame or the stream ended.
    ClientClosed,
    /// Reading from the socket failed.
    ReadError,
    /// Writing to the socket failed.
    WriteError,
    /// A write did not complete within the write timeout.
    WriteTimeout,
    /// The registry dropped the subscriber's queue.
    Evicted,
    /// The relay is shutting down.
    Shutdown,
}

impl SessionEnd {
    /// Label used for metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClientClosed => "client_closed",
            Self::ReadError => "read_error",
            Self::WriteError => "write_error",
            Self::WriteTimeout => "write_timeout",
            Self::Evicted => "evicted",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Timing of the writer loop.
#[derive(Debug, Clone, Copy)]
pub struct WriterConfig {
    /// Longest a single socket write may take.
    pub write_timeout: Duration,
    /// Interval between pings.
    pub ping_interval: Duration,
}

type WsSender = SplitSink<WebSocket, Message>;
type WsReceiver = SplitStream<WebSocket>;

/// Run one subscriber session to completion.
pub(super) async fn run(socket: WebSocket, state: Arc<GatewayState>) {
    let (sink, frames) = subscriber_channel(state.config.broadcast.subscriber_queue_capacity);
    let guard = RegistrationGuard::register(
        Arc::clone(&state.registry),
        SubscriberHandle::new(Arc::new(sink)),
    );
    let id = guard.id();

    metrics::record_subscriber_connected();
    tracing::info!(subscriber_id = id, subscribers = state.registry.len(), "Subscriber connected");

    let (sender, receiver) = socket.split();
    let writer_config = WriterConfig {
        write_timeout: state.config.write_timeout,
        ping_interval: state.config.ping_interval,
    };

    let end = tokio::select! {
        end = write_loop(id, sender, frames, writer_config, state.shutdown.clone()) => end,
        end = read_loop(id, receiver) => end,
    };

    drop(guard);
    metrics::record_subscriber_disconnected(end.as_str());
    tracing::info!(subscriber_id = id, reason = end.as_str(), "Subscriber disconnected");
}

async fn write_loop(
    id: SubscriberId,
    mut sender: WsSender,
    mut frames: FrameReceiver,
    config: WriterConfig,
    shutdown: CancellationToken,
) -> SessionEnd {
    let mut ping = interval_at(Instant::now() + config.ping_interval, config.ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let message = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                let close = Message::Close(Some(CloseFrame {
                    code: close_code::AWAY,
                    reason: "server shutting down".into(),
                }));
                let _ = timeout(config.write_timeout, sender.send(close)).await;
                return SessionEnd::Shutdown;
            }
            frame = frames.recv() => match frame {
                Some(frame) => Message::Text(frame.as_str().to_owned().into()),
                None => return SessionEnd::Evicted,
            },
            _ = ping.tick() => Message::Ping(Bytes::new()),
        };

        match timeout(config.write_timeout, sender.send(message)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(subscriber_id = id, error = %e, "WebSocket write failed");
                return SessionEnd::WriteError;
            }
            Err(_) => {
                tracing::warn!(
                    subscriber_id = id,
                    timeout_ms = u64::try_from(config.write_timeout.as_millis()).unwrap_or(u64::MAX),
                    "WebSocket write timed out"
                );
                return SessionEnd::WriteTimeout;
            }
        }
    }
}

async fn read_loop(id: SubscriberId, mut receiver: WsReceiver) -> SessionEnd {
    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Close(frame)) => {
                tracing::debug!(subscriber_id = id, frame = ?frame, "Client closed connection");
                return SessionEnd::ClientClosed;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(subscriber_id = id, error = %e, "WebSocket read failed");
                return SessionEnd::ReadError;
            }
        }
    }

    SessionEnd::ClientClosed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_end_labels() {
        assert_eq!(SessionEnd::ClientClosed.as_str(), "client_closed");
        assert_eq!(SessionEnd::ReadError.as_str(), "read_error");
        assert_eq!(SessionEnd::WriteError.as_str(), "write_error");
        assert_eq!(SessionEnd::WriteTimeout.as_str(), "write_timeout");
        assert_eq!(SessionEnd::Evicted.as_str(), "evicted");
        assert_eq!(SessionEnd::Shutdown.as_str(), "shutdown");
    }
}
