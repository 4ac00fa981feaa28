//! gRPC Ingress Server Implementation
//!
//! Implements the `FrameRelayService` gRPC service on top of [`FrameIngress`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use prost_types::Timestamp;
use tonic::{Code, Request, Response, Status, Streaming};
use tonic_types::{ErrorDetails, StatusExt};

use super::proto::relay::v1::{
    GetRelayStatusRequest, GetRelayStatusResponse, RelayStatus, SendFrameRequest,
    SendFrameResponse, StreamFramesResponse,
    frame_relay_service_server::{FrameRelayService, FrameRelayServiceServer},
};
use crate::application::services::{FrameIngress, IngressReceipt};
use crate::domain::frame::{FrameError, FrameLimits};
use crate::infrastructure::metrics::{self, IngressKind};

// =============================================================================
// Constants
// =============================================================================

/// Acknowledgment returned for every accepted frame.
pub const ACK_MESSAGE: &str = "Image received and broadcasted";

const ERROR_DOMAIN: &str = "frame-relay";

/// Room above the frame limit for the `media_type` field and protobuf framing.
pub const MESSAGE_HEADROOM: usize = 64 * 1024;

type RpcResult<T> = Result<Response<T>, Status>;

// =============================================================================
// Server Configuration
// =============================================================================

/// Configuration for the gRPC ingress server.
#[derive(Debug, Clone)]
pub struct FrameRelayServerConfig {
    /// Relay version string.
    pub version: String,
}

impl Default for FrameRelayServerConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// Server Implementation
// =============================================================================

/// gRPC ingress server for producer frames.
#[derive(Debug)]
pub struct FrameRelayServer {
    config: FrameRelayServerConfig,
    ingress: Arc<FrameIngress>,
}

impl FrameRelayServer {
    /// Create a new ingress server.
    #[must_use]
    pub const fn new(config: FrameRelayServerConfig, ingress: Arc<FrameIngress>) -> Self {
        Self { config, ingress }
    }

    /// The ingress frames are submitted to.
    #[must_use]
    pub const fn ingress(&self) -> &Arc<FrameIngress> {
        &self.ingress
    }

    /// Wrap the server in its tonic service.
    ///
    /// The decoder accepts messages up to the frame limit plus
    /// [`MESSAGE_HEADROOM`], so size violations reach frame validation and
    /// come back as `InvalidArgument` rather than a transport error.
    #[must_use]
    pub fn into_service(self) -> FrameRelayServiceServer<Self> {
        let limit = max_decoding_message_size(self.ingress.limits());
        FrameRelayServiceServer::from_arc(Arc::new(self)).max_decoding_message_size(limit)
    }

    fn accept(&self, request: SendFrameRequest, kind: IngressKind) -> Result<IngressReceipt, Status> {
        match self.ingress.submit(request.image_data, &request.media_type) {
            Ok(receipt) => {
                metrics::record_frame_received(kind);
                metrics::record_broadcast(&receipt.report, receipt.broadcast_duration);
                if !receipt.report.removed.is_empty() {
                    metrics::set_subscribers(self.ingress.registry().len());
                }

                tracing::trace!(
                    sequence = receipt.sequence,
                    media_type = %receipt.media_type,
                    delivered = receipt.report.delivered,
                    dropped = receipt.report.dropped,
                    failed = receipt.report.failed,
                    "Frame broadcast"
                );
                if receipt.report.dropped > 0 {
                    tracing::debug!(
                        sequence = receipt.sequence,
                        dropped = receipt.report.dropped,
                        "Frame dropped for slow subscribers"
                    );
                }
                for id in &receipt.report.removed {
                    tracing::debug!(subscriber_id = id, "Removed closed subscriber");
                }

                Ok(receipt)
            }
            Err(e) => {
                metrics::record_frame_rejected(kind, e.reason());
                tracing::warn!(error = %e, "Rejected frame");
                Err(frame_error_to_status(&e))
            }
        }
    }
}

#[tonic::async_trait]
impl FrameRelayService for FrameRelayServer {
    async fn send_frame(&self, request: Request<SendFrameRequest>) -> RpcResult<SendFrameResponse> {
        let receipt = self.accept(request.into_inner(), IngressKind::Unary)?;

        Ok(Response::new(SendFrameResponse {
            message: ACK_MESSAGE.to_string(),
            sequence: receipt.sequence,
        }))
    }

    async fn stream_frames(
        &self,
        request: Request<Streaming<SendFrameRequest>>,
    ) -> RpcResult<StreamFramesResponse> {
        let remote = request.remote_addr();
        let mut frames = request.into_inner();
        let mut accepted: u64 = 0;

        tracing::info!(remote = ?remote, "Producer stream opened");

        while let Some(frame) = frames.message().await? {
            if let Err(status) = self.accept(frame, IngressKind::Stream) {
                tracing::warn!(remote = ?remote, accepted, "Producer stream ended by invalid frame");
                return Err(status);
            }
            accepted += 1;
        }

        tracing::info!(remote = ?remote, accepted, "Producer stream closed");

        Ok(Response::new(StreamFramesResponse {
            message: ACK_MESSAGE.to_string(),
            frames_accepted: accepted,
        }))
    }

    async fn get_relay_status(
        &self,
        _request: Request<GetRelayStatusRequest>,
    ) -> RpcResult<GetRelayStatusResponse> {
        let stats = self.ingress.stats().snapshot();
        let subscriber_count = u32::try_from(self.ingress.registry().len()).unwrap_or(u32::MAX);

        let status = RelayStatus {
            version: self.config.version.clone(),
            started_at: Some(datetime_to_timestamp(stats.started_at)),
            current_time: Some(datetime_to_timestamp(Utc::now())),
            subscriber_count,
            frames_received: stats.frames_received,
            frames_rejected: stats.frames_rejected,
            deliveries: stats.deliveries,
            dropped_deliveries: stats.dropped_deliveries,
            failed_deliveries: stats.failed_deliveries,
            last_frame_at: stats.last_frame_at.map(datetime_to_timestamp),
        };

        Ok(Response::new(GetRelayStatusResponse {
            status: Some(status),
        }))
    }
}

// =============================================================================
// Conversion Helpers
// =============================================================================

/// Map a validation failure to `INVALID_ARGUMENT` with bad-request details.
#[must_use]
pub fn frame_error_to_status(error: &FrameError) -> Status {
    let message = error.to_string();
    let mut details = ErrorDetails::new();
    details.set_error_info(error.reason(), ERROR_DOMAIN, HashMap::<String, String>::new());
    details.add_bad_request_violation(error.field(), &message);
    Status::with_error_details(Code::InvalidArgument, message, details)
}

/// Largest request the decoder accepts for the given frame limits.
#[must_use]
pub const fn max_decoding_message_size(limits: &FrameLimits) -> usize {
    limits.max_frame_bytes.saturating_add(MESSAGE_HEADROOM)
}

fn datetime_to_timestamp(dt: DateTime<Utc>) -> Timestamp {
    Timestamp {
        seconds: dt.timestamp(),
        nanos: i32::try_from(dt.timestamp_subsec_nanos()).unwrap_or(i32::MAX),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::domain::registry::{SubscriberHandle, SubscriberRegistry};
    use crate::infrastructure::broadcast::subscriber_channel;

    fn server() -> FrameRelayServer {
        let registry = Arc::new(SubscriberRegistry::new());
        let ingress = Arc::new(FrameIngress::new(registry, FrameLimits::default()));
        FrameRelayServer::new(FrameRelayServerConfig::default(), ingress)
    }

    fn jpeg_request() -> SendFrameRequest {
        SendFrameRequest {
            image_data: Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xE0]),
            media_type: String::new(),
        }
    }

    #[tokio::test]
    async fn send_frame_acknowledges_and_broadcasts() {
        let server = server();
        let (sink, mut rx) = subscriber_channel(4);
        server
            .ingress()
            .registry()
            .register(SubscriberHandle::new(Arc::new(sink)));

        let response = server
            .send_frame(Request::new(jpeg_request()))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.message, ACK_MESSAGE);
        let frame = rx.try_recv().unwrap();
        assert_eq!(frame.sequence(), response.sequence);
        assert!(frame.as_str().starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn empty_frame_is_invalid_argument_with_details() {
        let server = server();
        let status = server
            .send_frame(Request::new(SendFrameRequest::default()))
            .await
            .unwrap_err();

        assert_eq!(status.code(), Code::InvalidArgument);

        let details = status.get_error_details();
        let bad_request = details.bad_request().unwrap();
        assert_eq!(bad_request.field_violations[0].field, "image_data");
        assert_eq!(details.error_info().unwrap().reason, "empty");
    }

    #[tokio::test]
    async fn non_image_media_type_is_rejected() {
        let server = server();
        let mut request = jpeg_request();
        request.media_type = "text/html".to_string();

        let status = server.send_frame(Request::new(request)).await.unwrap_err();

        assert_eq!(status.code(), Code::InvalidArgument);
        let details = status.get_error_details();
        assert_eq!(
            details.bad_request().unwrap().field_violations[0].field,
            "media_type"
        );
    }

    #[tokio::test]
    async fn status_reports_counters() {
        let server = server();
        server.send_frame(Request::new(jpeg_request())).await.unwrap();
        let _ = server.send_frame(Request::new(SendFrameRequest::default())).await;

        let status = server
            .get_relay_status(Request::new(GetRelayStatusRequest {}))
            .await
            .unwrap()
            .into_inner()
            .status
            .unwrap();

        assert_eq!(status.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(status.frames_received, 1);
        assert_eq!(status.frames_rejected, 1);
        assert_eq!(status.subscriber_count, 0);
        assert!(status.last_frame_at.is_some());
        assert!(status.current_time.unwrap().seconds >= status.started_at.unwrap().seconds);
    }

    #[test]
    fn decoding_limit_leaves_room_above_frame_limit() {
        let limits = FrameLimits {
            max_frame_bytes: 8 * 1024 * 1024,
        };
        assert_eq!(
            max_decoding_message_size(&limits),
            8 * 1024 * 1024 + MESSAGE_HEADROOM
        );

        let unbounded = FrameLimits {
            max_frame_bytes: usize::MAX,
        };
        assert_eq!(max_decoding_message_size(&unbounded), usize::MAX);
    }

    #[test]
    fn timestamp_conversion() {
        let dt = DateTime::from_timestamp(1_700_000_000, 500).unwrap();
        let ts = datetime_to_timestamp(dt);
        assert_eq!(ts.seconds, 1_700_000_000);
        assert_eq!(ts.nanos, 500);
    }
}
