//! gRPC Frame Ingress
//!
//! Implements the `FrameRelayService` gRPC service through which producers
//! push image frames.
//!
//! # Architecture
//!
//! Each RPC hands its frames to the shared [`FrameIngress`], which:
//!
//! 1. Validates the payload and resolves its media type
//! 2. Encodes it once as a data URI
//! 3. Offers it to every registered subscriber queue without blocking
//!
//! The RPC is acknowledged once step 3 returns; it never waits for a
//! subscriber socket.
//!
//! [`FrameIngress`]: crate::application::services::FrameIngress

pub mod server;

// Allow clippy warnings and missing docs in generated code
#[allow(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
pub mod proto {
    pub mod relay {
        pub mod v1 {
            include!("../../../../../packages/schema-gen/rust/relay/v1/relay.v1.rs");
        }
    }
}

pub use server::{
    ACK_MESSAGE, FrameRelayServer, FrameRelayServerConfig, MESSAGE_HEADROOM, max_decoding_message_size,
};
