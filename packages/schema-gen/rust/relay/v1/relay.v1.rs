// @generated
// This file is @generated by prost-build.
#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct SendFrameRequest {
    /// Encoded image bytes (JPEG, PNG, ...). Must not be empty.
    #[prost(bytes = "bytes", tag = "1")]
    pub image_data: ::prost::bytes::Bytes,
    /// Optional media type, e.g. "image/png". Sniffed from the payload when empty.
    #[prost(string, tag = "2")]
    pub media_type: ::prost::alloc::string::String,
}
#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct SendFrameResponse {
    #[prost(string, tag = "1")]
    pub message: ::prost::alloc::string::String,
    /// Relay-assigned sequence number of the accepted frame.
    #[prost(uint64, tag = "2")]
    pub sequence: u64,
}
#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct StreamFramesResponse {
    #[prost(string, tag = "1")]
    pub message: ::prost::alloc::string::String,
    #[prost(uint64, tag = "2")]
    pub frames_accepted: u64,
}
#[derive(Clone, Copy, PartialEq, Eq, Hash, ::prost::Message)]
pub struct GetRelayStatusRequest {}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RelayStatus {
    #[prost(string, tag = "1")]
    pub version: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub started_at: ::core::option::Option<::prost_types::Timestamp>,
    #[prost(message, optional, tag = "3")]
    pub current_time: ::core::option::Option<::prost_types::Timestamp>,
    #[prost(uint32, tag = "4")]
    pub subscriber_count: u32,
    #[prost(uint64, tag = "5")]
    pub frames_received: u64,
    #[prost(uint64, tag = "6")]
    pub frames_rejected: u64,
    #[prost(uint64, tag = "7")]
    pub deliveries: u64,
    #[prost(uint64, tag = "8")]
    pub dropped_deliveries: u64,
    #[prost(uint64, tag = "9")]
    pub failed_deliveries: u64,
    #[prost(message, optional, tag = "10")]
    pub last_frame_at: ::core::option::Option<::prost_types::Timestamp>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetRelayStatusResponse {
    #[prost(message, optional, tag = "1")]
    pub status: ::core::option::Option<RelayStatus>,
}
include!("relay.v1.tonic.rs");
// @@protoc_insertion_point(module)
