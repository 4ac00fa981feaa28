//! Domain Layer - Core relay types and business logic.
//!
//! This layer contains the frame model, the subscriber registry and the
//! speech value types. Nothing here performs I/O.

/// Frames, media types and the shared data-URI encoding.
pub mod frame;

/// Subscriber registry and non-blocking fan-out.
pub mod registry;

/// Voice table and value types of the speech translation pipeline.
pub mod speech;
