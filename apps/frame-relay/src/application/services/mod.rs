//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `FrameIngress`: validates, encodes and broadcasts producer frames
//! - `TranslationPipeline`: speech translation over the speech ports

mod ingress;
mod pipeline;

pub use ingress::{FrameIngress, IngressReceipt, RelayStats, RelayStatsSnapshot};
pub use pipeline::{PipelineError, TranslationPipeline};
