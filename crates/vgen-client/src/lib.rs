//! Clients for the remote services used by the generation pipeline.
//!
//! - [`RenderClient`]: submits video generation jobs and queries their status
//! - [`CompletionClient`]: OpenAI-compatible chat completion used for prompt
//!   enhancement
//!
//! Both clients return the service payloads as-is; classifying application
//! codes into domain errors is the caller's job.

pub mod completion;
pub mod error;
pub mod render;
pub mod types;

pub use completion::{CompletionClient, CompletionConfig};
pub use error::{ClientError, ClientResult};
pub use render::{RenderClient, RenderClientConfig};
pub use types::{
    ApiEnvelope, GenerationType, RecordInfo, RecordResponse, SubmitData, SubmitRequest,
    SUCCESS_CODE,
};
