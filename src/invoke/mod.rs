//! Dual-Path Invoker module.
//!
//! Each synthesis or transcription request goes to the persistent service
//! first.  Failures are classified once ([`CallFailure`]) and qualifying ones
//! fall back to a one-shot script; both paths normalize into the same
//! [`InvocationResult`].
//!
//! # Quick start
//!
//! ```rust,no_run
//! use inference_supervisor::config::SupervisorConfig;
//! use inference_supervisor::invoke::{DualPathInvoker, SynthesisRequest};
//!
//! #[tokio::main]
//! async fn main() {
//!     let invoker = DualPathInvoker::from_config(&SupervisorConfig::default());
//!     let result = invoker.synthesize(SynthesisRequest::new("Hello there")).await;
//!     println!("{}", result.to_json());
//! }
//! ```

pub mod client;
pub mod failure;
pub mod invoker;
pub mod request;
pub mod result;
pub mod script;
pub mod text;
pub mod wire;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{HttpServiceClient, LiveService};
pub use failure::{CallFailure, Route};
pub use invoker::DualPathInvoker;
pub use request::{InvocationRequest, SynthesisRequest, TranscriptionRequest};
pub use result::{
    FailureClass, InvocationFailure, InvocationResult, Payload, Segment, SpeechPayload,
    TranscriptPayload,
};
pub use script::{extract_json, FallbackRunner, ScriptFailure, ScriptRunner};
pub use wire::{SynthesisCall, SynthesisReply, TranscriptionCall, TranscriptionReply};
