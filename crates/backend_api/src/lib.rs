//! Transport-only streaming client for LLM backend providers.
//!
//! This crate owns backend configuration, provider-specific request
//! building, streamed delta decoding, and cancellation. It normalizes two
//! provider wire families (flat-message-list with bearer auth, and
//! dedicated-system-field with api-key auth) into one [`StreamEvent`]
//! contract. It intentionally contains no editor coupling and no command
//! resolution.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod request;
pub mod sse;

pub use client::{BackendClient, CancelSignal, Job};
pub use config::{BackendProfile, BackendRegistry, ProviderFamily};
pub use error::BackendApiError;
pub use events::{EventHandler, FailureReason, StreamEvent};
pub use request::{build_request, AskOptions, ResolvedRequest};
pub use sse::{extract_delta, SseLineDecoder};
