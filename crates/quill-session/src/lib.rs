//! Session orchestration for Quill.
//!
//! [`SessionStore`] keeps live sessions and sweeps idle ones;
//! [`SessionOrchestrator`] drives the run state machine over them, streaming
//! [`quill_core::SessionEvent`]s to subscribers. Tool execution happens
//! elsewhere (wherever the document lives); [`PendingToolRequests`] bridges
//! the gap, correlating each published tool batch with the observations
//! submitted for it.

pub mod bridge;
pub mod orchestrator;
pub mod provider;
pub mod store;

pub use bridge::PendingToolRequests;
pub use orchestrator::SessionOrchestrator;
pub use provider::{ModelProvider, ProviderTurn, ScriptedProvider};
pub use store::{Session, SessionConfig, SessionStore};
