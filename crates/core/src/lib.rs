//! # Reflexa Core
//!
//! Domain types, traits, and error definitions for the Reflexa
//! generate-critique loop. This crate has **no HTTP or CLI dependencies** —
//! it defines the domain model that the other crates implement against.
//!
//! ## Design Philosophy
//!
//! The completion backend is defined as a trait here. The HTTP implementation
//! lives in `reflexa-providers`. This enables:
//! - Swapping the endpoint via configuration
//! - Easy testing with scripted mock clients
//! - Clean dependency graph (all crates depend inward on core)

pub mod conversation;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use conversation::BoundedConversation;
pub use error::{CompletionError, Error, Result};
pub use event::{DomainEvent, EventBus, Phase, RunId};
pub use message::{Message, Role};
pub use provider::{CompletionClient, CompletionRequest, CompletionResponse, Usage};
