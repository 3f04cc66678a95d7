//! # Anvil Core
//!
//! Domain types, traits, and error definitions for the Anvil agent execution
//! core. This crate has **zero framework dependencies**: it defines the
//! domain model that every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every collaborator is defined as a trait here (model communicator, rate
//! limiter, wiki and vision clients, tools). Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with scripted mock implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod invocation;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{ProviderError, ToolError};
pub use invocation::{Invocation, ParseResult, TurnOutcome};
pub use message::{Conversation, Message, Role};
pub use provider::{Communicator, NoWait, RateLimiter, VisionClient, WikiClient};
pub use tool::{Arity, Tool, ToolRegistry, UserPrompter};
