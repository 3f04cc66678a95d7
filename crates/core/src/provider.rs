//! Collaborator traits — the abstraction over everything that talks to the
//! outside world on the agent's behalf.
//!
//! A [`Communicator`] knows how to send a prompt to a language model and get
//! its reply back together with the updated conversation context. The other
//! traits cover the rate limiter that runs before each task, and the wiki and
//! image clients that tools delegate to.
//!
//! Implementations: `anvil-providers` (OpenAI-compatible endpoint, Wikipedia,
//! minimum-interval waiter) and the scripted mocks used in tests.

use std::path::Path;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::message::Conversation;

/// The model communicator.
///
/// `context` is an opaque accumulator: callers pass back exactly what the
/// previous call returned and never inspect it.
#[async_trait]
pub trait Communicator: Send + Sync {
    /// A human-readable name for this communicator (e.g., "openai").
    fn name(&self) -> &str;

    /// Send `prompt` within `context` and return the reply and new context.
    async fn chat(
        &self,
        prompt: &str,
        context: Conversation,
    ) -> std::result::Result<(String, Conversation), ProviderError>;
}

/// Blocks until a request to `model` may be made.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn wait_if_needed(&self, model: &str);
}

/// A limiter that never waits.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoWait;

#[async_trait]
impl RateLimiter for NoWait {
    async fn wait_if_needed(&self, _model: &str) {}
}

/// Answers free-text lookups against an encyclopedia.
#[async_trait]
pub trait WikiClient: Send + Sync {
    async fn search(&self, query: &str) -> std::result::Result<String, ProviderError>;
}

/// Answers a question about an image on disk.
#[async_trait]
pub trait VisionClient: Send + Sync {
    async fn analyze(
        &self,
        message: &str,
        image_path: &Path,
    ) -> std::result::Result<String, ProviderError>;
}
