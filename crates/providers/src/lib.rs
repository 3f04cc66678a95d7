//! Collaborator implementations for Anvil.
//!
//! Everything the agent core only knows as a trait from `anvil-core`:
//! - [`OpenAiCompatProvider`]: model communicator and vision client for any
//!   OpenAI-compatible `/chat/completions` endpoint
//! - [`MinIntervalWaiter`]: per-model request spacing
//! - [`WikipediaClient`]: MediaWiki search with plain-text extracts

pub mod openai_compat;
pub mod waiter;
pub mod wikipedia;

pub use openai_compat::OpenAiCompatProvider;
pub use waiter::MinIntervalWaiter;
pub use wikipedia::WikipediaClient;

/// Map a transport error onto the provider error taxonomy.
pub(crate) fn transport_error(e: reqwest::Error) -> anvil_core::ProviderError {
    if e.is_timeout() {
        anvil_core::ProviderError::Timeout(e.to_string())
    } else {
        anvil_core::ProviderError::Network(e.to_string())
    }
}
