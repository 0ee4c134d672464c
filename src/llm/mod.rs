//! Fortune generation via an LLM provider.
//!
//! Handlers depend on the [`FortuneTeller`] trait, not on a concrete client,
//! so tests can substitute a stub. [`XaiClient`] is the production
//! implementation speaking the OpenAI-compatible chat-completions API.

mod xai;

use std::future::Future;
use std::pin::Pin;

pub use xai::XaiClient;

use crate::error::AppResult;

/// Boxed future returned by [`FortuneTeller::tell`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// System prompt setting the fortune-teller persona.
pub const SYSTEM_PROMPT: &str =
    "You are Grok, a cheerful fortune-teller who uses lots of emojis.";

/// Something that turns keywords into a fortune.
pub trait FortuneTeller: Send + Sync {
    /// Generate a fortune from already-validated keywords.
    fn tell<'a>(&'a self, keywords: &'a [String]) -> BoxFuture<'a, AppResult<String>>;
}

/// Build the user prompt for a set of keywords.
pub fn fortune_prompt(keywords: &[String]) -> String {
    format!(
        "Give a fun and lively fortune using these keywords: {}. Use emojis!",
        keywords.join(", ")
    )
}
