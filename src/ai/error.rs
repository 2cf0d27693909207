#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::Display;

use super::provider::ProviderKind;

/// Abstract category of a failed provider call, used by the fallback
/// orchestrator to decide between retrying, switching providers, and failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The vendor reported a rate limit or usage cap; no further requests will
    /// succeed until a future reset.
    QuotaExceeded,
    /// The vendor rejected the credential.
    AuthFailure,
    /// The request could not be completed right now (timeout, connection
    /// failure, 5xx).
    TransientNetwork,
    /// A failure no classification rule matched.
    Unclassified,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorKind::QuotaExceeded => "quota exceeded",
            ErrorKind::AuthFailure => "authentication failure",
            ErrorKind::TransientNetwork => "transient network failure",
            ErrorKind::Unclassified => "unclassified failure",
        };
        write!(f, "{label}")
    }
}

/// A classified failure from a single `complete` call against one provider.
#[derive(thiserror::Error, Debug, Clone)]
#[error("{provider}: {kind}: {message}")]
pub struct CompletionError {
    /// The provider that produced the failure.
    pub provider: ProviderKind,
    /// The abstract category the failure was classified into.
    pub kind:     ErrorKind,
    /// The original vendor diagnostic, kept for logging only.
    pub message:  String,
}

impl CompletionError {
    /// Creates a classified completion error for the given provider.
    pub fn new(provider: ProviderKind, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            provider,
            kind,
            message: message.into(),
        }
    }
}

/// Configuration-time errors raised while building the ordered client list.
#[derive(thiserror::Error, Debug)]
pub enum FactoryError {
    /// The fallback order names a provider this build does not know about.
    #[error(
        "Unknown AI provider `{0}` in the fallback order; expected one of `gemini`, `anthropic`, \
         `openai`."
    )]
    UnknownProvider(String),
    /// Every provider in the fallback order was skipped for lack of a
    /// credential.
    #[error("No AI providers are configured; add at least one provider API key.")]
    NoProvidersConfigured,
}

/// Renders the per-provider causes of a terminal fallback failure, one line
/// per provider in fallback order.
fn render_causes(causes: &[CompletionError]) -> String {
    causes
        .iter()
        .map(|cause| format!("  - {cause}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Terminal error returned by the fallback orchestrator once every configured
/// provider has been exhausted.
#[derive(thiserror::Error, Debug)]
pub enum FallbackError {
    /// Every provider in the session failed; carries the ordered causes.
    #[error(
        "All {} configured AI provider(s) failed:\n{}",
        .causes.len(),
        render_causes(.causes)
    )]
    AllProvidersFailed {
        /// One recorded cause per exhausted provider, in fallback order.
        causes: Vec<CompletionError>,
    },
}

impl FallbackError {
    /// Returns the recorded per-provider causes, in fallback order.
    pub fn causes(&self) -> &[CompletionError] {
        match self {
            FallbackError::AllProvidersFailed { causes } => causes,
        }
    }
}
