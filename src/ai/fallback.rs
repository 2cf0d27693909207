#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tracing::{error, info, warn};

use super::{
    error::{CompletionError, ErrorKind, FallbackError},
    provider::{ProviderClient, ProviderKind},
};

/// Total attempts made against one provider for transient failures before it
/// is retired. Quota and auth failures retire a provider on the first attempt.
const DEFAULT_TRANSIENT_ATTEMPTS: u32 = 3;

/// Delay before the first transient retry; doubled for each further retry.
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Mutable orchestrator state: the cursor and what is known about each
/// provider. Lives behind a mutex so concurrent graders sharing a session
/// observe one consistent view; the lock is never held across an await.
struct SessionState {
    /// Index of the current provider. Runs past the end of the client list
    /// once every provider is exhausted.
    cursor:    usize,
    /// Per-provider exhausted flag, indexed like the client list.
    exhausted: Vec<bool>,
    /// Recorded cause for each exhausted provider, indexed like the client
    /// list.
    causes:    Vec<Option<CompletionError>>,
}

/// Orchestrates completions across an ordered list of providers, switching to
/// the next provider when the current one reports exhausted quota or a bad
/// credential.
///
/// Switching is sticky: once the session moves off a provider it never
/// returns to it, so one session shared across a whole grading run probes an
/// exhausted provider exactly once. Clients are immutable and shared, so the
/// session itself is cheap to share behind an `Arc`.
pub struct FallbackSession {
    /// Usable providers in fallback order, as produced by the factory.
    clients:            Vec<Arc<dyn ProviderClient>>,
    /// Interior-mutable cursor and exhaustion bookkeeping.
    state:              Mutex<SessionState>,
    /// Total attempts per provider for transient failures.
    transient_attempts: u32,
    /// Base delay before transient retries.
    retry_delay:        Duration,
}

impl FallbackSession {
    /// Creates a session over the given ordered clients with default retry
    /// bounds.
    pub fn new(clients: Vec<Arc<dyn ProviderClient>>) -> Self {
        let len = clients.len();
        Self {
            clients,
            state: Mutex::new(SessionState {
                cursor:    0,
                exhausted: vec![false; len],
                causes:    vec![None; len],
            }),
            transient_attempts: DEFAULT_TRANSIENT_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Overrides the transient retry bounds. Used to keep tests fast; the
    /// attempt count is clamped to at least one.
    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.transient_attempts = attempts.max(1);
        self.retry_delay = delay;
        self
    }

    /// Returns the providers this session was built over, in fallback order.
    pub fn providers(&self) -> Vec<ProviderKind> {
        self.clients.iter().map(|c| c.kind()).collect()
    }

    /// Returns the provider the next call will go to, or `None` once every
    /// provider is exhausted.
    pub fn active_provider(&self) -> Option<ProviderKind> {
        let state = self.state.lock().expect("session state poisoned");
        self.clients.get(state.cursor).map(|c| c.kind())
    }

    /// Requests a completion for the prompt, transparently retrying and
    /// switching providers per their classified failures. Returns the
    /// completion text, or `AllProvidersFailed` with the ordered per-provider
    /// causes once nothing is left to try.
    pub async fn complete(&self, prompt: &str) -> Result<String, FallbackError> {
        loop {
            let Some((index, client)) = self.current_client() else {
                return Err(self.all_failed());
            };

            let mut attempt: u32 = 0;
            loop {
                attempt += 1;
                match client.complete(prompt).await {
                    Ok(text) => return Ok(text),
                    Err(cause) => match cause.kind {
                        ErrorKind::QuotaExceeded => {
                            warn!(
                                provider = %cause.provider,
                                "Quota exhausted, switching to next provider: {}", cause.message
                            );
                            self.retire(index, cause);
                            break;
                        }
                        ErrorKind::AuthFailure => {
                            // Loud on purpose: this is almost always a bad
                            // credential, not normal exhaustion.
                            error!(
                                provider = %cause.provider,
                                "Authentication failed, check the configured API key: {}",
                                cause.message
                            );
                            self.retire(index, cause);
                            break;
                        }
                        ErrorKind::TransientNetwork | ErrorKind::Unclassified => {
                            if cause.kind == ErrorKind::Unclassified {
                                warn!(
                                    provider = %cause.provider,
                                    "Unclassified provider failure (possible classifier gap): {}",
                                    cause.message
                                );
                            }
                            if attempt >= self.transient_attempts {
                                warn!(
                                    provider = %cause.provider,
                                    attempts = attempt,
                                    "Provider still failing after retries, switching: {}",
                                    cause.message
                                );
                                self.retire(index, cause);
                                break;
                            }
                            let delay = self.retry_delay * 2u32.pow(attempt - 1);
                            info!(
                                provider = %cause.provider,
                                attempt,
                                "Transient failure, retrying in {delay:?}: {}", cause.message
                            );
                            tokio::time::sleep(delay).await;
                        }
                    },
                }
            }
        }
    }

    /// Returns the current provider and its index, skipping any providers
    /// already exhausted, or `None` once the cursor has run off the end.
    fn current_client(&self) -> Option<(usize, Arc<dyn ProviderClient>)> {
        let mut state = self.state.lock().expect("session state poisoned");
        while state.cursor < self.clients.len() && state.exhausted[state.cursor] {
            state.cursor += 1;
        }
        let index = state.cursor;
        self.clients.get(index).map(|c| (index, Arc::clone(c)))
    }

    /// Marks the provider at `index` exhausted, records its cause, and
    /// advances the cursor in one atomic step.
    ///
    /// If another caller already retired this provider the call is a no-op,
    /// so two workers observing the same quota failure produce exactly one
    /// cursor advance and then agree on the resulting active provider.
    fn retire(&self, index: usize, cause: CompletionError) {
        let mut state = self.state.lock().expect("session state poisoned");
        if state.exhausted[index] {
            return;
        }
        state.exhausted[index] = true;
        state.causes[index] = Some(cause);
        while state.cursor < self.clients.len() && state.exhausted[state.cursor] {
            state.cursor += 1;
        }
        if let Some(next) = self.clients.get(state.cursor) {
            info!(provider = %next.kind(), "Switched to next AI provider");
        }
    }

    /// Builds the terminal error carrying every recorded cause in fallback
    /// order.
    fn all_failed(&self) -> FallbackError {
        let state = self.state.lock().expect("session state poisoned");
        let causes = state.causes.iter().flatten().cloned().collect();
        FallbackError::AllProvidersFailed { causes }
    }
}
