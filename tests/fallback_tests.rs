use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use gradeit::ai::{
    CompletionError, ErrorKind, FallbackError, FallbackSession, ProviderClient, ProviderKind,
};

/// Provider double that replays a script of outcomes and counts calls.
#[derive(Debug)]
struct Scripted {
    kind:    ProviderKind,
    script:  Mutex<VecDeque<Result<&'static str, ErrorKind>>>,
    calls:   AtomicUsize,
    barrier: Option<Arc<tokio::sync::Barrier>>,
}

impl Scripted {
    fn new(
        kind: ProviderKind,
        script: Vec<Result<&'static str, ErrorKind>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            kind,
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            barrier: None,
        })
    }

    fn with_barrier(
        kind: ProviderKind,
        script: Vec<Result<&'static str, ErrorKind>>,
        barrier: Arc<tokio::sync::Barrier>,
    ) -> Arc<Self> {
        Arc::new(Self {
            kind,
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            barrier: Some(barrier),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderClient for Scripted {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        let next = self
            .script
            .lock()
            .expect("script poisoned")
            .pop_front()
            .unwrap_or(Err(ErrorKind::QuotaExceeded));
        next.map(str::to_owned)
            .map_err(|kind| CompletionError::new(self.kind, kind, "scripted failure"))
    }
}

fn session_over(providers: &[Arc<Scripted>]) -> FallbackSession {
    let clients: Vec<Arc<dyn ProviderClient>> = providers
        .iter()
        .map(|p| Arc::clone(p) as Arc<dyn ProviderClient>)
        .collect();
    FallbackSession::new(clients).with_retry(3, Duration::from_millis(1))
}

#[tokio::test]
async fn quota_failures_fall_through_to_first_working_provider() {
    let a = Scripted::new(ProviderKind::Gemini, vec![Err(ErrorKind::QuotaExceeded)]);
    let b = Scripted::new(ProviderKind::Anthropic, vec![Err(ErrorKind::QuotaExceeded)]);
    let c = Scripted::new(ProviderKind::OpenAi, vec![Ok("graded"), Ok("graded again")]);
    let session = session_over(&[a.clone(), b.clone(), c.clone()]);

    let text = session.complete("prompt").await.expect("completion");
    assert_eq!(text, "graded");
    assert_eq!(session.active_provider(), Some(ProviderKind::OpenAi));

    // Sticky: the second call goes straight to the working provider, and the
    // exhausted providers are never probed again.
    let text = session.complete("prompt").await.expect("completion");
    assert_eq!(text, "graded again");
    assert_eq!(a.calls(), 1);
    assert_eq!(b.calls(), 1);
    assert_eq!(c.calls(), 2);
}

#[tokio::test]
async fn all_quota_failures_produce_one_cause_per_provider() {
    let a = Scripted::new(ProviderKind::Gemini, vec![Err(ErrorKind::QuotaExceeded)]);
    let b = Scripted::new(ProviderKind::Anthropic, vec![Err(ErrorKind::QuotaExceeded)]);
    let c = Scripted::new(ProviderKind::OpenAi, vec![Err(ErrorKind::QuotaExceeded)]);
    let session = session_over(&[a, b, c]);

    let err = session.complete("prompt").await.expect_err("should fail");
    let FallbackError::AllProvidersFailed { causes } = err;
    assert_eq!(causes.len(), 3);
    assert_eq!(
        causes.iter().map(|c| c.provider).collect::<Vec<_>>(),
        vec![ProviderKind::Gemini, ProviderKind::Anthropic, ProviderKind::OpenAi]
    );
    assert!(causes.iter().all(|c| c.kind == ErrorKind::QuotaExceeded));

    // Once terminal, later calls fail immediately without touching providers.
    let before: usize = session.providers().len();
    let err = session.complete("prompt").await.expect_err("still failed");
    assert_eq!(err.causes().len(), before);
    assert_eq!(session.active_provider(), None);
}

#[tokio::test]
async fn quota_advances_immediately_without_retrying_same_provider() {
    let a = Scripted::new(ProviderKind::Gemini, vec![Err(ErrorKind::QuotaExceeded)]);
    let b = Scripted::new(ProviderKind::Anthropic, vec![Ok("ok")]);
    let session = session_over(&[a.clone(), b.clone()]);

    session.complete("prompt").await.expect("completion");
    assert_eq!(a.calls(), 1, "quota failures must not be retried on the same provider");
    assert_eq!(b.calls(), 1);
}

#[tokio::test]
async fn auth_failure_switches_provider_immediately() {
    let a = Scripted::new(ProviderKind::OpenAi, vec![Err(ErrorKind::AuthFailure)]);
    let b = Scripted::new(ProviderKind::Gemini, vec![Ok("ok")]);
    let session = session_over(&[a.clone(), b.clone()]);

    let text = session.complete("prompt").await.expect("completion");
    assert_eq!(text, "ok");
    assert_eq!(a.calls(), 1);
    assert_eq!(session.active_provider(), Some(ProviderKind::Gemini));
}

#[tokio::test]
async fn transient_failures_retry_same_provider_up_to_bound() {
    let a = Scripted::new(
        ProviderKind::Gemini,
        vec![
            Err(ErrorKind::TransientNetwork),
            Err(ErrorKind::TransientNetwork),
            Err(ErrorKind::TransientNetwork),
        ],
    );
    let b = Scripted::new(ProviderKind::Anthropic, vec![Ok("ok")]);
    let session = session_over(&[a.clone(), b.clone()]);

    let text = session.complete("prompt").await.expect("completion");
    assert_eq!(text, "ok");
    assert_eq!(a.calls(), 3, "three attempts against the flaky provider, then switch");
    assert_eq!(b.calls(), 1);
}

#[tokio::test]
async fn transient_recovery_stays_on_same_provider() {
    let a = Scripted::new(
        ProviderKind::Gemini,
        vec![Err(ErrorKind::TransientNetwork), Ok("recovered")],
    );
    let b = Scripted::new(ProviderKind::Anthropic, vec![Ok("unused")]);
    let session = session_over(&[a.clone(), b.clone()]);

    let text = session.complete("prompt").await.expect("completion");
    assert_eq!(text, "recovered");
    assert_eq!(a.calls(), 2);
    assert_eq!(b.calls(), 0);
    assert_eq!(session.active_provider(), Some(ProviderKind::Gemini));
}

#[tokio::test]
async fn unclassified_failures_are_retried_like_transient() {
    let a = Scripted::new(
        ProviderKind::OpenAi,
        vec![
            Err(ErrorKind::Unclassified),
            Err(ErrorKind::Unclassified),
            Err(ErrorKind::Unclassified),
        ],
    );
    let b = Scripted::new(ProviderKind::Gemini, vec![Ok("ok")]);
    let session = session_over(&[a.clone(), b.clone()]);

    session.complete("prompt").await.expect("completion");
    assert_eq!(a.calls(), 3);
}

#[tokio::test]
async fn concurrent_quota_failures_advance_cursor_exactly_once() {
    let barrier = Arc::new(tokio::sync::Barrier::new(2));
    let a = Scripted::with_barrier(
        ProviderKind::Gemini,
        vec![Err(ErrorKind::QuotaExceeded), Err(ErrorKind::QuotaExceeded)],
        barrier,
    );
    let b = Scripted::new(ProviderKind::Anthropic, vec![Ok("one"), Ok("two")]);
    let session = Arc::new(session_over(&[a.clone(), b.clone()]));

    // Both workers enter the exhausted provider before either can retire it.
    let first = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.complete("prompt").await }
    });
    let second = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.complete("prompt").await }
    });

    let first = first.await.expect("join").expect("completion");
    let second = second.await.expect("join").expect("completion");

    let mut texts = vec![first, second];
    texts.sort();
    assert_eq!(texts, vec!["one", "two"]);

    // A single advance: had both workers advanced the cursor, it would have
    // run past the second provider and one call would have failed terminally.
    assert_eq!(a.calls(), 2);
    assert_eq!(b.calls(), 2);
    assert_eq!(session.active_provider(), Some(ProviderKind::Anthropic));
}
