//! Primary / fallback / degraded execution
//!
//! A request is served by the first operation that succeeds. Operations run
//! strictly one after another, so an operation never starts while an earlier
//! one might still produce side effects.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::DomainError;

/// A deferred, single-shot fallible operation
pub type Operation<'a, T> =
    Box<dyn FnOnce() -> BoxFuture<'a, Result<T, DomainError>> + Send + 'a>;

/// Wrap an async closure as an [`Operation`]
pub fn operation<'a, T, F, Fut>(f: F) -> Operation<'a, T>
where
    F: FnOnce() -> Fut + Send + 'a,
    Fut: Future<Output = Result<T, DomainError>> + Send + 'a,
{
    Box::new(move || f().boxed())
}

/// Position of an operation in the fallback sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackStage {
    Primary,
    Fallback,
    Degraded,
}

impl FallbackStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
            Self::Degraded => "degraded",
        }
    }
}

impl std::fmt::Display for FallbackStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trace of one attempted operation
#[derive(Debug, Clone, Serialize)]
pub struct AttemptRecord {
    pub stage: FallbackStage,
    pub latency_ms: u64,
    /// Set when the attempt failed
    pub error: Option<String>,
}

/// Successful result of [`FallbackExecutor::execute_with_fallback`]
#[derive(Debug)]
pub struct FallbackOutcome<T> {
    pub value: T,
    /// Stage whose operation produced `value`
    pub stage: FallbackStage,
    /// Every attempt made, in order
    pub attempts: Vec<AttemptRecord>,
}

impl<T> FallbackOutcome<T> {
    pub fn used_primary(&self) -> bool {
        self.stage == FallbackStage::Primary
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Runs a primary operation with ordered fallbacks.
///
/// Failures include returned errors, panics and, when configured, attempts
/// exceeding the per-attempt timeout.
#[derive(Debug, Clone, Default)]
pub struct FallbackExecutor {
    attempt_timeout: Option<Duration>,
}

impl FallbackExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every attempt by `timeout`
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout
    }

    /// Run `primary`, then `fallback`, then `degraded` until one succeeds.
    ///
    /// When the last available operation fails the error is
    /// [`DomainError::FallbackExhausted`] tagged with `label` and the failing stage.
    pub async fn execute_with_fallback<'a, T>(
        &self,
        primary: Operation<'a, T>,
        fallback: Operation<'a, T>,
        degraded: Option<Operation<'a, T>>,
        label: &str,
    ) -> Result<FallbackOutcome<T>, DomainError>
    where
        T: Send + 'a,
    {
        let mut pending = vec![
            (FallbackStage::Primary, primary),
            (FallbackStage::Fallback, fallback),
        ];
        if let Some(degraded) = degraded {
            pending.push((FallbackStage::Degraded, degraded));
        }

        let mut attempts = Vec::with_capacity(pending.len());
        let mut last_failure: Option<(FallbackStage, DomainError)> = None;

        for (stage, op) in pending {
            let start = Instant::now();
            let result = self.run_attempt(stage, op).await;
            let latency_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(value) => {
                    attempts.push(AttemptRecord {
                        stage,
                        latency_ms,
                        error: None,
                    });

                    debug!(label = %label, stage = %stage, latency_ms, "Operation succeeded");

                    return Ok(FallbackOutcome {
                        value,
                        stage,
                        attempts,
                    });
                }
                Err(error) => {
                    warn!(
                        label = %label,
                        stage = %stage,
                        latency_ms,
                        error = %error,
                        "Operation failed"
                    );

                    attempts.push(AttemptRecord {
                        stage,
                        latency_ms,
                        error: Some(error.to_string()),
                    });
                    last_failure = Some((stage, error));
                }
            }
        }

        match last_failure {
            Some((stage, error)) => Err(DomainError::fallback_exhausted(
                label,
                stage.as_str(),
                error.to_string(),
            )),
            None => Err(DomainError::internal(format!(
                "{} finished without attempting any operation",
                label
            ))),
        }
    }

    async fn run_attempt<'a, T>(
        &self,
        stage: FallbackStage,
        op: Operation<'a, T>,
    ) -> Result<T, DomainError>
    where
        T: Send + 'a,
    {
        let future = match std::panic::catch_unwind(AssertUnwindSafe(op)) {
            Ok(future) => future,
            Err(panic) => return Err(panicked(stage, panic)),
        };

        let guarded = AssertUnwindSafe(future).catch_unwind();

        let result = match self.attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, guarded).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(DomainError::timeout(
                        format!("{} operation", stage),
                        limit.as_millis() as u64,
                    ))
                }
            },
            None => guarded.await,
        };

        result.unwrap_or_else(|panic| Err(panicked(stage, panic)))
    }
}

fn panicked(stage: FallbackStage, panic: Box<dyn Any + Send>) -> DomainError {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());

    DomainError::internal(format!("{} operation panicked: {}", stage, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn counted<T: Send + 'static>(
        calls: &Arc<AtomicUsize>,
        result: impl FnOnce() -> Result<T, DomainError> + Send + 'static,
    ) -> Operation<'static, T> {
        let calls = calls.clone();
        operation(move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            result()
        })
    }

    fn boom() -> DomainError {
        DomainError::provider("test", "boom")
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let primary_calls = Arc::new(AtomicUsize::new(0));
        let fallback_calls = Arc::new(AtomicUsize::new(0));

        let outcome = FallbackExecutor::new()
            .execute_with_fallback(
                counted(&primary_calls, || Ok(1)),
                counted(&fallback_calls, || Ok(2)),
                None,
                "test",
            )
            .await
            .unwrap();

        assert_eq!(outcome.value, 1);
        assert!(outcome.used_primary());
        assert_eq!(outcome.attempts.len(), 1);
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_primary_failure_runs_fallback_exactly_once() {
        let primary_calls = Arc::new(AtomicUsize::new(0));
        let fallback_calls = Arc::new(AtomicUsize::new(0));
        let degraded_calls = Arc::new(AtomicUsize::new(0));

        let outcome = FallbackExecutor::new()
            .execute_with_fallback(
                counted(&primary_calls, || Err(boom())),
                counted(&fallback_calls, || Ok(2)),
                Some(counted(&degraded_calls, || Ok(3))),
                "test",
            )
            .await
            .unwrap();

        assert_eq!(outcome.value, 2);
        assert_eq!(outcome.stage, FallbackStage::Fallback);
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
        assert_eq!(degraded_calls.load(Ordering::SeqCst), 0);
        assert!(outcome.attempts[0].error.as_deref().unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn test_both_fail_without_degraded_is_labeled_error() {
        let result = FallbackExecutor::new()
            .execute_with_fallback(
                operation(|| async { Err::<u32, _>(boom()) }),
                operation(|| async { Err::<u32, _>(DomainError::internal("fallback broke")) }),
                None,
                "Resume ATS analysis",
            )
            .await;

        match result {
            Err(DomainError::FallbackExhausted {
                label,
                stage,
                message,
            }) => {
                assert_eq!(label, "Resume ATS analysis");
                assert_eq!(stage, "fallback");
                assert!(message.contains("fallback broke"));
            }
            other => panic!("unexpected result: {:?}", other.map(|o| o.value)),
        }
    }

    #[tokio::test]
    async fn test_degraded_runs_last() {
        let outcome = FallbackExecutor::new()
            .execute_with_fallback(
                operation(|| async { Err::<&str, _>(boom()) }),
                operation(|| async { Err::<&str, _>(boom()) }),
                Some(operation(|| async { Ok("degraded") })),
                "test",
            )
            .await
            .unwrap();

        assert_eq!(outcome.value, "degraded");
        assert_eq!(outcome.stage, FallbackStage::Degraded);
        assert_eq!(outcome.attempts.len(), 3);
    }

    #[tokio::test]
    async fn test_degraded_failure_propagates() {
        let result = FallbackExecutor::new()
            .execute_with_fallback(
                operation(|| async { Err::<u32, _>(boom()) }),
                operation(|| async { Err::<u32, _>(boom()) }),
                Some(operation(|| async { Err::<u32, _>(DomainError::internal("last")) })),
                "test",
            )
            .await;

        assert!(matches!(
            result,
            Err(DomainError::FallbackExhausted { ref stage, .. }) if stage == "degraded"
        ));
    }

    async fn explode() -> Result<u32, DomainError> {
        panic!("primary exploded")
    }

    #[tokio::test]
    async fn test_panicking_primary_falls_back() {
        let outcome = FallbackExecutor::new()
            .execute_with_fallback(
                operation(explode),
                operation(|| async { Ok::<u32, DomainError>(7) }),
                None,
                "test",
            )
            .await
            .unwrap();

        assert_eq!(outcome.value, 7);
        assert!(outcome.attempts[0]
            .error
            .as_deref()
            .unwrap()
            .contains("primary exploded"));
    }

    #[tokio::test]
    async fn test_attempt_timeout_triggers_fallback() {
        let executor = FallbackExecutor::new().with_attempt_timeout(Duration::from_millis(20));

        let outcome = executor
            .execute_with_fallback(
                operation(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok::<u32, DomainError>(1)
                }),
                operation(|| async { Ok::<u32, DomainError>(2) }),
                None,
                "test",
            )
            .await
            .unwrap();

        assert_eq!(outcome.value, 2);
        assert!(outcome.attempts[0].error.as_deref().unwrap().contains("Timeout"));
    }

    #[tokio::test]
    async fn test_operations_never_overlap() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let primary_log = log.clone();
        let fallback_log = log.clone();

        FallbackExecutor::new()
            .execute_with_fallback(
                operation(move || async move {
                    primary_log.lock().unwrap().push("primary:start");
                    tokio::task::yield_now().await;
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    primary_log.lock().unwrap().push("primary:end");
                    Err::<(), _>(boom())
                }),
                operation(move || async move {
                    fallback_log.lock().unwrap().push("fallback:start");
                    Ok(())
                }),
                None,
                "test",
            )
            .await
            .unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["primary:start", "primary:end", "fallback:start"]
        );
    }

    #[tokio::test]
    async fn test_operations_may_borrow() {
        let owned = String::from("borrowed");
        let text = owned.as_str();
        let executor = FallbackExecutor::new();

        let outcome = executor
            .execute_with_fallback(
                operation(move || async move { Ok(text.len()) }),
                operation(|| async { Ok(0) }),
                None,
                "test",
            )
            .await
            .unwrap();

        assert_eq!(outcome.into_value(), 8);
    }
}
