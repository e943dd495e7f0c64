//! Search-as-you-type debouncer.
//!
//! Holds at most one scheduled search. Every input cancels the scheduled one
//! (if its quiet period has not elapsed yet) and schedules a new one, so a
//! burst of inputs produces exactly one search carrying the last input.
//! Searches that already started are never cancelled.

use std::future::Future;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

/// Something a debounced search is delivered to.
pub trait SearchTarget: Send + Sync + 'static {
    /// Run a search for `term`. The returned future must not start any work
    /// before it is first polled.
    fn search(&self, term: String) -> impl Future<Output = ()> + Send + 'static;
}

struct PendingSearch {
    /// Dropping or sending cancels the search if it has not fired yet.
    cancel: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Coalesces rapid inputs into a single delayed search.
///
/// Must be used from within a tokio runtime.
pub struct SearchDebouncer<T: SearchTarget> {
    target: T,
    delay: Duration,
    pending: Option<PendingSearch>,
}

impl<T: SearchTarget> SearchDebouncer<T> {
    #[must_use]
    pub const fn new(target: T, delay: Duration) -> Self {
        Self {
            target,
            delay,
            pending: None,
        }
    }

    /// Quiet period before a scheduled search fires.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Record an input, replacing any scheduled search with one for `text`.
    pub fn on_input(&mut self, text: impl Into<String>) {
        let text = text.into();

        if let Some(previous) = self.pending.take() {
            // Ignored if the previous search already fired.
            let _ = previous.cancel.send(());
        }

        let deadline = Instant::now() + self.delay;
        let (cancel, cancelled) = oneshot::channel();
        let search = self.target.search(text.clone());

        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancelled => {
                    debug!(term = %text, "Scheduled search cancelled");
                    return;
                }
                () = sleep_until(deadline) => {}
            }
            debug!(term = %text, "Firing debounced search");
            search.await;
        });

        self.pending = Some(PendingSearch { cancel, handle });
    }

    /// Whether a search is scheduled or running for the latest input.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| !pending.handle.is_finished())
    }

    /// Wait for the latest scheduled search to fire and complete.
    pub async fn flush(&mut self) {
        if let Some(PendingSearch { cancel, handle }) = self.pending.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Debounced search task failed");
            }
            drop(cancel);
        }
    }
}

impl<T: SearchTarget + std::fmt::Debug> std::fmt::Debug for SearchDebouncer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchDebouncer")
            .field("target", &self.target)
            .field("delay", &self.delay)
            .field("pending", &self.pending.is_some())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tokio::time::sleep;

    use super::*;

    const DELAY: Duration = Duration::from_millis(500);

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Call {
        term: String,
        started: Instant,
        finished: Option<Instant>,
    }

    /// Records when each search starts and finishes.
    #[derive(Clone, Default)]
    struct RecordingTarget {
        calls: Arc<Mutex<Vec<Call>>>,
        latency: Duration,
    }

    impl RecordingTarget {
        fn with_latency(latency: Duration) -> Self {
            Self {
                latency,
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl SearchTarget for RecordingTarget {
        fn search(&self, term: String) -> impl Future<Output = ()> + Send + 'static {
            let calls = self.calls.clone();
            let latency = self.latency;
            async move {
                let index = {
                    let mut calls = calls.lock().unwrap();
                    calls.push(Call {
                        term,
                        started: Instant::now(),
                        finished: None,
                    });
                    calls.len() - 1
                };
                if !latency.is_zero() {
                    sleep(latency).await;
                }
                calls.lock().unwrap()[index].finished = Some(Instant::now());
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_fires_once_with_last_input() {
        let target = RecordingTarget::default();
        let mut debouncer = SearchDebouncer::new(target.clone(), DELAY);

        debouncer.on_input("i");
        sleep(Duration::from_millis(100)).await;
        debouncer.on_input("ip");
        sleep(Duration::from_millis(200)).await;
        debouncer.on_input("iph");
        let last_input = Instant::now();

        debouncer.flush().await;

        let calls = target.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].term, "iph");
        assert_eq!(calls[0].started, last_input + DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inputs_further_apart_than_delay_fire_twice() {
        let target = RecordingTarget::default();
        let mut debouncer = SearchDebouncer::new(target.clone(), DELAY);

        let first_input = Instant::now();
        debouncer.on_input("phone");
        sleep(Duration::from_millis(600)).await;

        let second_input = Instant::now();
        debouncer.on_input("shoes");
        debouncer.flush().await;

        let calls = target.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].term, "phone");
        assert_eq!(calls[0].started, first_input + DELAY);
        assert_eq!(calls[1].term, "shoes");
        assert_eq!(calls[1].started, second_input + DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_started_search_is_not_cancelled() {
        let target = RecordingTarget::with_latency(Duration::from_millis(1000));
        let mut debouncer = SearchDebouncer::new(target.clone(), DELAY);

        debouncer.on_input("slow");
        sleep(Duration::from_millis(600)).await;
        assert_eq!(target.calls().len(), 1);

        debouncer.on_input("fast");
        debouncer.flush().await;
        sleep(Duration::from_millis(2000)).await;

        let calls = target.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|call| call.finished.is_some()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_scheduled_search() {
        let target = RecordingTarget::default();
        let mut debouncer = SearchDebouncer::new(target.clone(), DELAY);

        debouncer.on_input("never");
        assert!(debouncer.has_pending());
        drop(debouncer);
        sleep(Duration::from_millis(1000)).await;

        assert!(target.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_without_input_is_noop() {
        let target = RecordingTarget::default();
        let mut debouncer = SearchDebouncer::new(target.clone(), DELAY);
        debouncer.flush().await;
        assert!(!debouncer.has_pending());
        assert!(target.calls().is_empty());
    }
}
