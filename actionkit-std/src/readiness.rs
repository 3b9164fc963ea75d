//! Waiting on external side effects.
//!
//! Destinations often need to wait for something they do not control, such as
//! an SDK global appearing after a script load. Two waiters are offered:
//!
//! - [`resolve_when`] polls a predicate on a fixed interval.
//! - [`ready_signal`] gives a notifier/waiter pair for sources that can
//!   announce readiness themselves, avoiding polling latency.
//!
//! Both enforce a deadline. Once a wait settles nothing keeps running in the
//! background.

use actionkit_core::ReadinessError;
use std::time::Duration;
use tokio::{sync::watch, time};

/// Default deadline for readiness waits.
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(10);

/// Smallest polling interval; a zero interval would spin.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Poll `predicate` every `interval` until it returns `true`.
///
/// A predicate that is already true resolves without touching the timer.
/// Fails with [`ReadinessError::Timeout`] once `timeout` has elapsed; the
/// polling loop is dropped with the timeout, so no poll runs after that.
///
/// ```rust
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use actionkit_std::readiness::resolve_when;
/// use std::time::Duration;
///
/// let ready = resolve_when(|| true, Duration::from_millis(50), Duration::from_secs(1)).await;
/// assert!(ready.is_ok());
/// # }
/// ```
pub async fn resolve_when<F>(
    mut predicate: F,
    interval: Duration,
    timeout: Duration,
) -> Result<(), ReadinessError>
where
    F: FnMut() -> bool + Send,
{
    if predicate() {
        return Ok(());
    }

    let interval = interval.max(MIN_POLL_INTERVAL);
    let poll = async {
        loop {
            time::sleep(interval).await;
            if predicate() {
                return;
            }
        }
    };

    time::timeout(timeout, poll)
        .await
        .map_err(|_| ReadinessError::Timeout(timeout))
}

/// Create a connected notifier/waiter pair.
pub fn ready_signal() -> (ReadySignal, ReadyWaiter) {
    let (tx, rx) = watch::channel(false);
    (ReadySignal { tx }, ReadyWaiter { rx })
}

/// The notifying half of a readiness signal.
///
/// Dropping it before calling [`notify`](Self::notify) fails every pending
/// wait with [`ReadinessError::Closed`].
#[derive(Debug)]
pub struct ReadySignal {
    tx: watch::Sender<bool>,
}

impl ReadySignal {
    /// Mark the condition as met, waking every waiter.
    pub fn notify(&self) {
        self.tx.send_replace(true);
    }

    /// Whether [`notify`](Self::notify) has been called.
    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    /// Create another waiter for this signal.
    pub fn waiter(&self) -> ReadyWaiter {
        ReadyWaiter {
            rx: self.tx.subscribe(),
        }
    }
}

/// The waiting half of a readiness signal. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ReadyWaiter {
    rx: watch::Receiver<bool>,
}

impl ReadyWaiter {
    /// Whether the signal has fired.
    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the signal fires or `timeout` elapses.
    pub async fn wait(&self, timeout: Duration) -> Result<(), ReadinessError> {
        if self.is_ready() {
            return Ok(());
        }
        let mut rx = self.rx.clone();
        match time::timeout(timeout, rx.wait_for(|ready| *ready)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(ReadinessError::Closed),
            Err(_) => Err(ReadinessError::Timeout(timeout)),
        }
    }
}
