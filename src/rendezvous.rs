//! Counted rendezvous between one controller thread and many reporting threads.
//!
//! [`Rendezvous`] lets a controller block until a set of concurrently running
//! threads have each reported completion via [`Rendezvous::signal`], while any
//! reporting thread may instead hand over a failure via
//! [`Rendezvous::report_failure`] that is re-raised on the controller. One
//! wait call spans one *episode*; the same instance is reused across many
//! episodes for the lifetime of the owning test.
//!
//! # Episode protocol
//!
//! - Arming resets the episode state under the lock, consumes signals credited
//!   while idle, and registers the controller as the single waiter.
//! - A recorded failure always short-circuits the wait, regardless of how many
//!   signals are still outstanding.
//! - Resolution (success, relayed failure, timeout, or cancellation) clears
//!   all episode state; exactly one outcome is observed per wait call, and a
//!   wake with a failure pending can never return success.
//!
//! # Early deliveries
//!
//! A signal, failure, or cancellation arriving while no controller is waiting
//! is retained for the next episode: signals accrue as credits (arming
//! consumes up to the expected count and discards the rest), the first
//! failure is kept, and a pending cancellation cancels the next wait. A
//! worker may therefore run to completion before the controller reaches its
//! wait without changing the outcome.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//! use std::time::Duration;
//! use syncpoint::Rendezvous;
//!
//! # fn main() -> Result<(), syncpoint::WaitError> {
//! let rendezvous = Arc::new(Rendezvous::new());
//!
//! let remote = Arc::clone(&rendezvous);
//! let worker = thread::spawn(move || remote.signal());
//!
//! rendezvous.wait_timeout(Duration::from_secs(5), 1)?;
//! worker.join().expect("worker panicked");
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::failure::Failure;

/// Error returned when a rendezvous wait resolves without success.
#[derive(Debug)]
pub enum WaitError {
    /// A reporting thread handed over a failure; the payload is re-raised
    /// verbatim.
    Failure(Failure),
    /// The deadline elapsed before the expected number of signals arrived.
    /// Carries the timeout the wait was configured with.
    Timeout(Duration),
    /// The wait was cancelled from another thread via [`Rendezvous::cancel`].
    Cancelled,
    /// A controller is already waiting on this instance.
    AlreadyWaiting,
}

impl WaitError {
    /// Returns the relayed failure, if that is what resolved the wait.
    #[must_use]
    pub fn into_failure(self) -> Option<Failure> {
        match self {
            Self::Failure(failure) => Some(failure),
            _ => None,
        }
    }

    /// True if the wait resolved by timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl fmt::Display for WaitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failure(failure) => write!(f, "relayed failure: {failure}"),
            Self::Timeout(timeout) => {
                write!(f, "rendezvous wait timed out after {timeout:?}")
            }
            Self::Cancelled => write!(f, "rendezvous wait cancelled"),
            Self::AlreadyWaiting => {
                write!(f, "another controller is already waiting on this rendezvous")
            }
        }
    }
}

impl std::error::Error for WaitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Failure(failure) => Some(failure),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct EpisodeState {
    /// Signals still required to unblock the armed episode.
    remaining: usize,
    /// Signals delivered while idle, consumed by the next arm.
    credits: usize,
    /// First failure handed over and not yet consumed.
    failure: Option<Failure>,
    /// Cancellation requested and not yet consumed.
    cancelled: bool,
    /// Whether a controller is currently registered.
    armed: bool,
}

/// Counted rendezvous with failure relay between one controller and many
/// reporting threads.
///
/// All shared state lives behind a single mutex paired with one condition
/// variable; the pair establishes the happens-before edge between a reporting
/// call and the controller observing its effect. No other lock exists, so the
/// reporting operations cannot deadlock against each other.
#[derive(Debug)]
pub struct Rendezvous {
    state: Mutex<EpisodeState>,
    outcome_ready: Condvar,
}

impl Rendezvous {
    /// Creates an idle rendezvous with no credits and no pending failure.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(EpisodeState {
                remaining: 0,
                credits: 0,
                failure: None,
                cancelled: false,
                armed: false,
            }),
            outcome_ready: Condvar::new(),
        }
    }

    /// Reports one completed unit of work.
    ///
    /// Callable from any thread, any number of times. While an episode is
    /// armed this decrements the outstanding count and wakes the controller
    /// when it reaches zero; extra signals for an already-decided episode are
    /// dropped. With no episode armed the signal is credited to the next
    /// episode.
    ///
    /// Never blocks beyond the short critical section and never panics, so a
    /// worker thread's control flow is never disrupted by controller-side
    /// state.
    pub fn signal(&self) {
        let mut state = self.state.lock();
        if state.armed {
            if state.remaining > 0 {
                state.remaining -= 1;
                trace!(remaining = state.remaining, "signal consumed");
                if state.remaining == 0 {
                    self.outcome_ready.notify_one();
                }
            }
        } else {
            state.credits = state.credits.saturating_add(1);
            trace!(credits = state.credits, "signal credited to next episode");
        }
    }

    /// Hands a failure to the controller.
    ///
    /// Callable from any thread, any number of times. Only the first failure
    /// is retained; later ones are dropped. The
    /// controller is woken unconditionally, regardless of how many signals
    /// are still outstanding. With no episode armed the failure is retained
    /// and terminates the next wait at arm time.
    ///
    /// Never blocks beyond the short critical section, never panics, and
    /// never raises to its caller.
    pub fn report_failure<F: Into<Failure>>(&self, failure: F) {
        let failure = failure.into();
        let mut state = self.state.lock();
        if state.failure.is_none() {
            debug!(%failure, "failure recorded");
            state.failure = Some(failure);
        } else {
            trace!(%failure, "failure dropped, first failure already recorded");
        }
        self.outcome_ready.notify_one();
    }

    /// Cancels the controller's wait from another thread.
    ///
    /// A parked controller wakes and its wait returns
    /// [`WaitError::Cancelled`]. With no controller parked the request is
    /// retained and cancels the next wait.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        state.cancelled = true;
        debug!(armed = state.armed, "cancellation requested");
        self.outcome_ready.notify_one();
    }

    /// Blocks until `expected` signals have landed or a failure or
    /// cancellation arrives.
    ///
    /// Equivalent to [`Rendezvous::wait_timeout`] with no deadline; see there
    /// for the full contract.
    pub fn wait(&self, expected: usize) -> Result<(), WaitError> {
        self.wait_inner(None, expected)
    }

    /// Blocks until `expected` signals have landed, a failure or cancellation
    /// arrives, or `timeout` elapses.
    ///
    /// The deadline is relative to the start of this call. Returns `Ok(())`
    /// once the expected count is reached (immediately when `expected` is
    /// zero), re-raises the first recorded failure as
    /// [`WaitError::Failure`], reports an elapsed deadline as
    /// [`WaitError::Timeout`], and an external [`Rendezvous::cancel`] as
    /// [`WaitError::Cancelled`]. A second wait while a controller is armed
    /// fails fast with [`WaitError::AlreadyWaiting`] without blocking and
    /// without perturbing the armed episode.
    ///
    /// A zero timeout still performs the full arm/resolve protocol: credited
    /// signals and pending failures or cancellations decide the outcome
    /// before the deadline is consulted.
    pub fn wait_timeout(&self, timeout: Duration, expected: usize) -> Result<(), WaitError> {
        self.wait_inner(Some(timeout), expected)
    }

    fn wait_inner(&self, timeout: Option<Duration>, expected: usize) -> Result<(), WaitError> {
        // Deadline is anchored at call start, before any locking.
        let expiry = timeout.map(|timeout| (timeout, Instant::now() + timeout));

        let mut state = self.state.lock();
        if state.armed {
            return Err(WaitError::AlreadyWaiting);
        }

        let applied = state.credits.min(expected);
        state.credits = 0;
        state.remaining = expected - applied;
        state.armed = true;
        trace!(expected, applied, "episode armed");

        loop {
            // Outcome priority: failure, then cancellation, then completion.
            // All checks and the matching state reset happen under one
            // continuous hold of the lock, so exactly one outcome is taken.
            if let Some(failure) = state.failure.take() {
                Self::clear_episode(&mut state);
                debug!("episode resolved with relayed failure");
                return Err(WaitError::Failure(failure));
            }
            if state.cancelled {
                Self::clear_episode(&mut state);
                debug!("episode cancelled");
                return Err(WaitError::Cancelled);
            }
            if state.remaining == 0 {
                Self::clear_episode(&mut state);
                trace!("episode resolved ok");
                return Ok(());
            }

            match expiry {
                None => self.outcome_ready.wait(&mut state),
                Some((timeout, deadline)) => {
                    if Instant::now() >= deadline {
                        Self::clear_episode(&mut state);
                        debug!(?timeout, "episode timed out");
                        return Err(WaitError::Timeout(timeout));
                    }
                    let _ = self.outcome_ready.wait_until(&mut state, deadline);
                }
            }
        }
    }

    /// Signals credited to the next episode.
    #[must_use]
    pub fn pending_signals(&self) -> usize {
        self.state.lock().credits
    }

    /// True while a controller is registered on this instance.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.state.lock().armed
    }

    /// True if a failure has been recorded and not yet consumed by a wait.
    #[must_use]
    pub fn has_pending_failure(&self) -> bool {
        self.state.lock().failure.is_some()
    }

    /// Resets everything the episode owned so nothing leaks into the next
    /// one. Credits survive; they belong to the idle period, not to the
    /// episode.
    fn clear_episode(state: &mut EpisodeState) {
        state.armed = false;
        state.remaining = 0;
        state.failure = None;
        state.cancelled = false;
    }
}

impl Default for Rendezvous {
    fn default() -> Self {
        Self::new()
    }
}
