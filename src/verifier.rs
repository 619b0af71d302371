//! Assertion helpers composed around a [`Rendezvous`].
//!
//! [`Verifier`] is the surface test code actually touches: worker threads run
//! checks that never panic locally, and the controller collects the verdict
//! from a single wait. A failed check is turned into a [`Failure`] describing
//! the mismatch and handed to [`Rendezvous::report_failure`].

use std::fmt;
use std::time::Duration;

use crate::failure::Failure;
use crate::rendezvous::{Rendezvous, WaitError};

/// Deadline used by the defaulted wait methods.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A rendezvous bundled with non-panicking assertion helpers.
///
/// Share it across threads with `Arc`; every method takes `&self`.
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
/// use syncpoint::Verifier;
///
/// # fn main() -> Result<(), syncpoint::WaitError> {
/// let verifier = Arc::new(Verifier::new());
///
/// let worker = Arc::clone(&verifier);
/// thread::spawn(move || {
///     worker.expect_eq(2 + 2, 4);
///     worker.signal();
/// });
///
/// verifier.wait()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct Verifier {
    rendezvous: Rendezvous,
}

impl Verifier {
    /// Creates a verifier with an idle rendezvous.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying rendezvous, for callers that need the full surface.
    #[must_use]
    pub fn rendezvous(&self) -> &Rendezvous {
        &self.rendezvous
    }

    /// Reports one completed unit of work. See [`Rendezvous::signal`].
    pub fn signal(&self) {
        self.rendezvous.signal();
    }

    /// Hands a failure to the controller. See [`Rendezvous::report_failure`].
    pub fn report_failure<F: Into<Failure>>(&self, failure: F) {
        self.rendezvous.report_failure(failure);
    }

    /// Waits for one signal with the default timeout.
    pub fn wait(&self) -> Result<(), WaitError> {
        self.rendezvous.wait_timeout(DEFAULT_TIMEOUT, 1)
    }

    /// Waits for `expected` signals with the default timeout.
    pub fn wait_for(&self, expected: usize) -> Result<(), WaitError> {
        self.rendezvous.wait_timeout(DEFAULT_TIMEOUT, expected)
    }

    /// Waits for one signal with an explicit timeout.
    pub fn wait_within(&self, timeout: Duration) -> Result<(), WaitError> {
        self.rendezvous.wait_timeout(timeout, 1)
    }

    /// Records an unconditional failure.
    pub fn fail(&self, message: impl Into<String>) {
        self.rendezvous.report_failure(Failure::new(message));
    }

    /// Checks that `condition` holds. Returns whether the check passed so a
    /// reporting thread can bail out of dependent assertions.
    pub fn expect_true(&self, condition: bool) -> bool {
        if !condition {
            self.fail("expected condition to hold");
        }
        condition
    }

    /// Checks that `condition` does not hold.
    pub fn expect_false(&self, condition: bool) -> bool {
        if condition {
            self.fail("expected condition not to hold");
        }
        !condition
    }

    /// Checks that `left == right`.
    pub fn expect_eq<A, B>(&self, left: A, right: B) -> bool
    where
        A: PartialEq<B> + fmt::Debug,
        B: fmt::Debug,
    {
        let passed = left == right;
        if !passed {
            self.fail(format!("expected `{left:?}` to equal `{right:?}`"));
        }
        passed
    }

    /// Checks that `left != right`.
    pub fn expect_ne<A, B>(&self, left: A, right: B) -> bool
    where
        A: PartialEq<B> + fmt::Debug,
        B: fmt::Debug,
    {
        let passed = left != right;
        if !passed {
            self.fail(format!("expected `{left:?}` to differ from `{right:?}`"));
        }
        passed
    }

    /// Checks that `value` is `Some`.
    pub fn expect_some<T: fmt::Debug>(&self, value: &Option<T>) -> bool {
        let passed = value.is_some();
        if !passed {
            self.fail("expected `Some`, got `None`");
        }
        passed
    }

    /// Checks that `value` is `None`.
    pub fn expect_none<T: fmt::Debug>(&self, value: &Option<T>) -> bool {
        let passed = value.is_none();
        if !passed {
            self.fail(format!("expected `None`, got `{value:?}`"));
        }
        passed
    }
}
