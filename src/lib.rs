//! Cross-thread rendezvous and failure relay for multithreaded tests.
//!
//! The crate coordinates exactly one *controller* thread with any number of
//! *reporting* threads per episode. Reporting threads call
//! [`Rendezvous::signal`] when their part of the work checks out, or
//! [`Rendezvous::report_failure`] when it does not; the controller blocks in
//! [`Rendezvous::wait_timeout`] until the expected number of signals has
//! landed, a failure arrives and is re-raised with its payload intact, the
//! deadline elapses, or the wait is cancelled from another thread. The four
//! outcomes are distinct [`WaitError`] kinds (success aside), so callers can
//! tell "the test logic failed" apart from "something never happened".
//!
//! [`Verifier`] wraps a [`Rendezvous`] with assertion helpers for test code:
//! a failed check on a worker thread never panics the worker, it is recorded
//! and surfaces from the controller's wait instead.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//! use syncpoint::Verifier;
//!
//! # fn main() -> Result<(), syncpoint::WaitError> {
//! let verifier = Arc::new(Verifier::new());
//!
//! for port in [8080u16, 8081] {
//!     let worker = Arc::clone(&verifier);
//!     thread::spawn(move || {
//!         worker.expect_ne(port, 0);
//!         worker.signal();
//!     });
//! }
//!
//! verifier.wait_for(2)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Limitations
//!
//! A reporting thread that dies without calling
//! [`Rendezvous::report_failure`] is invisible to the controller; the episode
//! then resolves by timeout.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod failure;
pub mod rendezvous;
pub mod verifier;

pub use failure::Failure;
pub use rendezvous::{Rendezvous, WaitError};
pub use verifier::{Verifier, DEFAULT_TIMEOUT};
