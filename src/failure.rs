//! The failure record relayed from a reporting thread to the controller.
//!
//! A [`Failure`] is constructed on the thread where something went wrong and
//! carried, unchanged, to the controller blocked in a wait. Besides the
//! message it captures the reporting thread's name and a backtrace at the
//! point of construction, so the controller-side error still points at the
//! code that actually failed.

use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt;

/// A failure captured on a reporting thread.
///
/// The original error value, if any, travels inside the record and can be
/// recovered verbatim on the controller side via [`Error::source`] or
/// [`Failure::into_source`].
#[derive(Debug)]
pub struct Failure {
    message: String,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
    thread: Option<String>,
    backtrace: Backtrace,
}

impl Failure {
    /// Creates a failure from a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self::build(message.into(), None)
    }

    /// Creates a failure from a message with the original error attached.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        Self::build(message.into(), Some(Box::new(source)))
    }

    /// Creates a failure from an error, using its `Display` output as the
    /// message and keeping the error itself as the source.
    #[must_use]
    pub fn from_error(source: impl Error + Send + Sync + 'static) -> Self {
        let message = source.to_string();
        Self::build(message, Some(Box::new(source)))
    }

    fn build(message: String, source: Option<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        Self {
            message,
            source,
            thread: std::thread::current().name().map(str::to_owned),
            // Honors RUST_BACKTRACE.
            backtrace: Backtrace::capture(),
        }
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Name of the thread the failure was recorded on, if it had one.
    #[must_use]
    pub fn thread_name(&self) -> Option<&str> {
        self.thread.as_deref()
    }

    /// Backtrace captured where the failure was constructed.
    #[must_use]
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Consumes the record and returns the original error value, if one was
    /// attached.
    #[must_use]
    pub fn into_source(self) -> Option<Box<dyn Error + Send + Sync + 'static>> {
        self.source
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for Failure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn Error + 'static))
    }
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Self::build(message, None)
    }
}

impl From<&str> for Failure {
    fn from(message: &str) -> Self {
        Self::build(message.to_owned(), None)
    }
}
