//! Error type shared by the line buffer, the output streams and the dispatcher.
//!
//! Lifecycle misuse of a [`Status`](crate::Status) is not represented here: it
//! is a programmer error and panics instead.

use std::io;

/// Errors returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A write was attempted on a [`LineBuffer`](crate::LineBuffer) after it was closed.
    #[error("line buffer is closed")]
    Closed,

    /// Writing to the underlying output device failed.
    #[error("output device")]
    Io(#[source] io::Error),
}

/// Convenience alias for results carrying [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Returns `true` if this is the [`Error::Closed`] condition.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Recovers an [`Error`] that was wrapped into an [`io::Error`] by one of the
    /// `std::io::Write` implementations of this crate.
    #[must_use]
    pub fn from_io_ref(err: &io::Error) -> Option<&Self> {
        err.get_ref().and_then(|inner| inner.downcast_ref::<Self>())
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        // a closed line buffer behind an io::Write stays recognizable
        if Self::from_io_ref(&err).is_some_and(Self::is_closed) {
            return Self::Closed;
        }
        Self::Io(err)
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(inner) => inner,
            Error::Closed => Self::new(io::ErrorKind::BrokenPipe, Error::Closed),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{error::Error as _, io};

    use super::Error;

    /// Closed Round Trip
    /// The closed condition survives a trip through `io::Error`.
    #[test]
    fn test_closed_survives_io_conversion() {
        let err: io::Error = Error::Closed.into();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(Error::from_io_ref(&err).is_some_and(Error::is_closed));
        assert!(Error::from(err).is_closed());
    }

    /// The device error is reported as the source, not repeated in the message.
    #[test]
    fn test_io_error_chain() {
        let err = Error::Io(io::Error::other("boom"));
        assert_eq!(err.to_string(), "output device");
        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("boom"));
    }

    /// Plain IO errors are unwrapped rather than nested.
    #[test]
    fn test_io_passthrough() {
        let err: io::Error = Error::Io(io::Error::other("boom")).into();
        assert_eq!(err.to_string(), "boom");
        assert!(Error::from_io_ref(&err).is_none());
    }
}
