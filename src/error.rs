//! Error type for the byte transport.

use thiserror::Error;

/// Failure modes of a single byte-receive attempt.
///
/// A [`Timeout`](TransportError::Timeout) is an expected outcome in the
/// engine's polling loop ("nothing arrived this cycle") and never escapes
/// [`MonoLink::poll`](crate::link::MonoLink::poll); a
/// [`Line`](TransportError::Line) fault comes from the host's pin
/// implementation and is propagated to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransportError<E> {
    /// No byte completed within the caller-supplied millisecond budget.
    #[error("byte receive timed out")]
    Timeout,
    /// The underlying line failed.
    #[error("line fault")]
    Line(E),
}
