//! Caller-supplied call context: tracing parent plus cancellation.

use std::time::{Duration, Instant};

use opentelemetry::Context;
use tokio_util::sync::CancellationToken;

use crate::error::{ContextError, Error, Result};

/// Context passed to every cancellation-aware driver call.
///
/// Carries the parent tracing context that spans are attached to, and the
/// signals (cancellation token, deadline) the proxy checks before issuing a
/// call to a driver that cannot observe them itself.
#[derive(Debug, Clone)]
pub struct CallContext {
    parent: Context,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for CallContext {
    fn default() -> Self {
        Self::background()
    }
}

impl CallContext {
    /// An empty context: no parent span, never cancelled.
    pub fn background() -> Self {
        Self::with_parent(Context::new())
    }

    /// Use the thread's current tracing context as the parent.
    pub fn current() -> Self {
        Self::with_parent(Context::current())
    }

    /// Parent spans on `parent`, with no cancellation or deadline.
    pub fn with_parent(parent: Context) -> Self {
        Self {
            parent,
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Attach a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Stop accepting work at `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Stop accepting work once `timeout` has passed from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// The tracing context new spans are parented on.
    pub fn parent(&self) -> &Context {
        &self.parent
    }

    /// The token that cancels this context.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The deadline, if one was set.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The reason this context is done, if it is.
    pub fn err(&self) -> Option<ContextError> {
        if self.cancel.is_cancelled() {
            return Some(ContextError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Fail with the context's own error when it has already been signaled.
    pub fn check(&self) -> Result<()> {
        match self.err() {
            Some(err) => Err(Error::Context(err)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_is_live() {
        let cx = CallContext::background();
        assert!(cx.err().is_none());
        assert!(cx.check().is_ok());
    }

    #[test]
    fn test_cancelled_token() {
        let token = CancellationToken::new();
        let cx = CallContext::background().with_cancellation(token.clone());
        assert!(cx.err().is_none());

        token.cancel();
        assert_eq!(cx.err(), Some(ContextError::Canceled));
        assert!(matches!(
            cx.check(),
            Err(Error::Context(ContextError::Canceled))
        ));
    }

    #[test]
    fn test_expired_deadline() {
        let cx = CallContext::background().with_timeout(Duration::ZERO);
        assert_eq!(cx.err(), Some(ContextError::DeadlineExceeded));
    }

    #[test]
    fn test_cancellation_wins_over_deadline() {
        let token = CancellationToken::new();
        token.cancel();
        let cx = CallContext::background()
            .with_cancellation(token)
            .with_deadline(Instant::now());
        assert_eq!(cx.err(), Some(ContextError::Canceled));
    }
}
