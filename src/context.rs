//! Request-scoped context carried through every store round trip.
//!
//! The core never interprets the context; it only hands it to the store,
//! which may refuse work once the caller's deadline has passed.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub request_id: Option<String>,
    pub deadline: Option<Instant>,
}

impl RequestContext {
    /// A context with no deadline and no request id.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Label used in log lines.
    pub fn label(&self) -> &str {
        self.request_id.as_deref().unwrap_or("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_never_expires() {
        assert!(!RequestContext::background().is_expired());
    }

    #[test]
    fn past_deadline_is_expired() {
        let ctx = RequestContext::background()
            .with_request_id("req-1")
            .with_deadline(Instant::now() - Duration::from_millis(1));
        assert!(ctx.is_expired());
        assert_eq!(ctx.label(), "req-1");
    }
}
