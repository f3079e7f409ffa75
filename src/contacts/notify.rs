use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
  Success,
  Error,
}

/// Outcome message for the user. Rendering is up to the caller.
#[derive(Debug, Clone)]
pub struct Notification {
  pub message: String,
  pub severity: Severity,
  pub raised_at: Instant,
}

impl Notification {
  pub fn success(message: impl Into<String>) -> Self {
    Self::new(message, Severity::Success)
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self::new(message, Severity::Error)
  }

  fn new(message: impl Into<String>, severity: Severity) -> Self {
    Self {
      message: message.into(),
      severity,
      raised_at: Instant::now(),
    }
  }

  pub fn is_expired(&self, ttl: Duration) -> bool {
    self.raised_at.elapsed() > ttl
  }
}
