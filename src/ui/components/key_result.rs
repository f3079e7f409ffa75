use super::input::InputResult;

/// What a component did with a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Consumed with nothing further to do
  Handled,
  /// Consumed; the owner acts on the event
  Event(T),
  /// Ignored, the owner may use the key
  NotHandled,
}

impl<T> From<InputResult> for KeyResult<T> {
  fn from(result: InputResult) -> Self {
    match result {
      InputResult::Consumed => KeyResult::Handled,
      InputResult::NotHandled => KeyResult::NotHandled,
    }
  }
}
