use crossterm::event::{self, Event as CrosstermEvent, KeyEvent};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::contacts::{ActionError, ContactBook, Screen};
use crate::db::{StoreError, UserRecord};

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Periodic tick for notification expiry
  Tick,
  /// Completion of a spawned store operation
  Store(StoreEvent),
}

/// One completion per issued operation, success or failure.
pub enum StoreEvent {
  Opened(Result<ContactBook, StoreError>),
  Refreshed(Result<Screen, ActionError>),
  Created(Result<UserRecord, ActionError>),
  Updated(Result<UserRecord, ActionError>),
  Deleted { id: String, result: Result<(), ActionError> },
  EditLoaded(Result<UserRecord, ActionError>),
}

impl std::fmt::Debug for StoreEvent {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      StoreEvent::Opened(r) => write!(f, "Opened(ok={})", r.is_ok()),
      StoreEvent::Refreshed(r) => write!(f, "Refreshed({:?})", r),
      StoreEvent::Created(r) => write!(f, "Created({:?})", r),
      StoreEvent::Updated(r) => write!(f, "Updated({:?})", r),
      StoreEvent::Deleted { id, result } => write!(f, "Deleted({}, {:?})", id, result),
      StoreEvent::EditLoaded(r) => write!(f, "EditLoaded({:?})", r),
    }
  }
}

/// Event handler that produces events from terminal input and a tick timer
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    let input_tx = tx.clone();

    // crossterm polling blocks, keep it off the async workers
    tokio::task::spawn_blocking(move || loop {
      if event::poll(tick_rate).unwrap_or(false) {
        if let Ok(CrosstermEvent::Key(key)) = event::read() {
          if input_tx.send(Event::Key(key)).is_err() {
            break;
          }
        }
      } else if input_tx.send(Event::Tick).is_err() {
        break;
      }
    });

    Self { tx, rx }
  }

  /// Sender for spawned tasks to report completions
  pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
    self.tx.clone()
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
