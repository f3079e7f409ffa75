use crate::config::Config;
use crate::contacts::{validate, ActionError, ContactBook, Notification, Screen};
use crate::db::{UserRecord, UserStore};
use crate::event::{Event, EventHandler, StoreEvent};
use crate::ui;
use crate::ui::components::{ContactForm, FormEvent, KeyResult, Pending};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use ratatui::widgets::TableState;
use std::future::Future;
use std::io::{stdout, Stdout};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

/// How long a notification stays on the status line
const NOTIFICATION_TTL: Duration = Duration::from_secs(4);

/// What the records panel knows about the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Records {
  /// Store not open yet
  Loading,
  /// Store could not be opened
  Unavailable(String),
  Ready(Screen),
}

/// Which panel receives keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
  Form,
  Table,
}

/// Main application state
pub struct App {
  config: Config,

  /// Set once the open step completes
  book: Option<ContactBook>,

  records: Records,
  table_state: TableState,
  form: ContactForm,
  focus: Focus,
  notification: Option<Notification>,

  /// Where the store lives, shown on the idle status line
  store_label: String,

  /// Event sender for async tasks
  event_tx: mpsc::UnboundedSender<Event>,

  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Self {
    let (tx, _rx) = mpsc::unbounded_channel();

    Self {
      config,
      book: None,
      records: Records::Loading,
      table_state: TableState::default(),
      form: ContactForm::new(),
      focus: Focus::Form,
      notification: None,
      store_label: "opening record store...".to_string(),
      event_tx: tx,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.event_loop(&mut terminal).await;

    // Cleanup terminal, even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    let mut events = EventHandler::new(Duration::from_millis(250));
    self.event_tx = events.sender();

    self.open_store()?;

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      if let Some(event) = events.next().await {
        self.handle_event(event);
      }
    }
    Ok(())
  }

  /// Open the record store; the first refresh runs once it reports back.
  fn open_store(&mut self) -> Result<()> {
    let path = self.config.store_path()?;
    let version = self.config.store.version;
    self.store_label = format!("{} (schema v{})", path.display(), version);

    self.spawn(
      async move { UserStore::open(path, version).await.map(ContactBook::new) },
      StoreEvent::Opened,
    );
    Ok(())
  }

  /// Run `fut` in the background and deliver its result as a store event.
  fn spawn<T, Fut, F>(&self, fut: Fut, wrap: F)
  where
    T: Send + 'static,
    Fut: Future<Output = T> + Send + 'static,
    F: FnOnce(T) -> StoreEvent + Send + 'static,
  {
    let tx = self.event_tx.clone();
    tokio::spawn(async move {
      let result = fut.await;
      // Receiver gone means the app is shutting down
      let _ = tx.send(Event::Store(wrap(result)));
    });
  }

  pub fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => {
        if self
          .notification
          .as_ref()
          .is_some_and(|n| n.is_expired(NOTIFICATION_TTL))
        {
          self.notification = None;
        }
      }
      Event::Store(store_event) => self.handle_store_event(store_event),
    }
  }

  fn handle_store_event(&mut self, event: StoreEvent) {
    match event {
      StoreEvent::Opened(Ok(book)) => {
        info!(location = %self.store_label, "record store ready");
        self.book = Some(book);
        self.refresh();
      }
      StoreEvent::Opened(Err(e)) => {
        error!(error = %e, "record store unavailable");
        self.records = Records::Unavailable(e.to_string());
        self.notify(Notification::error("Could not open the record store"));
      }
      StoreEvent::Refreshed(Ok(screen)) => {
        self.records = Records::Ready(screen);
        self.clamp_selection();
      }
      StoreEvent::Refreshed(Err(e)) => {
        error!(error = %e, "refresh failed");
        self.notify(e.notification());
      }
      StoreEvent::Created(result) => self.finish_write(result, "User Added"),
      StoreEvent::Updated(result) => self.finish_write(result, "User Updated"),
      StoreEvent::Deleted { id, result } => match result {
        Ok(()) => {
          self.notify(Notification::success("User Deleted"));
          if self.form.editing_id() == Some(id.as_str()) {
            self.form.reset();
          }
          self.refresh();
        }
        Err(e) => self.notify(e.notification()),
      },
      StoreEvent::EditLoaded(Ok(record)) => {
        self.form.prefill(&record);
        self.focus = Focus::Form;
      }
      StoreEvent::EditLoaded(Err(e)) => self.notify(e.notification()),
    }
  }

  /// Completion of a create or update. The busy state always ends here.
  fn finish_write(&mut self, result: Result<UserRecord, ActionError>, success: &str) {
    self.form.set_pending(None);
    match result {
      Ok(_) => {
        self.notify(Notification::success(success));
        self.form.reset();
        self.refresh();
      }
      Err(ActionError::Invalid(fields)) => self.form.mark_invalid(fields),
      Err(e) => self.notify(e.notification()),
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    match self.focus {
      Focus::Form => match self.form.handle_key(key) {
        KeyResult::Event(FormEvent::Submit) => self.submit(),
        KeyResult::Event(FormEvent::Cancel) => self.focus = Focus::Table,
        KeyResult::Handled | KeyResult::NotHandled => {}
      },
      Focus::Table => self.handle_table_key(key),
    }
  }

  fn handle_table_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Tab | KeyCode::Char('i') => self.focus = Focus::Form,
      KeyCode::Char('n') | KeyCode::Char('a') => {
        if self.form.pending().is_none() {
          self.form.reset();
        }
        self.focus = Focus::Form;
      }
      KeyCode::Char('e') | KeyCode::Enter => {
        if let Some(id) = self.selected_record().map(|r| r.id.clone()) {
          self.begin_edit(id);
        }
      }
      KeyCode::Char('d') | KeyCode::Delete => {
        if let Some(id) = self.selected_record().map(|r| r.id.clone()) {
          self.delete(id);
        }
      }
      KeyCode::Char('r') => self.refresh(),
      _ => {}
    }
    self.clamp_selection();
  }

  fn book_or_notify(&mut self) -> Option<ContactBook> {
    if self.book.is_none() {
      self.notify(Notification::error("Record store unavailable"));
    }
    self.book.clone()
  }

  /// Submit-create or submit-update, depending on the form mode.
  pub fn submit(&mut self) {
    if self.form.pending().is_some() {
      return;
    }

    let fields = self.form.fields();
    if let Err(invalid) = validate(&fields) {
      self.form.mark_invalid(invalid);
      return;
    }

    let Some(book) = self.book_or_notify() else {
      return;
    };

    match self.form.editing_id().map(String::from) {
      None => {
        self.form.set_pending(Some(Pending::Adding));
        self.spawn(
          async move { book.create(fields).await },
          StoreEvent::Created,
        );
      }
      Some(id) => {
        self.form.set_pending(Some(Pending::Updating));
        self.spawn(
          async move { book.update(&id, fields).await },
          StoreEvent::Updated,
        );
      }
    }
  }

  pub fn delete(&mut self, id: String) {
    let Some(book) = self.book_or_notify() else {
      return;
    };
    let task_id = id.clone();
    self.spawn(
      async move { book.delete(&task_id).await },
      move |result| StoreEvent::Deleted { id, result },
    );
  }

  pub fn begin_edit(&mut self, id: String) {
    let Some(book) = self.book_or_notify() else {
      return;
    };
    self.spawn(
      async move { book.begin_edit(&id).await },
      StoreEvent::EditLoaded,
    );
  }

  /// Reload the records panel. Silently skipped before the store is open.
  pub fn refresh(&self) {
    if let Some(book) = self.book.clone() {
      self.spawn(async move { book.refresh().await }, StoreEvent::Refreshed);
    }
  }

  fn notify(&mut self, notification: Notification) {
    self.notification = Some(notification);
  }

  fn rows(&self) -> &[UserRecord] {
    match &self.records {
      Records::Ready(Screen::Table(rows)) => rows.as_slice(),
      _ => &[],
    }
  }

  fn selected_record(&self) -> Option<&UserRecord> {
    self.table_state.selected().and_then(|i| self.rows().get(i))
  }

  fn clamp_selection(&mut self) {
    let len = self.rows().len();
    if len == 0 {
      self.table_state.select(None);
    } else {
      let selected = self.table_state.selected().unwrap_or(0).min(len - 1);
      self.table_state.select(Some(selected));
    }
  }

  // Accessors for UI rendering
  pub fn title(&self) -> &str {
    self.config.title()
  }

  pub fn form(&self) -> &ContactForm {
    &self.form
  }

  pub fn focus(&self) -> Focus {
    self.focus
  }

  pub fn notification(&self) -> Option<&Notification> {
    self.notification.as_ref()
  }

  pub fn store_label(&self) -> &str {
    &self.store_label
  }

  /// Number of stored contacts, once known
  pub fn contact_count(&self) -> Option<usize> {
    match &self.records {
      Records::Ready(Screen::Empty) => Some(0),
      Records::Ready(Screen::Table(rows)) => Some(rows.len()),
      _ => None,
    }
  }

  pub fn records_mut(&mut self) -> (&Records, &mut TableState) {
    (&self.records, &mut self.table_state)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::contacts::{Field, Severity};
  use crate::db::Database;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn type_str(app: &mut App, s: &str) {
    for c in s.chars() {
      app.handle_event(Event::Key(key(KeyCode::Char(c))));
    }
  }

  fn fill_form(app: &mut App, values: [&str; 4]) {
    for value in values {
      type_str(app, value);
      app.handle_event(Event::Key(key(KeyCode::Tab)));
    }
  }

  /// Feed completions back into the app until nothing more arrives.
  async fn settle(app: &mut App, rx: &mut mpsc::UnboundedReceiver<Event>) {
    while let Ok(Some(event)) = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await {
      app.handle_event(event);
    }
  }

  async fn opened_app() -> (App, mpsc::UnboundedReceiver<Event>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut app = App::new(Config::default());
    app.event_tx = tx;

    let book = ContactBook::new(UserStore::from_database(
      Database::open_in_memory(12).unwrap(),
    ));
    app.handle_event(Event::Store(StoreEvent::Opened(Ok(book))));
    settle(&mut app, &mut rx).await;
    (app, rx)
  }

  #[tokio::test]
  async fn test_open_triggers_first_refresh() {
    let (app, _rx) = opened_app().await;
    assert_eq!(app.records, Records::Ready(Screen::Empty));
    assert_eq!(app.contact_count(), Some(0));
  }

  #[tokio::test]
  async fn test_open_failure_marks_unavailable() {
    let mut app = App::new(Config::default());
    app.handle_event(Event::Store(StoreEvent::Opened(Err(
      crate::db::StoreError::InvalidVersion,
    ))));

    assert!(matches!(app.records, Records::Unavailable(_)));
    assert_eq!(app.notification().unwrap().severity, Severity::Error);

    // Actions report instead of silently doing nothing
    app.notification = None;
    app.delete("any".to_string());
    assert_eq!(app.notification().unwrap().message, "Record store unavailable");
  }

  #[tokio::test]
  async fn test_submit_create_then_table() {
    let (mut app, mut rx) = opened_app().await;

    fill_form(&mut app, ["Ada", "Lovelace", "ada@example.com", "5550100"]);
    app.handle_event(Event::Key(key(KeyCode::Enter)));
    assert_eq!(app.form().pending(), Some(Pending::Adding));
    assert_eq!(app.form().button_label(), "adding...");

    settle(&mut app, &mut rx).await;

    assert_eq!(app.form().pending(), None);
    assert_eq!(app.notification().unwrap().message, "User Added");
    assert_eq!(app.form().value(Field::FirstName), "");
    assert_eq!(app.contact_count(), Some(1));
    assert_eq!(app.rows()[0].email, "ada@example.com");
  }

  #[tokio::test]
  async fn test_invalid_submit_marks_fields() {
    let (mut app, mut rx) = opened_app().await;

    fill_form(&mut app, ["A", "Lovelace", "ada@example.com", "5"]);
    app.handle_event(Event::Key(key(KeyCode::Enter)));
    settle(&mut app, &mut rx).await;

    assert!(app.form().is_invalid(Field::FirstName));
    assert!(app.form().is_invalid(Field::Phone));
    assert!(!app.form().is_invalid(Field::Email));
    assert_eq!(app.form().pending(), None);
    assert_eq!(app.contact_count(), Some(0));
  }

  #[tokio::test]
  async fn test_edit_update_cycle() {
    let (mut app, mut rx) = opened_app().await;

    fill_form(&mut app, ["Ada", "Lovelace", "ada@example.com", "5550100"]);
    app.handle_event(Event::Key(key(KeyCode::Enter)));
    settle(&mut app, &mut rx).await;
    let id = app.rows()[0].id.clone();

    // Table panel: edit the selected row
    app.handle_event(Event::Key(key(KeyCode::Esc)));
    assert_eq!(app.focus(), Focus::Table);
    app.handle_event(Event::Key(key(KeyCode::Char('e'))));
    settle(&mut app, &mut rx).await;

    assert_eq!(app.focus(), Focus::Form);
    assert_eq!(app.form().editing_id(), Some(id.as_str()));
    assert_eq!(app.form().button_label(), "Update");

    // Change the last name
    app.form.set_focus(Field::LastName);
    for _ in 0.."Lovelace".len() {
      app.handle_event(Event::Key(key(KeyCode::Backspace)));
    }
    type_str(&mut app, "King");
    app.handle_event(Event::Key(key(KeyCode::Enter)));
    assert_eq!(app.form().button_label(), "updating...");
    settle(&mut app, &mut rx).await;

    assert_eq!(app.notification().unwrap().message, "User Updated");
    assert_eq!(app.form().editing_id(), None);
    assert_eq!(app.rows().len(), 1);
    assert_eq!(app.rows()[0].id, id);
    assert_eq!(app.rows()[0].lastname, "King");
  }

  #[tokio::test]
  async fn test_delete_selected_returns_to_empty() {
    let (mut app, mut rx) = opened_app().await;

    fill_form(&mut app, ["Ada", "Lovelace", "ada@example.com", "5550100"]);
    app.handle_event(Event::Key(key(KeyCode::Enter)));
    settle(&mut app, &mut rx).await;

    app.handle_event(Event::Key(key(KeyCode::Esc)));
    app.handle_event(Event::Key(key(KeyCode::Char('d'))));
    settle(&mut app, &mut rx).await;

    assert_eq!(app.notification().unwrap().message, "User Deleted");
    assert_eq!(app.records, Records::Ready(Screen::Empty));
    assert_eq!(app.table_state.selected(), None);
  }

  #[tokio::test]
  async fn test_deleting_edited_record_resets_form() {
    let (mut app, mut rx) = opened_app().await;

    fill_form(&mut app, ["Ada", "Lovelace", "ada@example.com", "5550100"]);
    app.handle_event(Event::Key(key(KeyCode::Enter)));
    settle(&mut app, &mut rx).await;
    let id = app.rows()[0].id.clone();

    app.begin_edit(id.clone());
    settle(&mut app, &mut rx).await;
    assert_eq!(app.form().editing_id(), Some(id.as_str()));

    app.delete(id);
    settle(&mut app, &mut rx).await;
    assert_eq!(app.form().editing_id(), None);
  }

  #[tokio::test]
  async fn test_begin_edit_missing_reports_error() {
    let (mut app, mut rx) = opened_app().await;
    app.begin_edit("ghost".to_string());
    settle(&mut app, &mut rx).await;

    let n = app.notification().unwrap();
    assert_eq!(n.severity, Severity::Error);
    assert_eq!(n.message, "Contact not found");
  }

  #[tokio::test]
  async fn test_quit_keys() {
    let (mut app, _rx) = opened_app().await;
    app.handle_event(Event::Key(key(KeyCode::Char('q'))));
    // 'q' in the form is just a character
    assert!(!app.should_quit);

    app.handle_event(Event::Key(key(KeyCode::Esc)));
    app.handle_event(Event::Key(key(KeyCode::Char('q'))));
    assert!(app.should_quit);
  }
}
