use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::contacts::{ContactFields, Field, MIN_FIELD_LEN};
use crate::db::UserRecord;

use super::input::{InputResult, TextInput};
use super::key_result::KeyResult;

/// Write in flight; the submit button is disabled meanwhile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pending {
  Adding,
  Updating,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
  Submit,
  Cancel,
}

/// The four-field contact form.
///
/// Without an `editing` id a submit creates a record; with one it
/// replaces that record.
#[derive(Debug, Default)]
pub struct ContactForm {
  inputs: [TextInput; 4],
  focus: usize,
  invalid: Vec<Field>,
  editing: Option<String>,
  pending: Option<Pending>,
}

impl ContactForm {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn fields(&self) -> ContactFields {
    ContactFields::new(
      self.value(Field::FirstName),
      self.value(Field::LastName),
      self.value(Field::Email),
      self.value(Field::Phone),
    )
  }

  pub fn value(&self, field: Field) -> &str {
    self.inputs[field.index()].value()
  }

  pub fn focus(&self) -> Field {
    Field::ALL[self.focus]
  }

  pub fn set_focus(&mut self, field: Field) {
    self.focus = field.index();
  }

  pub fn editing_id(&self) -> Option<&str> {
    self.editing.as_deref()
  }

  pub fn pending(&self) -> Option<Pending> {
    self.pending
  }

  pub fn set_pending(&mut self, pending: Option<Pending>) {
    self.pending = pending;
  }

  /// Fill the form from a stored record and switch to update mode.
  pub fn prefill(&mut self, record: &UserRecord) {
    let fields = ContactFields::from(record);
    for field in Field::ALL {
      self.inputs[field.index()].set_value(fields.get(field));
    }
    self.invalid.clear();
    self.editing = Some(record.id.clone());
    self.focus = 0;
  }

  /// Empty every field and go back to create mode.
  pub fn reset(&mut self) {
    for input in &mut self.inputs {
      input.clear();
    }
    self.invalid.clear();
    self.editing = None;
    self.focus = 0;
  }

  pub fn mark_invalid(&mut self, fields: Vec<Field>) {
    if let Some(first) = fields.first() {
      self.focus = first.index();
    }
    self.invalid = fields;
  }

  pub fn is_invalid(&self, field: Field) -> bool {
    self.invalid.contains(&field)
  }

  pub fn button_label(&self) -> &'static str {
    match (self.pending, self.editing.is_some()) {
      (Some(Pending::Adding), _) => "adding...",
      (Some(Pending::Updating), _) => "updating...",
      (None, true) => "Update",
      (None, false) => "Add",
    }
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    match key.code {
      KeyCode::Tab | KeyCode::Down => {
        self.focus = self.focus().next().index();
        KeyResult::Handled
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focus = self.focus().previous().index();
        KeyResult::Handled
      }
      KeyCode::Enter => {
        if self.pending.is_some() {
          KeyResult::Handled
        } else {
          KeyResult::Event(FormEvent::Submit)
        }
      }
      KeyCode::Esc => KeyResult::Event(FormEvent::Cancel),
      _ => {
        let field = self.focus();
        let result = self.inputs[self.focus].handle_key(key);
        if result == InputResult::Consumed {
          // Editing a field clears its error marker
          self.invalid.retain(|f| *f != field);
        }
        result.into()
      }
    }
  }

  pub fn render(&self, frame: &mut Frame, area: Rect, focused: bool) {
    let title = if self.editing.is_some() {
      " Edit contact "
    } else {
      " New contact "
    };
    let border = if focused { Color::Cyan } else { Color::DarkGray };
    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(border));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = Vec::new();
    for field in Field::ALL {
      let active = focused && self.focus() == field;
      let label_style = if active {
        Style::default().fg(Color::Cyan).bold()
      } else {
        Style::default().fg(Color::Gray)
      };
      lines.push(Line::from(Span::styled(field.label(), label_style)));

      let value_style = if self.is_invalid(field) {
        Style::default().fg(Color::Red)
      } else {
        Style::default().fg(Color::White)
      };
      lines.push(Line::from(vec![
        Span::raw("  "),
        Span::styled(self.value(field).to_string(), value_style),
      ]));

      if self.is_invalid(field) {
        lines.push(Line::from(Span::styled(
          format!("  at least {} characters", MIN_FIELD_LEN),
          Style::default().fg(Color::Red).italic(),
        )));
      } else {
        lines.push(Line::raw(""));
      }
    }

    let button_style = if self.pending.is_some() {
      Style::default().fg(Color::DarkGray)
    } else {
      Style::default().fg(Color::Black).bg(Color::Cyan).bold()
    };
    lines.push(Line::from(Span::styled(
      format!("[ {} ]", self.button_label()),
      button_style,
    )));

    frame.render_widget(Paragraph::new(lines), inner);

    if focused {
      // Each field takes three rows: label, value, hint
      let row = inner.y + (self.focus as u16) * 3 + 1;
      let width = u16::try_from(self.inputs[self.focus].cursor_width()).unwrap_or(u16::MAX);
      let col = inner.x.saturating_add(2).saturating_add(width);
      if row < inner.bottom() && col < inner.right() {
        frame.set_cursor_position((col, row));
      }
    }
  }
}
