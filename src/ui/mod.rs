pub mod components;
mod renderfns;
mod views;

use crate::app::{App, Focus, Records};
use crate::contacts::Screen;
use ratatui::prelude::*;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Form and records
      Constraint::Length(1), // Status line
    ])
    .split(frame.area());

  renderfns::draw_header(frame, chunks[0], app.title(), app.contact_count());

  let body = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Length(40), Constraint::Min(20)])
    .split(chunks[1]);

  let focus = app.focus();
  app.form().render(frame, body[0], focus == Focus::Form);
  draw_records(frame, body[1], app, focus == Focus::Table);

  let idle = app.store_label().to_string();
  renderfns::draw_footer(frame, chunks[2], app.notification(), &idle);
}

fn draw_records(frame: &mut Frame, area: Rect, app: &mut App, focused: bool) {
  let (records, state) = app.records_mut();
  match records {
    Records::Loading => {
      views::draw_message(frame, area, "Contacts", "Opening record store...", Color::DarkGray)
    }
    Records::Unavailable(reason) => views::draw_message(
      frame,
      area,
      "Contacts",
      &format!("Record store unavailable: {}", reason),
      Color::Red,
    ),
    Records::Ready(Screen::Empty) => views::draw_message(
      frame,
      area,
      "Contacts",
      "No contacts yet. Fill in the form and press Enter.",
      Color::DarkGray,
    ),
    Records::Ready(Screen::Table(rows)) => {
      views::draw_contact_table(frame, area, rows, state, focused)
    }
  }
}
