use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap};

use crate::db::UserRecord;
use crate::ui::renderfns::truncate;

fn panel_block(title: String, focused: bool) -> Block<'static> {
  let border = if focused { Color::Cyan } else { Color::Blue };
  Block::default()
    .title(title)
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(border))
}

/// Records table. Row numbers are display positions, not ids.
pub fn draw_contact_table(
  frame: &mut Frame,
  area: Rect,
  records: &[UserRecord],
  state: &mut TableState,
  focused: bool,
) {
  let block = panel_block(format!(" Contacts ({}) ", records.len()), focused);

  let header = Row::new(["#", "First name", "Last name", "Email", "Phone"])
    .style(Style::default().fg(Color::Yellow).bold());

  let rows: Vec<Row> = records
    .iter()
    .enumerate()
    .map(|(i, user)| {
      Row::new(vec![
        Cell::from(format!("{}", i + 1)).style(Style::default().fg(Color::DarkGray)),
        Cell::from(truncate(&user.firstname, 20)),
        Cell::from(truncate(&user.lastname, 20)),
        Cell::from(truncate(&user.email, 32)).style(Style::default().fg(Color::Cyan)),
        Cell::from(truncate(&user.phone, 18)),
      ])
    })
    .collect();

  let widths = [
    Constraint::Length(4),
    Constraint::Percentage(20),
    Constraint::Percentage(20),
    Constraint::Percentage(35),
    Constraint::Percentage(25),
  ];

  let table = Table::new(rows, widths)
    .header(header)
    .block(block)
    .row_highlight_style(
      Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

  frame.render_stateful_widget(table, area, state);
}

/// Placeholder panel for the empty, loading and unavailable states.
pub fn draw_message(frame: &mut Frame, area: Rect, title: &str, message: &str, color: Color) {
  let paragraph = Paragraph::new(message.to_string())
    .block(panel_block(format!(" {} ", title), false))
    .style(Style::default().fg(color))
    .wrap(Wrap { trim: true });
  frame.render_widget(paragraph, area);
}
