use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::contacts::Notification;

use super::utils::severity_color;

/// Draw the status line: the latest notification, or the store location
pub fn draw_footer(frame: &mut Frame, area: Rect, notification: Option<&Notification>, idle_text: &str) {
  let line = match notification {
    Some(n) => Line::from(vec![
      Span::raw(" "),
      Span::styled(
        n.message.clone(),
        Style::default().fg(severity_color(n.severity)).bold(),
      ),
    ]),
    None => Line::from(vec![
      Span::raw(" "),
      Span::styled(idle_text.to_string(), Style::default().fg(Color::DarkGray)),
    ]),
  };

  let paragraph = Paragraph::new(line).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}
