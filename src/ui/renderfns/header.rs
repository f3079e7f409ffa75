use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar with title, record count, and shortcuts
pub fn draw_header(frame: &mut Frame, area: Rect, title: &str, count: Option<usize>) {
  let count = match count {
    Some(n) => format!(" {} ", contact_count_label(n)),
    None => " loading ".to_string(),
  };

  let mut spans = vec![
    Span::styled(format!(" {} ", title), Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(count, Style::default().fg(Color::Yellow).bold()),
    Span::raw("  "),
  ];

  // Keys and brackets highlighted, descriptions dimmed
  for (key, label) in [
    ("<tab>", "next field"),
    ("<enter>", "save"),
    ("<esc>", "table"),
    ("<n>", "new"),
    ("<e>", "edit"),
    ("<d>", "delete"),
    ("<r>", "refresh"),
    ("<q>", "quit"),
  ] {
    spans.push(Span::styled(key, Style::default().fg(Color::Cyan)));
    spans.push(Span::styled(format!(" {}   ", label), Style::default().fg(Color::DarkGray)));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}

fn contact_count_label(n: usize) -> String {
  match n {
    1 => "1 contact".to_string(),
    n => format!("{} contacts", n),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_contact_count_label() {
    assert_eq!(contact_count_label(0), "0 contacts");
    assert_eq!(contact_count_label(1), "1 contact");
    assert_eq!(contact_count_label(12), "12 contacts");
  }
}
