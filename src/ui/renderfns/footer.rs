use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::notify::{Notice, NoticeLevel};

/// Draw the footer bar: view breadcrumb on the left, latest notice on the right
pub fn draw_footer(frame: &mut Frame, area: Rect, breadcrumb: &[String], notice: Option<&Notice>) {
  let mut spans = vec![Span::raw(" ")];

  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }

    let style = if i == breadcrumb.len() - 1 {
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };
    spans.push(Span::styled(part.clone(), style));
  }

  let chunks = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Min(10), Constraint::Percentage(60)])
    .split(area);

  let background = Style::default().bg(Color::Black);
  frame.render_widget(Paragraph::new(Line::from(spans)).style(background), chunks[0]);

  if let Some(notice) = notice {
    let color = match notice.level {
      NoticeLevel::Success => Color::Green,
      NoticeLevel::Error => Color::Red,
    };
    let toast = Paragraph::new(Line::from(Span::styled(
      format!("{} ", notice.message),
      Style::default().fg(color).bold(),
    )))
    .alignment(Alignment::Right)
    .style(background);
    frame.render_widget(toast, chunks[1]);
  }
}
