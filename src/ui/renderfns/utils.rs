use ratatui::prelude::Color;

/// Truncate to at most `max_chars` characters, ending in "..." when cut
pub fn truncate(s: &str, max_chars: usize) -> String {
  if s.chars().count() <= max_chars {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Display color for a record status (enrollment, teaching, class, registration)
pub fn status_color(status: &str) -> Color {
  match status.to_ascii_lowercase().as_str() {
    "active" | "approved" | "open" => Color::Green,
    "pending" | "waiting" => Color::Yellow,
    "inactive" | "closed" | "cancelled" | "rejected" => Color::Red,
    _ => Color::White,
  }
}

/// Host part of the API base URL, for the header
pub fn host_of(url: &url::Url) -> String {
  match (url.host_str(), url.port()) {
    (Some(host), Some(port)) => format!("{}:{}", host, port),
    (Some(host), None) => host.to_string(),
    _ => url.as_str().to_string(),
  }
}
