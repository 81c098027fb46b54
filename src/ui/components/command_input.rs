use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::commands::{self, Command};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

const MAX_SUGGESTIONS: usize = 8;

/// Events emitted by command input that parent needs to handle
#[derive(Debug, Clone)]
pub enum CommandEvent {
  /// A known command was chosen
  Run(&'static Command),
  /// Enter on text that matches no command
  Unknown(String),
  Cancelled,
}

/// `:` command overlay with autocomplete
#[derive(Debug, Clone, Default)]
pub struct CommandInput {
  input: TextInput,
  active: bool,
  selected_suggestion: usize,
}

impl CommandInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn activate(&mut self) {
    self.active = true;
    self.input.clear();
    self.selected_suggestion = 0;
  }

  fn close(&mut self) {
    self.active = false;
    self.input.clear();
    self.selected_suggestion = 0;
  }

  pub fn suggestions(&self) -> Vec<&'static Command> {
    commands::get_suggestions(self.input.value())
  }

  fn step_selection(&mut self, forward: bool) {
    let len = self.suggestions().len();
    if len == 0 {
      return;
    }
    self.selected_suggestion = if forward {
      (self.selected_suggestion + 1) % len
    } else {
      (self.selected_suggestion + len - 1) % len
    };
  }

  /// Handle a key event; `:` opens the overlay when inactive
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<CommandEvent> {
    if !self.active {
      if key.code == KeyCode::Char(':') {
        self.activate();
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc => {
        self.close();
        KeyResult::Event(CommandEvent::Cancelled)
      }
      KeyCode::Enter => {
        let event = match self.suggestions().get(self.selected_suggestion).copied() {
          Some(cmd) => CommandEvent::Run(cmd),
          None => CommandEvent::Unknown(self.input.value().trim().to_string()),
        };
        self.close();
        KeyResult::Event(event)
      }
      KeyCode::Tab | KeyCode::Down => {
        self.step_selection(true);
        KeyResult::Handled
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.step_selection(false);
        KeyResult::Handled
      }
      _ => {
        if self.input.handle_key(key) == InputResult::Consumed {
          // Reset selection on input change
          self.selected_suggestion = 0;
        }
        KeyResult::Handled
      }
    }
  }

  /// Render the command overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let suggestions = self.suggestions();
    let shown = suggestions.len().min(MAX_SUGGESTIONS) as u16;
    let width = (area.width * 60 / 100).clamp(30, 60).min(area.width);
    let height = (3 + shown).min(area.height);
    let overlay_area = Rect::new(area.x + 1, area.y + 1, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Command ");
    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(1), Constraint::Min(0)])
      .split(inner);

    let input_line = Line::from(vec![
      Span::styled(":", Style::default().fg(Color::Yellow)),
      Span::raw(self.input.value()),
      Span::styled("_", Style::default().fg(Color::Yellow)),
    ]);
    frame.render_widget(Paragraph::new(input_line), chunks[0]);

    if suggestions.is_empty() || chunks[1].height == 0 {
      return;
    }

    let items: Vec<ListItem> = suggestions
      .iter()
      .take(MAX_SUGGESTIONS)
      .map(|cmd| {
        ListItem::new(Line::from(vec![
          Span::styled(format!("{:<15}", cmd.name), Style::default().fg(Color::Cyan)),
          Span::styled(cmd.description, Style::default().fg(Color::DarkGray)),
        ]))
      })
      .collect();

    let list =
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));
    let mut state = ListState::default();
    state.select(Some(self.selected_suggestion));
    frame.render_stateful_widget(list, chunks[1], &mut state);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::commands::CommandTarget;
  use crate::api::ResourceKind;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn type_str(cmd: &mut CommandInput, text: &str) {
    for c in text.chars() {
      cmd.handle_key(key(KeyCode::Char(c)));
    }
  }

  #[test]
  fn test_colon_activates() {
    let mut cmd = CommandInput::new();
    assert!(matches!(
      cmd.handle_key(key(KeyCode::Char('x'))),
      KeyResult::NotHandled
    ));
    cmd.handle_key(key(KeyCode::Char(':')));
    assert!(cmd.is_active());
  }

  #[test]
  fn test_enter_runs_best_suggestion() {
    let mut cmd = CommandInput::new();
    cmd.activate();
    type_str(&mut cmd, "tea");
    match cmd.handle_key(key(KeyCode::Enter)) {
      KeyResult::Event(CommandEvent::Run(c)) => {
        assert_eq!(c.target, CommandTarget::Open(ResourceKind::Teacher))
      }
      other => panic!("unexpected {:?}", other),
    }
    assert!(!cmd.is_active());
  }

  #[test]
  fn test_tab_cycles_suggestions() {
    let mut cmd = CommandInput::new();
    cmd.activate();
    cmd.handle_key(key(KeyCode::BackTab));
    match cmd.handle_key(key(KeyCode::Enter)) {
      KeyResult::Event(CommandEvent::Run(c)) => assert_eq!(c.name, "quit"),
      other => panic!("unexpected {:?}", other),
    }
  }

  #[test]
  fn test_unknown_command() {
    let mut cmd = CommandInput::new();
    cmd.activate();
    type_str(&mut cmd, "zzz");
    match cmd.handle_key(key(KeyCode::Enter)) {
      KeyResult::Event(CommandEvent::Unknown(text)) => assert_eq!(text, "zzz"),
      other => panic!("unexpected {:?}", other),
    }
  }
}
