use crate::api::ResourceKind;
use crate::commands::{Command, CommandTarget};
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::notify::{ChannelNotifier, Notice};
use crate::services::Services;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::renderfns::{draw_footer, draw_header, host_of};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::list_view;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info};

const TICK_RATE: Duration = Duration::from_millis(250);
const TOAST_TTL: Duration = Duration::from_secs(4);

/// Main application state
pub struct App {
  config: Config,
  services: Arc<Services>,
  /// API host shown in the header
  host: String,

  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  command: CommandInput,

  notices: mpsc::UnboundedReceiver<Notice>,
  /// Latest notice and when it arrived
  toast: Option<(Notice, Instant)>,

  should_quit: bool,
}

impl App {
  pub fn new(config: Config, initial: ResourceKind) -> Result<Self> {
    let (notifier, notices) = ChannelNotifier::new();
    let services = Arc::new(Services::new(&config, Arc::new(notifier))?);
    let host = host_of(services.api().base_url());
    let root = list_view(initial, services.clone());

    Ok(Self {
      config,
      services,
      host,
      view_stack: vec![root],
      command: CommandInput::new(),
      notices,
      toast: None,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    info!(host = %self.host, "console started");

    let result = self.event_loop(&mut terminal).await;

    // Restore the terminal even if the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
  }

  async fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);

    while !self.should_quit {
      terminal.draw(|frame| self.draw(frame))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => self.tick(),
        Some(Event::Resize) => {}
        None => break,
      }
    }

    Ok(())
  }

  fn draw(&mut self, frame: &mut Frame) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Header
        Constraint::Min(1),    // Current view
        Constraint::Length(1), // Breadcrumb and toast
      ])
      .split(frame.area());

    let breadcrumb = self.breadcrumb();
    let notice = self.toast.as_ref().map(|(notice, _)| notice);

    if let Some(view) = self.view_stack.last_mut() {
      let shortcuts = view.shortcuts();
      draw_header(
        frame,
        chunks[0],
        self.config.title(),
        &self.host,
        &view.context(),
        &shortcuts,
      );
      view.render(frame, chunks[1]);
    }

    draw_footer(frame, chunks[2], &breadcrumb, notice);
    self.command.render_overlay(frame, chunks[1]);
  }

  fn breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|view| view.breadcrumb_label())
      .collect()
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    // `:` belongs to the view while it is reading text
    let view_captures = self.view_stack.last().is_some_and(|v| v.captures_input());
    if self.command.is_active() || !view_captures {
      match self.command.handle_key(key) {
        KeyResult::Handled | KeyResult::Event(CommandEvent::Cancelled) => return,
        KeyResult::Event(CommandEvent::Run(command)) => {
          self.run_command(command);
          return;
        }
        KeyResult::Event(CommandEvent::Unknown(text)) => {
          self
            .services
            .notifier()
            .error(&format!("Unknown command: {}", text));
          return;
        }
        KeyResult::NotHandled => {}
      }
    }

    if let Some(view) = self.view_stack.last_mut() {
      let action = view.handle_key(key);
      self.apply(action);
    }
  }

  fn run_command(&mut self, command: &Command) {
    debug!(command = command.name, "running command");
    match command.target {
      CommandTarget::Open(kind) => {
        // Switching collections starts a fresh stack
        self.view_stack = vec![list_view(kind, self.services.clone())];
      }
      CommandTarget::Quit => self.should_quit = true,
    }
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
          if let Some(view) = self.view_stack.last_mut() {
            view.on_resume();
          }
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn tick(&mut self) {
    while let Ok(notice) = self.notices.try_recv() {
      self.toast = Some((notice, Instant::now()));
    }
    if self
      .toast
      .as_ref()
      .is_some_and(|(_, shown)| shown.elapsed() > TOAST_TTL)
    {
      self.toast = None;
    }

    // Every view keeps polling; only the top one may navigate
    let top = self.view_stack.len().saturating_sub(1);
    let mut action = ViewAction::None;
    for (i, view) in self.view_stack.iter_mut().enumerate() {
      let result = view.tick();
      if i == top {
        action = result;
      }
    }
    self.apply(action);
  }
}
