use crate::api::{CachedResourceClient, ListFilter, Page, PageRequest, Record, Resource, ResourceKind};
use crate::api::{RegisterClass, School, Student, Subject, SubjectClass, Teacher};
use crate::query::{MutationState, Mutation, Query, QueryState};
use crate::services::{Managed, Services};
use crate::ui::components::{ConfirmDialog, ConfirmEvent, KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{status_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::FormView;
use crossterm::event::{KeyCode, KeyEvent};
use futures::future::BoxFuture;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Fetcher for one page of `R`. With `bypass_cache` the page comes straight
/// from the server and replaces the cached copy.
fn page_fetcher<R: Resource>(
  client: CachedResourceClient<R>,
  request: PageRequest<R::Filter>,
  bypass_cache: bool,
) -> impl Fn(CancellationToken) -> BoxFuture<'static, Result<Page<Record<R>>, String>> + Send + Sync + 'static
{
  move |cancel| {
    let client = client.clone();
    let request = request.clone();
    Box::pin(async move {
      let result = if bypass_cache {
        client.refresh(&request, Some(&cancel)).await
      } else {
        client.list(&request, Some(&cancel)).await
      };
      result.map_err(|e| e.user_message())
    })
  }
}

/// Paged table over one collection
pub struct ListView<R: Managed> {
  services: Arc<Services>,
  request: PageRequest<R::Filter>,
  query: Query<Page<Record<R>>>,
  table_state: TableState,
  search: SearchInput,
  confirm: ConfirmDialog,
  /// Record the confirm dialog is asking about
  pending_delete: Option<Record<R>>,
  delete: Mutation<String>,
}

impl<R: Managed> ListView<R> {
  pub fn new(services: Arc<Services>) -> Self {
    let client = R::client(&services).clone();
    let request = PageRequest::new(1, client.default_page_size());
    let mut query = Query::new(page_fetcher(client, request.clone(), false));

    // Start fetching immediately
    query.fetch();

    let hint = format!("keys: {}", <R::Filter as ListFilter>::KEYS.join(", "));
    Self {
      services,
      request,
      query,
      table_state: TableState::default(),
      search: SearchInput::with_hint(hint),
      confirm: ConfirmDialog::new(),
      pending_delete: None,
      delete: Mutation::new(),
    }
  }

  fn client(&self) -> &CachedResourceClient<R> {
    R::client(&self.services)
  }

  /// Swap in the current request and fetch it
  fn reload(&mut self, bypass_cache: bool) {
    debug!(kind = %R::KIND, page = self.request.page, bypass_cache, "loading page");
    let fetcher = page_fetcher(self.client().clone(), self.request.clone(), bypass_cache);
    self.query.set_fetcher(fetcher);
  }

  fn records(&self) -> &[Record<R>] {
    self.query.data().map(|p| p.items.as_slice()).unwrap_or(&[])
  }

  fn total_pages(&self) -> u32 {
    self
      .query
      .data()
      .map(|p| p.total_pages(self.request.page_size))
      .unwrap_or(0)
  }

  fn selected(&self) -> Option<&Record<R>> {
    self
      .table_state
      .selected()
      .and_then(|idx| self.records().get(idx))
  }

  fn go_to_page(&mut self, page: u32) {
    if page == self.request.page || page == 0 {
      return;
    }
    self.request.page = page;
    self.table_state.select(Some(0));
    self.reload(false);
  }

  fn apply_search(&mut self, text: &str) {
    match R::Filter::parse_search(text) {
      Ok(filter) => {
        if filter != self.request.filter {
          self.request = self.request.first().with_filter(filter);
          self.reload(false);
        }
      }
      Err(e) => self.services.notifier().error(&e.to_string()),
    }
  }

  fn start_delete(&mut self, record: Record<R>) {
    let client = self.client().clone();
    let label = format!("Deleted {} {}", R::KIND.noun(), record.display_name());
    self.delete.start(async move {
      client
        .delete(&record.id)
        .await
        .map(|_| label)
        .map_err(|e| e.user_message())
    });
  }

  fn title(&self) -> String {
    let name = R::KIND.title();
    let filter = if self.request.filter.is_empty() {
      String::new()
    } else {
      format!(" [{}]", self.request.filter.describe())
    };

    match self.query.state() {
      QueryState::Loading if !self.query.is_placeholder() => format!(" {} (loading...) ", name),
      QueryState::Error(e) => format!(" {} (error: {}) ", name, e),
      _ => {
        let count = self.query.data().map(|p| p.count).unwrap_or(0);
        let pages = self.total_pages().max(1);
        let refreshing = if self.query.is_fetching() { " ..." } else { "" };
        format!(
          " {} ({}) page {}/{}{}{} ",
          name, count, self.request.page, pages, filter, refreshing
        )
      }
    }
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.records().len();
    ensure_valid_selection(&mut self.table_state, len);

    let block = Block::default()
      .title(self.title())
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.query.is_loading() {
      let content = if self.query.is_error() {
        "Failed to load. Press 'r' to retry.".to_string()
      } else {
        format!("No {} found. Press 'a' to add one.", R::KIND.title().to_lowercase())
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let columns = R::columns();
    let status_idx = columns.iter().position(|c| c.title == "Status");
    // Old rows stay visible but dimmed while the next page loads
    let base = if self.query.is_placeholder() {
      Style::default().fg(Color::DarkGray)
    } else {
      Style::default()
    };

    let header = Row::new(
      columns
        .iter()
        .map(|c| Cell::from(c.title).style(Style::default().fg(Color::Yellow).bold())),
    );

    let rows: Vec<Row> = self
      .records()
      .iter()
      .map(|record| {
        let cells = record.row().into_iter().zip(columns).enumerate().map(|(i, (text, col))| {
          let text = truncate(&text, col.width as usize);
          let style = match status_idx {
            Some(idx) if idx == i && !self.query.is_placeholder() => {
              Style::default().fg(status_color(&text))
            }
            _ => base,
          };
          Cell::from(text).style(style)
        });
        Row::new(cells)
      })
      .collect();

    let widths: Vec<Constraint> = columns.iter().map(|c| Constraint::Length(c.width)).collect();

    let table = Table::new(rows, widths)
      .header(header)
      .block(block)
      .row_highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut self.table_state);
  }

  // Key handling helpers for or_else chain pattern
  fn handle_overlays(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.confirm.handle_key(key) {
      KeyResult::Handled => return Some(ViewAction::None),
      KeyResult::Event(ConfirmEvent::Confirmed) => {
        if let Some(record) = self.pending_delete.take() {
          self.start_delete(record);
        }
        return Some(ViewAction::None);
      }
      KeyResult::Event(ConfirmEvent::Cancelled) => {
        self.pending_delete = None;
        return Some(ViewAction::None);
      }
      KeyResult::NotHandled => {}
    }

    match self.search.handle_key(key) {
      KeyResult::Handled => Some(ViewAction::None),
      KeyResult::Event(SearchEvent::Submitted(text)) => {
        self.apply_search(&text);
        Some(ViewAction::None)
      }
      KeyResult::Event(SearchEvent::Cancelled) => Some(ViewAction::None),
      KeyResult::NotHandled => None,
    }
  }

  fn handle_navigation(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.table_state.select_next();
        Some(ViewAction::None)
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.table_state.select_previous();
        Some(ViewAction::None)
      }
      KeyCode::Char('n') | KeyCode::Right => {
        if self.request.page < self.total_pages() {
          self.go_to_page(self.request.page + 1);
        }
        Some(ViewAction::None)
      }
      KeyCode::Char('p') | KeyCode::Left => {
        self.go_to_page(self.request.page.saturating_sub(1));
        Some(ViewAction::None)
      }
      _ => None,
    }
  }

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('/') => {
        let current = self.request.filter.describe();
        self.search.activate(&current);
        Some(ViewAction::None)
      }
      KeyCode::Char('r') => {
        self.reload(true);
        Some(ViewAction::None)
      }
      KeyCode::Char('a') => Some(ViewAction::Push(Box::new(FormView::<R>::create(
        self.services.clone(),
      )))),
      KeyCode::Char('e') | KeyCode::Enter => {
        let record = self.selected()?.clone();
        Some(ViewAction::Push(Box::new(FormView::edit(
          self.services.clone(),
          record,
        ))))
      }
      KeyCode::Char('d') => {
        let record = self.selected()?.clone();
        if !self.delete.is_pending() {
          self.confirm.show(format!(
            "Delete {} {}?",
            R::KIND.noun(),
            record.display_name()
          ));
          self.pending_delete = Some(record);
        }
        Some(ViewAction::None)
      }
      KeyCode::Char('q') | KeyCode::Esc => Some(ViewAction::Pop),
      _ => None,
    }
  }
}

impl<R: Managed> View for ListView<R> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_overlays(key)
      .or_else(|| self.handle_navigation(key))
      .or_else(|| self.handle_actions(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_table(frame, area);
    self.search.render_overlay(frame, area);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    R::KIND.title().to_string()
  }

  fn tick(&mut self) -> ViewAction {
    if self.query.poll() {
      // A delete or a narrower filter can leave us past the last page
      let pages = self.total_pages();
      if pages > 0 && self.request.page > pages {
        self.go_to_page(pages);
      }
    }

    match self.delete.poll() {
      Some(MutationState::Success(message)) => {
        self.services.notifier().success(&message);
        self.reload(false);
      }
      Some(MutationState::Error(e)) => self.services.notifier().error(&e),
      _ => {}
    }
    ViewAction::None
  }

  fn captures_input(&self) -> bool {
    self.search.is_active() || self.confirm.is_active()
  }

  fn on_resume(&mut self) {
    // A form above may have written; the cache decides whether this hits the server
    self.reload(false);
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "search").with_priority(20),
      ShortcutInfo::new("n/p", "page").with_priority(30),
      ShortcutInfo::new("a", "add").with_priority(40),
      ShortcutInfo::new("e", "edit").with_priority(50),
      ShortcutInfo::new("d", "delete").with_priority(60),
      ShortcutInfo::new("r", "refresh").with_priority(70),
    ]
  }
}

/// The list view for `kind`
pub fn list_view(kind: ResourceKind, services: Arc<Services>) -> Box<dyn View> {
  match kind {
    ResourceKind::School => Box::new(ListView::<School>::new(services)),
    ResourceKind::Student => Box::new(ListView::<Student>::new(services)),
    ResourceKind::Teacher => Box::new(ListView::<Teacher>::new(services)),
    ResourceKind::Subject => Box::new(ListView::<Subject>::new(services)),
    ResourceKind::SubjectClass => Box::new(ListView::<SubjectClass>::new(services)),
    ResourceKind::RegisterClass => Box::new(ListView::<RegisterClass>::new(services)),
  }
}
