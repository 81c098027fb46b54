use crate::api::{Record, ResourceKind};
use crate::forms::{self, FieldKind, FormError, FormField, FormValues};
use crate::query::{Mutation, MutationState, Query};
use crate::services::{Managed, Services};
use crate::ui::components::{InputResult, KeyResult, OptionPicker, PickerEvent, TextInput};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use std::collections::BTreeMap;
use std::sync::Arc;

const LABEL_WIDTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
  Create,
  Edit { id: String },
}

/// Dropdown options of one reference field
struct ReferenceOptions {
  field: &'static str,
  query: Query<Vec<(String, String)>>,
}

impl ReferenceOptions {
  fn new(field: &'static str, kind: ResourceKind, services: Arc<Services>) -> Self {
    let mut query = Query::new(move |_| {
      let services = services.clone();
      async move {
        services
          .reference_options(kind)
          .await
          .map_err(|e| e.user_message())
      }
    });
    query.fetch();
    Self { field, query }
  }

  fn label_of(&self, id: &str) -> Option<&str> {
    self
      .query
      .data()?
      .iter()
      .find(|(value, _)| value == id)
      .map(|(_, label)| label.as_str())
  }
}

/// Add or edit one record of `R`
pub struct FormView<R: Managed> {
  services: Arc<Services>,
  mode: Mode,
  /// Fresh copy of the record being edited
  detail: Query<Record<R>>,
  inputs: Vec<TextInput>,
  focus: usize,
  /// Set once the user types, so a late detail load doesn't overwrite edits
  dirty: bool,
  errors: BTreeMap<&'static str, FormError>,
  picker: OptionPicker,
  references: Vec<ReferenceOptions>,
  submit: Mutation<Option<Record<R>>>,
}

impl<R: Managed> FormView<R> {
  pub fn create(services: Arc<Services>) -> Self {
    Self::build(services, Mode::Create, forms::blank_values::<R>())
  }

  /// Edit `record`, prefilled from the list row while a fresh copy loads
  pub fn edit(services: Arc<Services>, record: Record<R>) -> Self {
    let values = forms::values_from_resource(&record.fields);
    Self::build(services, Mode::Edit { id: record.id }, values)
  }

  fn build(services: Arc<Services>, mode: Mode, values: FormValues) -> Self {
    let detail_id = match &mode {
      Mode::Edit { id } => Some(id.clone()),
      Mode::Create => None,
    };
    let client = R::client(&services).clone();
    let mut detail = Query::new(move |_| {
      let client = client.clone();
      let id = detail_id.clone().unwrap_or_default();
      async move { client.get_one(&id).await.map_err(|e| e.user_message()) }
    })
    .with_enabled(matches!(mode, Mode::Edit { .. }));
    detail.fetch();

    let references = R::form_fields()
      .iter()
      .filter_map(|field| match field.kind {
        FieldKind::Reference(kind) => Some(ReferenceOptions::new(field.name, kind, services.clone())),
        _ => None,
      })
      .collect();

    let mut view = Self {
      services,
      mode,
      detail,
      inputs: R::form_fields().iter().map(|_| TextInput::new()).collect(),
      focus: 0,
      dirty: false,
      errors: BTreeMap::new(),
      picker: OptionPicker::new(),
      references,
      submit: Mutation::new(),
    };
    view.set_values(&values);
    view
  }

  fn fields() -> &'static [FormField] {
    R::form_fields()
  }

  fn values(&self) -> FormValues {
    Self::fields()
      .iter()
      .zip(&self.inputs)
      .map(|(field, input)| (field.name, input.value().to_string()))
      .collect()
  }

  fn set_values(&mut self, values: &FormValues) {
    for (field, input) in Self::fields().iter().zip(self.inputs.iter_mut()) {
      input.set_value(values.get(field.name).cloned().unwrap_or_default());
    }
  }

  fn focused_field(&self) -> Option<&'static FormField> {
    Self::fields().get(self.focus)
  }

  fn move_focus(&mut self, forward: bool) {
    let len = self.inputs.len();
    if len == 0 {
      return;
    }
    self.focus = if forward {
      (self.focus + 1) % len
    } else {
      (self.focus + len - 1) % len
    };
  }

  fn references_for(&self, field: &str) -> Option<&ReferenceOptions> {
    self.references.iter().find(|r| r.field == field)
  }

  /// Options for a pick-from-list field, `None` for free text
  fn options_for(&self, field: &FormField) -> Option<Vec<(String, String)>> {
    match field.kind {
      FieldKind::Reference(kind) => {
        let refs = self.references_for(field.name)?;
        if let Some(error) = refs.query.error() {
          self.services.notifier().error(&format!(
            "Could not load {}: {}",
            kind.title().to_lowercase(),
            error
          ));
          return None;
        }
        refs.query.data().cloned()
      }
      kind => kind.fixed_options(),
    }
  }

  fn open_picker(&mut self) -> bool {
    let Some(field) = self.focused_field() else {
      return false;
    };
    let Some(options) = self.options_for(field) else {
      return false;
    };
    let current = self.inputs[self.focus].value().to_string();
    self.picker.show(field.label, options, &current);
    true
  }

  fn edited(&mut self, field: &FormField) {
    self.dirty = true;
    self.errors.remove(field.name);
  }

  fn submit(&mut self) {
    if self.submit.is_pending() {
      return;
    }

    let values = self.values();
    self.errors = forms::validate(Self::fields(), &values);
    if let Some(first) = Self::fields()
      .iter()
      .position(|f| self.errors.contains_key(f.name))
    {
      self.focus = first;
      return;
    }

    let draft: R = match forms::draft_from_values(&values) {
      Ok(draft) => draft,
      Err(e) => {
        self.services.notifier().error(&e.to_string());
        return;
      }
    };

    let client = R::client(&self.services).clone();
    match &self.mode {
      Mode::Create => self.submit.start(async move { Ok(client.add(&draft).await) }),
      Mode::Edit { id } => {
        let record = Record::new(id.clone(), draft);
        self.submit.start(async move { Ok(client.update(&record).await) })
      }
    }
  }

  fn title(&self) -> String {
    let noun = R::KIND.noun();
    let action = match &self.mode {
      Mode::Create => format!("Add {}", noun),
      Mode::Edit { .. } => match self.detail.data() {
        Some(record) => format!("Edit {} {}", noun, record.display_name()),
        None => format!("Edit {}", noun),
      },
    };
    if self.submit.is_pending() {
      format!(" {} (saving...) ", action)
    } else if self.detail.is_loading() {
      format!(" {} (loading...) ", action)
    } else {
      format!(" {} ", action)
    }
  }

  /// Input text plus a readable label for coded values
  fn display_value(&self, field: &FormField, value: &str) -> Option<String> {
    if value.is_empty() {
      return None;
    }
    match field.kind {
      FieldKind::Reference(_) => self
        .references_for(field.name)
        .and_then(|r| r.label_of(value))
        .map(str::to_string),
      kind => kind
        .fixed_options()?
        .into_iter()
        .find(|(v, _)| v == value)
        .map(|(_, label)| label),
    }
  }

  fn field_lines(&self) -> (Vec<Line<'_>>, usize) {
    let mut lines = Vec::new();
    let mut focus_line = 0;

    for (i, (field, input)) in Self::fields().iter().zip(&self.inputs).enumerate() {
      let focused = i == self.focus;
      if focused {
        focus_line = lines.len();
      }

      let marker = if field.required { "*" } else { " " };
      let label_style = if focused {
        Style::default().fg(Color::Yellow).bold()
      } else {
        Style::default().fg(Color::Cyan)
      };
      let mut spans = vec![
        Span::styled(
          format!("{:>width$}{} ", field.label, marker, width = LABEL_WIDTH),
          label_style,
        ),
      ];

      if focused {
        let (before, after) = input.split_at_cursor();
        spans.push(Span::raw(before.to_string()));
        spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(after.to_string()));
      } else {
        spans.push(Span::raw(input.value().to_string()));
      }

      if let Some(label) = self.display_value(field, input.value()) {
        spans.push(Span::styled(
          format!("  ({})", label),
          Style::default().fg(Color::DarkGray),
        ));
      }
      let pickable =
        field.kind.fixed_options().is_some() || matches!(field.kind, FieldKind::Reference(_));
      if focused && pickable {
        spans.push(Span::styled(
          "  <enter> choose",
          Style::default().fg(Color::DarkGray),
        ));
      }
      lines.push(Line::from(spans));

      if let Some(error) = self.errors.get(field.name) {
        lines.push(Line::from(Span::styled(
          format!("{:>width$}  {}", "", error, width = LABEL_WIDTH),
          Style::default().fg(Color::Red),
        )));
      }
    }

    (lines, focus_line)
  }
}

impl<R: Managed> View for FormView<R> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.picker.handle_key(key) {
      KeyResult::Handled | KeyResult::Event(PickerEvent::Cancelled) => return ViewAction::None,
      KeyResult::Event(PickerEvent::Selected(value)) => {
        if let Some(field) = self.focused_field() {
          self.inputs[self.focus].set_value(value);
          self.edited(field);
          self.move_focus(true);
        }
        return ViewAction::None;
      }
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.submit();
        ViewAction::None
      }
      KeyCode::Esc => ViewAction::Pop,
      KeyCode::Tab | KeyCode::Down => {
        self.move_focus(true);
        ViewAction::None
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.move_focus(false);
        ViewAction::None
      }
      KeyCode::Enter => {
        if !self.open_picker() {
          self.move_focus(true);
        }
        ViewAction::None
      }
      _ => {
        let Some(field) = self.focused_field() else {
          return ViewAction::None;
        };
        if self.inputs[self.focus].handle_key(key) == InputResult::Consumed {
          self.edited(field);
        }
        ViewAction::None
      }
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(self.title())
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let (lines, focus_line) = self.field_lines();
    // Keep the focused field on screen
    let offset = focus_line.saturating_sub(inner.height.saturating_sub(2) as usize) as u16;
    frame.render_widget(Paragraph::new(lines).scroll((offset, 0)), inner);

    self.picker.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    match &self.mode {
      Mode::Create => format!("Add {}", R::KIND.noun()),
      Mode::Edit { id } => format!("Edit {}", id),
    }
  }

  fn context(&self) -> String {
    R::KIND.title().to_string()
  }

  fn tick(&mut self) -> ViewAction {
    if self.detail.poll() {
      if let Some(error) = self.detail.error() {
        self.services.notifier().error(error);
      } else if !self.dirty {
        if let Some(record) = self.detail.data() {
          let values = forms::values_from_resource(&record.fields);
          self.set_values(&values);
        }
      }
    }

    for refs in &mut self.references {
      refs.query.poll();
    }

    match self.submit.poll() {
      Some(MutationState::Success(Some(_))) => match self.mode {
        Mode::Create => {
          self.set_values(&forms::blank_values::<R>());
          self.errors.clear();
          self.dirty = false;
          self.focus = 0;
        }
        Mode::Edit { .. } => return ViewAction::Pop,
      },
      // Failure was already reported; keep what the user typed
      Some(MutationState::Success(None)) => {}
      Some(MutationState::Error(e)) => self.services.notifier().error(&e),
      _ => {}
    }
    ViewAction::None
  }

  fn captures_input(&self) -> bool {
    true
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("ctrl-s", "save").with_priority(10),
      ShortcutInfo::new("tab", "next field").with_priority(20),
      ShortcutInfo::new("enter", "choose").with_priority(30),
      ShortcutInfo::new("esc", "back").with_priority(90),
    ]
  }
}
