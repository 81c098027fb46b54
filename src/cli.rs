//! Non-interactive subcommands: one request, printed as a table or JSON.

use clap::Subcommand;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::api::{
  ListFilter, PageRequest, Record, RegisterClass, Resource, ResourceKind, School, Student,
  Subject, SubjectClass, Teacher,
};
use crate::services::{Managed, Services};
use crate::ui::renderfns::truncate;

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
  /// Print one page of a collection
  List {
    kind: ResourceKind,
    #[arg(long, default_value_t = 1)]
    page: u32,
    /// Defaults to `page_size` from the config
    #[arg(long)]
    page_size: Option<u32>,
    /// Narrow the list, e.g. `--filter fullName=Ann` (repeatable)
    #[arg(short, long = "filter", value_name = "KEY=VALUE")]
    filters: Vec<String>,
    #[arg(long)]
    json: bool,
  },
  /// Print one record
  Get {
    kind: ResourceKind,
    id: String,
    #[arg(long)]
    json: bool,
  },
  /// Create a record from a JSON draft
  Add {
    kind: ResourceKind,
    /// JSON file, or `-` for stdin
    #[arg(short, long, value_name = "PATH")]
    data: PathBuf,
    #[arg(long)]
    json: bool,
  },
  /// Replace a record's fields from a JSON draft
  Update {
    kind: ResourceKind,
    id: String,
    /// JSON file, or `-` for stdin
    #[arg(short, long, value_name = "PATH")]
    data: PathBuf,
    #[arg(long)]
    json: bool,
  },
  /// Delete a record
  Delete { kind: ResourceKind, id: String },
}

impl CliCommand {
  pub fn kind(&self) -> ResourceKind {
    match self {
      CliCommand::List { kind, .. }
      | CliCommand::Get { kind, .. }
      | CliCommand::Add { kind, .. }
      | CliCommand::Update { kind, .. }
      | CliCommand::Delete { kind, .. } => *kind,
    }
  }
}

/// Run `command`, printing its result to stdout.
pub async fn run(command: &CliCommand, services: &Services) -> Result<()> {
  match command.kind() {
    ResourceKind::School => run_for::<School>(command, services).await,
    ResourceKind::Student => run_for::<Student>(command, services).await,
    ResourceKind::Teacher => run_for::<Teacher>(command, services).await,
    ResourceKind::Subject => run_for::<Subject>(command, services).await,
    ResourceKind::SubjectClass => run_for::<SubjectClass>(command, services).await,
    ResourceKind::RegisterClass => run_for::<RegisterClass>(command, services).await,
  }
}

async fn run_for<R: Managed>(command: &CliCommand, services: &Services) -> Result<()> {
  let client = R::client(services);
  let noun = R::KIND.noun();

  match command {
    CliCommand::List {
      page,
      page_size,
      filters,
      json,
      ..
    } => {
      let mut filter = R::Filter::default();
      for pair in filters {
        filter.apply_pair(pair)?;
      }
      let req = PageRequest::new(*page, page_size.unwrap_or(client.default_page_size()))
        .with_filter(filter);
      let result = client.list(&req, None).await?;

      if *json {
        print_json(&result)?;
      } else {
        print!("{}", render_table::<R>(&result.items));
        println!(
          "{} {} total, page {}/{}",
          result.count,
          R::KIND.title().to_lowercase(),
          req.page,
          result.total_pages(req.page_size).max(1)
        );
      }
    }
    CliCommand::Get { id, json, .. } => {
      let record = client.get_one(id).await?;
      if *json {
        print_json(&record)?;
      } else {
        print!("{}", render_record(&record));
      }
    }
    CliCommand::Add { data, json, .. } => {
      let draft: R = read_draft(data)?;
      let created = client
        .add(&draft)
        .await
        .ok_or_else(|| eyre!("{} was not added", noun))?;
      info!(id = %created.id, "added {}", noun);
      print_written(&created, *json)?;
    }
    CliCommand::Update { id, data, json, .. } => {
      let draft: R = read_draft(data)?;
      let updated = client
        .update(&Record::new(id.clone(), draft))
        .await
        .ok_or_else(|| eyre!("{} {} was not updated", noun, id))?;
      print_written(&updated, *json)?;
    }
    CliCommand::Delete { id, .. } => {
      client.delete(id).await?;
      services
        .notifier()
        .success(&format!("Deleted {} {}", noun, id));
    }
  }

  Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn print_written<R: Resource>(record: &Record<R>, json: bool) -> Result<()> {
  if json {
    print_json(record)
  } else {
    print!("{}", render_record(record));
    Ok(())
  }
}

/// The draft in `path`, or on stdin for `-`.
fn read_draft<R: Resource>(path: &Path) -> Result<R> {
  let text = if path == Path::new("-") {
    let mut text = String::new();
    std::io::stdin()
      .read_to_string(&mut text)
      .wrap_err("Failed to read draft from stdin")?;
    text
  } else {
    std::fs::read_to_string(path)
      .wrap_err_with(|| format!("Failed to read draft {}", path.display()))?
  };

  serde_json::from_str(&text)
    .wrap_err_with(|| format!("Draft is not a valid {}", R::KIND.noun()))
}

/// Fixed-width table: id plus the resource's columns.
pub fn render_table<R: Resource>(records: &[Record<R>]) -> String {
  let id_width = records
    .iter()
    .map(|r| r.id.chars().count())
    .max()
    .unwrap_or(0)
    .max(2);

  let mut out = format!("{:<width$}", "ID", width = id_width);
  for col in R::columns() {
    out.push_str(&format!("  {:<width$}", col.title, width = col.width as usize));
  }
  out = out.trim_end().to_string();
  out.push('\n');

  for record in records {
    let mut line = format!("{:<width$}", record.id, width = id_width);
    for (cell, col) in record.row().iter().zip(R::columns()) {
      let width = col.width as usize;
      line.push_str(&format!("  {:<width$}", truncate(cell, width), width = width));
    }
    out.push_str(line.trim_end());
    out.push('\n');
  }
  out
}

/// `Label: value` lines for one record.
pub fn render_record<R: Resource>(record: &Record<R>) -> String {
  let label_width = R::columns()
    .iter()
    .map(|c| c.title.len())
    .max()
    .unwrap_or(0)
    .max(2);

  let mut out = format!("{:>width$}: {}\n", "ID", record.id, width = label_width);
  for (cell, col) in record.row().iter().zip(R::columns()) {
    out.push_str(&format!("{:>width$}: {}\n", col.title, cell, width = label_width));
  }
  out
}
