use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;

use schooladm::api::ResourceKind;
use schooladm::cli::{self, CliCommand};
use schooladm::config::Config;
use schooladm::notify::StderrNotifier;
use schooladm::services::Services;
use schooladm::{app, logging};

#[derive(Parser, Debug)]
#[command(name = "schooladm")]
#[command(about = "A terminal console for schools, students, teachers and classes")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./schooladm.yaml, then $XDG_CONFIG_HOME/schooladm/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// REST API base URL, overriding the config file
  #[arg(long)]
  api_url: Option<String>,

  /// Collection the console opens on
  #[arg(short, long, value_enum, default_value = "student")]
  resource: ResourceKind,

  /// Run a single command instead of the console
  #[command(subcommand)]
  command: Option<CliCommand>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref(), args.api_url)?;

  // Flushes buffered log lines on drop
  let _log_guard = logging::init(&config)?;

  match args.command {
    Some(command) => {
      let services = Services::new(&config, Arc::new(StderrNotifier))?;
      cli::run(&command, &services).await
    }
    None => {
      let mut app = app::App::new(config, args.resource)?;
      app.run().await
    }
  }
}
