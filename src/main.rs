mod app;
mod assets;
mod cli;
mod config;
mod contacts;
mod db;
mod event;
mod logging;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "contactbook")]
#[command(about = "A terminal contact manager with an offline asset cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/contactbook/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Run one command and exit instead of starting the UI
  #[command(subcommand)]
  command: Option<cli::Command>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Flushed on drop, so it lives until main returns
  let _log_guard = logging::init(&config::Config::data_dir()?)?;

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  match args.command {
    Some(command) => {
      let mut stdout = std::io::stdout().lock();
      cli::run(command, &config, &mut stdout).await?;
    }
    None => {
      let mut app = app::App::new(config);
      app.run().await?;
    }
  }

  Ok(())
}
