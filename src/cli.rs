//! One-shot subcommands over the same stores the TUI uses.

use clap::{Args, Subcommand};
use color_eyre::{eyre::eyre, Report, Result};
use std::io::Write;
use std::path::PathBuf;

use crate::assets::{HttpFetcher, OfflineCache, ServedFrom, SqliteAssetStorage};
use crate::config::{normalize_path, Config};
use crate::contacts::{ActionError, ContactBook, ContactFields, Screen};
use crate::db::{UserRecord, UserStore};

#[derive(Subcommand, Debug)]
pub enum Command {
  #[command(flatten)]
  Contacts(ContactCommand),
  /// Manage the offline asset cache
  #[command(subcommand)]
  Assets(AssetCommand),
}

#[derive(Subcommand, Debug)]
pub enum ContactCommand {
  /// List every stored contact in insertion order
  List {
    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
  },
  /// Print the number of stored contacts
  Count,
  /// Show one contact
  Show { id: String },
  /// Add a contact with a fresh id
  Add(ContactArgs),
  /// Replace every field of an existing contact
  Update {
    id: String,
    #[command(flatten)]
    contact: ContactArgs,
  },
  /// Delete a contact (no error if it does not exist)
  Delete { id: String },
}

#[derive(Args, Debug)]
pub struct ContactArgs {
  #[arg(long)]
  pub firstname: String,
  #[arg(long)]
  pub lastname: String,
  #[arg(long)]
  pub email: String,
  #[arg(long)]
  pub phone: String,
}

impl From<ContactArgs> for ContactFields {
  fn from(args: ContactArgs) -> Self {
    ContactFields::new(args.firstname, args.lastname, args.email, args.phone)
  }
}

#[derive(Subcommand, Debug)]
pub enum AssetCommand {
  /// Fetch every manifest path into the current cache generation
  Install,
  /// Make the current generation active and evict the others
  Activate,
  /// Install, then activate
  Sync,
  /// Fetch one path, network first, falling back to the cache
  Get {
    path: String,
    /// Write the body here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
  },
  /// Show the cache generations and lifecycle state
  Status,
}

pub async fn run(command: Command, config: &Config, out: &mut impl Write) -> Result<()> {
  match command {
    Command::Assets(cmd) => run_assets(cmd, config, out).await,
    Command::Contacts(cmd) => {
      let store = UserStore::open(config.store_path()?, config.store.version).await?;
      run_contacts(cmd, &ContactBook::new(store), out).await
    }
  }
}

/// Failed actions surface the same message the TUI would show.
fn action_failed(e: ActionError) -> Report {
  eyre!("{} ({})", e.notification().message, e)
}

async fn run_contacts(command: ContactCommand, book: &ContactBook, out: &mut impl Write) -> Result<()> {
  match command {
    ContactCommand::List { json } => match book.refresh().await.map_err(action_failed)? {
      Screen::Empty if !json => writeln!(out, "No contacts")?,
      Screen::Empty => writeln!(out, "[]")?,
      Screen::Table(rows) if json => writeln!(out, "{}", serde_json::to_string_pretty(&rows)?)?,
      Screen::Table(rows) => {
        writeln!(out, "{}", format_row("#", "ID", "FIRST", "LAST", "EMAIL", "PHONE"))?;
        for (i, r) in rows.iter().enumerate() {
          let n = (i + 1).to_string();
          writeln!(
            out,
            "{}",
            format_row(&n, &r.id, &r.firstname, &r.lastname, &r.email, &r.phone)
          )?;
        }
      }
    },
    ContactCommand::Count => {
      writeln!(out, "{}", book.count().await.map_err(action_failed)?)?;
    }
    ContactCommand::Show { id } => {
      let record = book
        .get(&id)
        .await
        .map_err(action_failed)?
        .ok_or_else(|| action_failed(ActionError::NotFound(id)))?;
      write_record(out, &record)?;
    }
    ContactCommand::Add(contact) => {
      let record = book.create(contact.into()).await.map_err(action_failed)?;
      writeln!(out, "User Added: {}", record.id)?;
    }
    ContactCommand::Update { id, contact } => {
      let record = book
        .update(&id, contact.into())
        .await
        .map_err(action_failed)?;
      writeln!(out, "User Updated: {}", record.id)?;
    }
    ContactCommand::Delete { id } => {
      book.delete(&id).await.map_err(action_failed)?;
      writeln!(out, "User Deleted: {}", id)?;
    }
  }
  Ok(())
}

fn format_row(n: &str, id: &str, first: &str, last: &str, email: &str, phone: &str) -> String {
  format!("{:<4} {:<36} {:<16} {:<16} {:<28} {}", n, id, first, last, email, phone)
}

fn write_record(out: &mut impl Write, record: &UserRecord) -> Result<()> {
  writeln!(out, "id:        {}", record.id)?;
  writeln!(out, "firstname: {}", record.firstname)?;
  writeln!(out, "lastname:  {}", record.lastname)?;
  writeln!(out, "email:     {}", record.email)?;
  writeln!(out, "phone:     {}", record.phone)?;
  Ok(())
}

fn open_cache(config: &Config) -> Result<OfflineCache<SqliteAssetStorage>> {
  let storage = SqliteAssetStorage::open(&config.asset_cache_path()?)?;
  Ok(OfflineCache::new(
    storage,
    config.assets.cache_name.clone(),
    config.assets.manifest.clone(),
  )?)
}

fn http_fetcher(config: &Config) -> Result<HttpFetcher> {
  HttpFetcher::new(config.assets.origin()?, config.assets.timeout())
}

async fn install(
  cache: &OfflineCache<SqliteAssetStorage>,
  http: &HttpFetcher,
  out: &mut impl Write,
) -> Result<()> {
  let count = cache
    .install(|path| {
      let http = http.clone();
      async move { http.get(&path).await }
    })
    .await?;
  writeln!(out, "Installed {} assets into {}", count, cache.generation())?;
  Ok(())
}

fn activate(cache: &OfflineCache<SqliteAssetStorage>, out: &mut impl Write) -> Result<()> {
  let evicted = cache.activate()?;
  writeln!(out, "Activated {}", cache.generation())?;
  for name in evicted {
    writeln!(out, "Evicted {}", name)?;
  }
  Ok(())
}

async fn run_assets(command: AssetCommand, config: &Config, out: &mut impl Write) -> Result<()> {
  let cache = open_cache(config)?;

  match command {
    AssetCommand::Install => install(&cache, &http_fetcher(config)?, out).await?,
    AssetCommand::Activate => activate(&cache, out)?,
    AssetCommand::Sync => {
      install(&cache, &http_fetcher(config)?, out).await?;
      activate(&cache, out)?;
    }
    AssetCommand::Get { path, output } => {
      let http = http_fetcher(config)?;
      let path = normalize_path(&path);
      let served = cache.fetch(&path, || http.get(&path)).await?;

      let source = match served.source {
        ServedFrom::Network => "network".to_string(),
        ServedFrom::Cache => match served.cached_at {
          Some(at) => format!("cache, stored {}", at.to_rfc3339()),
          None => "cache".to_string(),
        },
      };
      eprintln!("{} {} ({})", served.response.status, path, source);

      match output {
        Some(file) => std::fs::write(&file, &served.response.body)
          .map_err(|e| eyre!("Failed to write {}: {}", file.display(), e))?,
        None => out.write_all(&served.response.body)?,
      }
    }
    AssetCommand::Status => {
      let status = cache.status()?;
      writeln!(out, "generation: {} ({})", status.generation, status.state)?;
      writeln!(
        out,
        "active:     {}",
        status.active.as_deref().unwrap_or("none")
      )?;
      for (name, count) in status.generations {
        writeln!(out, "  {:<24} {} entries", name, count)?;
      }
    }
  }
  Ok(())
}
