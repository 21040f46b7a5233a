use clap::{Parser, Subcommand};
use color_eyre::{
  eyre::{eyre, WrapErr},
  Result,
};
use std::path::PathBuf;

use ledgersync::api::HttpApi;
use ledgersync::app::App;
use ledgersync::cache::{CacheStore, SqliteStore};
use ledgersync::config::Config;
use ledgersync::logging;
use ledgersync::sync::{ConnectivityFlag, DrainOutcome, DrainReport, SyncCoordinator};

#[derive(Parser, Debug)]
#[command(name = "ledgersync")]
#[command(about = "Offline cache and sync queue for the ledger ERP client")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/ledgersync/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Backend URL, overrides the config file
  #[arg(long)]
  api_url: Option<String>,

  /// Treat the network as unavailable (writes stay queued)
  #[arg(long)]
  offline: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Replace the local cache with the server's data
  Pull,
  /// Submit queued mutations
  Sync,
  /// Show sync status, pending entries and collection sizes
  Status,
  /// Save a record (JSON object) and queue it
  Put { collection: String, json: String },
  /// Delete a record and queue the deletion
  Delete { collection: String, id: String },
  /// Print every cached record of a collection
  List { collection: String },
  /// Print cached account balances
  Balances,
  /// Wipe the local cache, including unsynced changes
  Reset {
    /// Confirm that pending changes may be lost
    #[arg(long)]
    yes: bool,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = Config::load(args.config.as_deref())?;

  // Override API url if specified on command line
  if let Some(url) = args.api_url {
    config.api.url = url;
  }

  let _log_guard = match Config::log_dir() {
    Some(dir) => Some(logging::init(&dir)?),
    None => None,
  };

  let store = SqliteStore::new(config.cache.database_path()?);
  store
    .init()
    .wrap_err("Local cache is unavailable, cannot continue")?;

  let api = HttpApi::new(&config)?;
  let connectivity = ConnectivityFlag::new(!args.offline);
  let sync =
    SyncCoordinator::new(store, api, connectivity).with_auto_flush(config.sync.auto_flush);
  let app = App::new(sync);

  match args.command {
    Command::Pull => {
      let report = app.pull().await?;
      println!(
        "Pulled {} records into {} collections",
        report.records, report.collections
      );
    }
    Command::Sync => print_drain(&app.sync().await),
    Command::Status => {
      let summary = app.status();
      println!("Status: {}", summary.status);
      println!("Pending: {}", summary.pending.len());
      for entry in &summary.pending {
        println!(
          "  {} {} {}/{}",
          entry.timestamp, entry.action, entry.store, entry.id
        );
      }
      for (collection, count) in &summary.counts {
        println!("{:<24}{}", collection, count);
      }
    }
    Command::Put { collection, json } => {
      let (record, report) = app.save(&collection, &json).await?;
      println!("Saved {}/{}", collection, record["id"]);
      print_drain(&report);
    }
    Command::Delete { collection, id } => {
      let report = app.remove(&collection, &id).await?;
      println!("Deleted {}/{}", collection, id);
      print_drain(&report);
    }
    Command::List { collection } => {
      for record in app.list(&collection) {
        println!("{}", record);
      }
    }
    Command::Balances => {
      let balances = app.balances();
      for account in &balances.accounts {
        println!(
          "{:<32}{:>14.2} {}",
          account.name,
          account.balance,
          account.currency.as_deref().unwrap_or("")
        );
      }
      println!("{:<32}{:>14.2}", "Total", balances.total);
    }
    Command::Reset { yes } => {
      if !yes {
        return Err(eyre!("Refusing to wipe the cache without --yes"));
      }
      app.reset()?;
      println!("Local cache cleared");
    }
  }

  Ok(())
}

fn print_drain(report: &DrainReport) {
  match &report.outcome {
    DrainOutcome::Offline => println!("Offline: {} changes waiting", report.remaining),
    DrainOutcome::Empty => println!("Nothing to sync"),
    DrainOutcome::Completed => println!(
      "Synced {} changes, {} pending",
      report.submitted, report.remaining
    ),
    DrainOutcome::Blocked { entry_id, reason } => println!(
      "Sync stopped at {} after {} changes ({}), {} pending",
      entry_id, report.submitted, reason, report.remaining
    ),
  }
}
