mod config;
mod entry;
mod photos;
mod remote;
mod store;
mod sync;
mod ui;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::{Parser, Subcommand};
use color_eyre::Result;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use config::AppConfig;
use entry::JournalEntry;
use remote::{HttpRemoteStore, RemoteStore};
use store::JournalStore;
use sync::SyncBridge;
use ui::{Action, UI};

#[derive(Debug, Parser)]
#[command(
    name = "daybook",
    version,
    about = "A personal journal with optional record-store sync"
)]
struct Cli {
    /// Path to the config file.
    #[arg(long, default_value = "daybook.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Upload every unsynced entry to the remote record store.
    Sync,
    /// Ask the remote store what records exist; nothing is merged locally.
    Pull,
    /// Delete the local journal and its photos, and with --remote also every
    /// remote record owned by this user.
    Reset {
        #[arg(long)]
        remote: bool,
        #[arg(long)]
        yes: bool,
    },
    /// Print the location of the journal file.
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config)?;
    let data_dir = config.data_dir();
    fs::create_dir_all(&data_dir)?;
    let _log_guard = init_logging(&data_dir, &config.telemetry.log_level);

    let mut store = JournalStore::load(&data_dir)?;
    let bridge = config
        .remote
        .enabled
        .then(|| SyncBridge::new(HttpRemoteStore::new(&config.remote.base_url)));

    match cli.command {
        Some(Commands::Sync) => match &bridge {
            Some(bridge) => {
                let report = bridge.push_unsynced(&store).await;
                println!(
                    "uploaded {}/{} entries ({} failed)",
                    report.uploaded, report.attempted, report.failed
                );
            }
            None => println!("remote sync is disabled; enable [remote] in daybook.toml"),
        },
        Some(Commands::Pull) => match &bridge {
            Some(bridge) => {
                let count = bridge.pull_all().await;
                println!("{count} records available remotely");
            }
            None => println!("remote sync is disabled; enable [remote] in daybook.toml"),
        },
        Some(Commands::Reset { remote, yes }) => {
            if !yes {
                println!("refusing to reset without --yes");
            } else if remote {
                match &bridge {
                    Some(bridge) => {
                        let owner = if config.remote.owner.is_empty() {
                            bridge.user_record_id().await.ok()
                        } else {
                            Some(config.remote.owner.clone())
                        };
                        match owner {
                            Some(owner) => {
                                let deleted =
                                    bridge.delete_all_remote(&owner, Some(&mut store)).await;
                                println!(
                                    "deleted {deleted} remote records and the local journal"
                                );
                            }
                            None => {
                                error!("could not resolve the remote owner identity");
                                println!("could not resolve the remote owner; nothing deleted");
                            }
                        }
                    }
                    None => println!("remote sync is disabled; nothing deleted"),
                }
            } else {
                store.delete_all();
                println!("local journal deleted");
            }
        }
        Some(Commands::Path) => println!("{}", store.journal_path().display()),
        None => run_tui(&mut store, bridge.as_ref()).await?,
    }

    Ok(())
}

async fn run_tui<R: RemoteStore>(
    store: &mut JournalStore,
    bridge: Option<&SyncBridge<R>>,
) -> Result<()> {
    if let Some(bridge) = bridge {
        bridge.register_subscription().await;
    }

    let mut ui = UI::new()?;

    loop {
        ui.display(store)?;

        if let Some(action) = ui.handle_input(store)? {
            match action {
                Action::Write => {
                    let draft = ui.get_new_entry()?;
                    let id = Uuid::new_v4();
                    let note = {
                        let trimmed = draft.note.trim();
                        (!trimmed.is_empty()).then(|| draft.note.clone())
                    };
                    let mut entry = JournalEntry::new(id, note, draft.date);
                    if let Some(src) = &draft.photo_path {
                        match photos::import_photo(src, store.data_dir(), id) {
                            Ok(name) => entry.image_path = Some(name),
                            Err(err) => {
                                warn!(path = %src.display(), error = %err, "photo not attached");
                            }
                        }
                    }
                    if !draft.tags.is_empty() {
                        entry.tags = Some(draft.tags.clone());
                    }
                    if let Some((latitude, longitude)) = draft.coords {
                        entry.latitude = Some(latitude);
                        entry.longitude = Some(longitude);
                    }

                    store.append(entry);
                    store.save()?;
                    if let Some(bridge) = bridge {
                        bridge.push_unsynced(store).await;
                    }
                }
                Action::View => ui.view_entries(store)?,
                Action::Search => {
                    let query = ui.get_search_query()?;
                    if !query.is_empty() {
                        let results = store.search(&query);
                        ui.browse_entries("Search Results", &results)?;
                    }
                }
                Action::OnThisDay => {
                    let results = store.entries_on_day(Local::now().date_naive());
                    ui.browse_entries("On This Day", &results)?;
                }
                Action::Sync => match bridge {
                    Some(bridge) => {
                        let report = bridge.push_unsynced(store).await;
                        ui.show_message(
                            "Sync",
                            &format!(
                                "Uploaded {}/{} entries ({} failed)",
                                report.uploaded, report.attempted, report.failed
                            ),
                        )?;
                    }
                    None => ui.show_message(
                        "Sync",
                        "Remote sync is disabled. Enable [remote] in daybook.toml.",
                    )?,
                },
                Action::Pull => match bridge {
                    Some(bridge) => {
                        let count = bridge.pull_all().await;
                        ui.show_message("Pull", &format!("{count} records available remotely"))?;
                    }
                    None => ui.show_message(
                        "Pull",
                        "Remote sync is disabled. Enable [remote] in daybook.toml.",
                    )?,
                },
                Action::Quit => break,
            }
        }
    }

    Ok(())
}

/// Log to a file inside the data directory so the terminal stays free for
/// the UI. `RUST_LOG` overrides the configured level.
fn init_logging(data_dir: &Path, level: &str) -> tracing_appender::non_blocking::WorkerGuard {
    let appender = tracing_appender::rolling::never(data_dir, "daybook.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    guard
}
