//! Tierkv CLI - inspect and maintain a two-tier namespaced store

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tierkv::config::{self, TierkvConfig};
use tierkv::ui::{self, Icons, TableBuilder};
use tierkv::{SetOptions, SqliteBackend, SqliteTable, StorageFacade, Tier};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "tierkv")]
#[command(version)]
#[command(about = "Namespaced, versioned, expiring key/value store over a durable and a session tier")]
#[command(long_about = r#"
Tierkv keeps application state in two SQLite-backed tiers:
  • durable: preferences, offline queue, long-lived values
  • session: caches and ephemeral overrides, wiped by `session reset`

Example usage:
  tierkv set currentSection '"courses"'
  tierkv set navigation_events '[1,2,3]' --session --ttl 3600
  tierkv pref set sidebarCollapsed true
  tierkv usage
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (defaults to ./tierkv.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a tierkv.toml with default settings
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Store a value (JSON, or a bare string)
    Set {
        key: String,
        value: String,

        /// Write to the session tier instead of the durable tier
        #[arg(long)]
        session: bool,

        /// Expire after this many seconds
        #[arg(long)]
        ttl: Option<u64>,

        /// Encode the payload regardless of size
        #[arg(long)]
        compress: bool,
    },

    /// Read a value
    Get {
        key: String,

        /// Tier to read; `any` checks session first, then durable
        #[arg(long, value_enum, default_value = "any")]
        tier: TierArg,
    },

    /// Remove a key from both tiers
    Remove { key: String },

    /// Manage user preferences
    Pref {
        #[command(subcommand)]
        action: PrefAction,
    },

    /// Manage cached session entries
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Inspect the offline queue
    Offline {
        #[command(subcommand)]
        action: OfflineAction,
    },

    /// Manage the session tier
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Show namespaced storage usage per tier
    Usage,

    /// Delete expired and corrupt entries
    Sweep,

    /// Export durable entries as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import durable entries from an export
    Import { file: PathBuf },

    /// Remove every namespaced entry from both tiers
    Clear,
}

#[derive(Subcommand)]
enum PrefAction {
    /// Set a preference (JSON, or a bare string)
    Set { name: String, value: String },
    /// Print one preference
    Get { name: String },
    /// Print all preferences
    List,
    /// Remove a preference
    Remove { name: String },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Clear cache entries, optionally only keys containing FILTER
    Clear {
        #[arg(short, long)]
        filter: Option<String>,
    },
}

#[derive(Subcommand)]
enum OfflineAction {
    /// List queued keys
    List,
    /// Drop the whole queue
    Clear,
}

#[derive(Subcommand)]
enum SessionAction {
    /// End the session: wipe the session tier, including foreign keys
    Reset,
}

#[derive(Clone, Copy, ValueEnum)]
enum TierArg {
    Any,
    Durable,
    Session,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = try_main(cli) {
        ui::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn try_main(cli: Cli) -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Init never reads the existing file, which may be malformed
    if let Commands::Init { force } = cli.command {
        let path = cli.config.unwrap_or_else(config::default_config_path);
        let config = TierkvConfig {
            database: Some(".tierkv/store.db".to_string()),
            ..TierkvConfig::default()
        };
        config::write_config(&path, &config, force)?;
        config::ensure_gitignore(Path::new("."))?;
        ui::success(&format!("Wrote {}", path.display()));
        return Ok(());
    }

    let settings = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    let database = cli
        .database
        .or_else(|| settings.database.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| config::default_database_path_in(Path::new(".")));
    config::ensure_db_dir(&database)?;

    if let Commands::Session { action: SessionAction::Reset } = cli.command {
        let removed = SqliteBackend::open(&database, SqliteTable::Session)?.truncate()?;
        ui::success(&format!("Session reset ({} keys removed)", removed));
        return Ok(());
    }

    tracing::debug!("Opening store at {:?}", database);
    let facade = StorageFacade::builder(
        SqliteBackend::open(&database, SqliteTable::Durable)?,
        SqliteBackend::open(&database, SqliteTable::Session)?,
    )
    .config(settings.facade)
    .build();

    run(&facade, cli.command, &database)
}

fn run(facade: &StorageFacade, command: Commands, database: &Path) -> anyhow::Result<()> {
    match command {
        Commands::Set { key, value, session, ttl, compress } => {
            let tier = if session { Tier::Ephemeral } else { Tier::Durable };
            let mut options = SetOptions::new();
            if let Some(secs) = ttl {
                options = options.expires_in(std::time::Duration::from_secs(secs));
            }
            if compress {
                options = options.force_compress();
            }

            if facade.set(tier, &key, &parse_value(value), options)? {
                ui::success(&format!("Stored {} ({})", key, tier));
            } else {
                anyhow::bail!("write of {} to the {} tier was rejected", key, tier);
            }
        }

        Commands::Get { key, tier } => {
            let found: Option<Value> = match tier {
                TierArg::Any => facade.get(&key, None),
                TierArg::Durable => facade.get_durable(&key, None),
                TierArg::Session => facade.get_ephemeral(&key, None),
            };
            match found {
                Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                None => ui::warn(&format!("{} not found", key)),
            }
        }

        Commands::Remove { key } => {
            if facade.remove(&key) {
                ui::success(&format!("Removed {}", key));
            } else {
                ui::warn(&format!("{} not found", key));
            }
        }

        Commands::Pref { action } => match action {
            PrefAction::Set { name, value } => {
                if !facade.set_preference(&name, &parse_value(value))? {
                    anyhow::bail!("failed to store preference {}", name);
                }
                ui::success(&format!("Preference {} saved", name));
            }
            PrefAction::Get { name } => match facade.get_preference::<Option<Value>>(&name, None) {
                Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                None => ui::warn(&format!("preference {} not set", name)),
            },
            PrefAction::List => {
                let preferences = facade.get_all_preferences();
                println!("{}", serde_json::to_string_pretty(&preferences)?);
            }
            PrefAction::Remove { name } => {
                if !facade.remove_preference(&name) {
                    anyhow::bail!("failed to remove preference {}", name);
                }
                ui::success(&format!("Preference {} removed", name));
            }
        },

        Commands::Cache { action: CacheAction::Clear { filter } } => {
            let removed = facade.clear_cache(filter.as_deref());
            ui::status(Icons::BROOM, "Cache entries removed", &removed.to_string());
        }

        Commands::Offline { action } => match action {
            OfflineAction::List => {
                let keys = facade.offline_keys();
                ui::header(Icons::PACKAGE, &format!("{} queued item(s)", keys.len()));
                for key in keys {
                    println!("  {} {}", Icons::KEY, key);
                }
            }
            OfflineAction::Clear => {
                let removed = facade.clear_offline_data();
                ui::status(Icons::DEL, "Queued items removed", &removed.to_string());
            }
        },

        Commands::Usage => {
            let usage = facade.usage();
            ui::header(Icons::STATS, &format!("Storage usage ({})", database.display()));
            ui::summary_row("namespace", &facade.config().namespace);
            ui::summary_row("schema version", &facade.config().schema_version);
            println!("{}", ui::usage_table(&usage));
        }

        Commands::Sweep => {
            let report = facade.sweep_expired();
            let mut table = TableBuilder::new();
            table.add_row("Scanned", &report.scanned.to_string());
            table.add_row("Expired", &report.expired.to_string());
            table.add_row("Corrupt", &report.corrupt.to_string());
            ui::section("Sweep");
            println!("{}", table.build());
        }

        Commands::Export { output } => {
            let exported = facade.export_namespace();
            match output {
                Some(path) => {
                    std::fs::write(&path, exported)?;
                    ui::success(&format!("Exported to {}", path.display()));
                }
                None => println!("{}", exported),
            }
        }

        Commands::Import { file } => {
            let contents = std::fs::read_to_string(&file)?;
            if !facade.import_namespace(&contents) {
                anyhow::bail!("import from {} failed; nothing was written", file.display());
            }
            ui::success(&format!("Imported {}", file.display()));
        }

        Commands::Clear => {
            let removed = facade.clear_all();
            ui::status(Icons::DEL, "Entries removed", &removed.to_string());
        }

        Commands::Init { .. } | Commands::Session { .. } => {
            unreachable!("handled before the facade is opened")
        }
    }

    Ok(())
}

/// Interpret CLI input as JSON, falling back to a plain string
fn parse_value(raw: String) -> Value {
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}
