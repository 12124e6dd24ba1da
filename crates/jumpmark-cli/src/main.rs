//! Jumpmark CLI
//!
//! Command-line interface for Jumpmark - jump links between web pages.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use jumpmark_core::{Config, ExportFormat, FileBackend, KindFilter, LinkPatch, LinkStore, SortKey};

mod commands;
mod metadata;
mod output;
mod prompt;

use commands::link::{AddOptions, ListOptions};
use commands::Store;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "jumpmark")]
#[command(about = "Jumpmark - Jump links between web pages")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file to use instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a link to a page
    #[command(alias = "create")]
    Add {
        /// Destination URL
        url: String,
        /// Page the link is added to
        #[arg(long, value_name = "PAGE_URL")]
        from: String,
        /// Link title (fetched from the destination if omitted)
        #[arg(short, long)]
        title: Option<String>,
        /// Display icon
        #[arg(short, long)]
        icon: Option<String>,
        /// Also add a link from the destination back to the page
        #[arg(short, long)]
        reciprocal: bool,
        /// Title of the link back
        #[arg(long, requires = "reciprocal")]
        reciprocal_title: Option<String>,
        /// Title of the page, used to label the link back
        #[arg(long, requires = "reciprocal")]
        source_title: Option<String>,
    },
    /// List links
    #[command(alias = "ls")]
    List {
        /// Only links on this page
        #[arg(long, value_name = "PAGE_URL")]
        page: Option<String>,
        /// Search titles and URLs
        #[arg(short, long)]
        search: Option<String>,
        /// all, bidirectional or single
        #[arg(short, long, default_value = "all")]
        kind: KindFilter,
        /// created, title or url
        #[arg(long, default_value = "created")]
        sort: SortKey,
        /// Page of results to show
        #[arg(short = 'n', long, default_value_t = 1)]
        page_num: usize,
        /// Results per page (defaults to per_page from config)
        #[arg(long)]
        per_page: Option<usize>,
    },
    /// Show a link and its partner
    Show {
        /// Link ID (full or prefix)
        id: String,
    },
    /// Edit a link
    Edit {
        /// Link ID (full or prefix)
        id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        url: Option<String>,
        /// New icon (empty resets to the default)
        #[arg(short, long)]
        icon: Option<String>,
        /// Keep a link back from the destination, moving or adding it as needed
        #[arg(short, long, conflicts_with = "single")]
        reciprocal: bool,
        /// Remove the link back from the destination
        #[arg(long)]
        single: bool,
    },
    /// Delete links
    #[command(alias = "rm")]
    Delete {
        /// Link IDs (full or prefix)
        #[arg(required = true)]
        ids: Vec<String>,
        /// Also delete each link's partner
        #[arg(long)]
        pair: bool,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Open a link in the browser
    Open {
        /// Link ID (full or prefix)
        id: String,
    },
    /// Count the links on a page
    Count {
        /// Page URL
        page_url: String,
    },
    /// Export links
    Export {
        /// json, csv or html
        #[arg(short, long, default_value = "json")]
        format: ExportFormat,
        /// Output file or directory (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Only export these links
        #[arg(long = "id", value_name = "ID")]
        ids: Vec<String>,
    },
    /// Import links from an exported JSON file
    Import {
        file: PathBuf,
        /// Replace all existing links instead of merging
        #[arg(long)]
        replace: bool,
        /// Import links even when the same link already exists
        #[arg(long)]
        keep_duplicates: bool,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Print links again whenever the store changes
    Watch {
        /// Only links on this page
        #[arg(long, value_name = "PAGE_URL")]
        page: Option<String>,
    },
    /// Show store statistics
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, quota_bytes, per_page, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    init_logging(&config);

    let store: Store = LinkStore::new(FileBackend::from_config(&config));
    info!("Using store at {:?}", config.store_path());

    match cli.command {
        Commands::Add {
            url,
            from,
            title,
            icon,
            reciprocal,
            reciprocal_title,
            source_title,
        } => {
            let opts = AddOptions {
                url,
                from,
                title,
                icon,
                reciprocal,
                reciprocal_title,
                source_title,
            };
            commands::link::add(&store, opts, &output).await
        }
        Commands::List {
            page,
            search,
            kind,
            sort,
            page_num,
            per_page,
        } => {
            let opts = ListOptions {
                page,
                search,
                kind,
                sort,
                page_num,
                per_page: per_page.unwrap_or(config.per_page),
            };
            commands::link::list(&store, opts, &output).await
        }
        Commands::Show { id } => commands::link::show(&store, id, &output).await,
        Commands::Edit {
            id,
            title,
            url,
            icon,
            reciprocal,
            single,
        } => {
            let patch = LinkPatch { title, url, icon };
            let pairing = match (reciprocal, single) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            commands::link::edit(&store, id, patch, pairing, &output).await
        }
        Commands::Delete { ids, pair, yes } => {
            commands::link::delete(&store, ids, pair, yes, &output).await
        }
        Commands::Open { id } => commands::link::open(&store, id, &output).await,
        Commands::Count { page_url } => commands::link::count(&store, page_url, &output).await,
        Commands::Export {
            format,
            output: path,
            ids,
        } => commands::transfer::export(&store, format, path, ids, &output).await,
        Commands::Import {
            file,
            replace,
            keep_duplicates,
            yes,
        } => {
            commands::transfer::import(&store, file, replace, keep_duplicates, yes, &output).await
        }
        Commands::Watch { page } => {
            commands::watch::watch(&store, page, config.per_page, &output).await
        }
        Commands::Status => commands::status::show(&store, &config, &output).await,
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging
///
/// Only initializes if JUMPMARK_LOG environment variable is set.
/// Logs to config.log_file when set, otherwise stderr.
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("JUMPMARK_LOG") else {
        return;
    };

    let env_filter = EnvFilter::new(format!(
        "jumpmark_core={},jumpmark={}",
        log_level, log_level
    ));

    match config.log_file {
        Some(ref log_path) => {
            let log_file = match std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_path)
            {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
                    return;
                }
            };

            // Ignore error if already initialized
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(log_file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}
