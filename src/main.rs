use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use catalog_relay::tree::{render_text, ProxyFetcher, Session};
use catalog_relay::tui::{self, App, SharedFetcher};
use catalog_relay::{start_relay_server, CatalogEndpoints, Config};

const DEFAULT_PROXY: &str = "http://127.0.0.1:3000/proxy";

#[derive(Parser, Debug)]
#[command(name = "catalog-relay")]
#[command(author, version, about = "Credentialed relay and lazy tree browser for code catalogs")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the relay server and the tree viewer
    Serve {
        /// Interface to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Number of worker threads
        #[arg(short, long)]
        workers: Option<usize>,

        /// Config file (default: nearest .catalog-relay/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Browse the catalog tree in the terminal through a running relay
    Browse {
        /// Relay endpoint to fetch through
        #[arg(long, default_value = DEFAULT_PROXY)]
        proxy: String,

        /// Config file (default: nearest .catalog-relay/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the tree as text, expanded down to a depth
    Print {
        /// Levels to show (roots are level 1)
        #[arg(short, long, default_value = "1")]
        depth: usize,

        /// Relay endpoint to fetch through
        #[arg(long, default_value = DEFAULT_PROXY)]
        proxy: String,

        /// Config file (default: nearest .catalog-relay/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show the effective configuration (credential masked)
    Config {
        /// Config file (default: nearest .catalog-relay/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    // .env is optional; real environment wins
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_logging(matches!(args.command, Command::Browse { .. }));

    if let Err(e) = run(args.command) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Log to stderr, filtered by RUST_LOG. The browser owns the terminal, so
/// it stays silent unless RUST_LOG asks otherwise.
fn init_logging(quiet: bool) {
    let default = if quiet { "off" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn load_config(path: Option<PathBuf>) -> Result<Config, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(Config::load_from(&path)?),
        None => Ok(Config::load()),
    }
}

fn fetcher_and_endpoints(
    config: &Config,
    proxy: &str,
) -> Result<(ProxyFetcher, CatalogEndpoints), Box<dyn std::error::Error>> {
    let endpoints = CatalogEndpoints::new(&config.catalog)?;
    let timeout = Duration::from_secs(config.proxy.timeout_secs.saturating_add(5));
    let fetcher = ProxyFetcher::new(proxy, timeout)?;
    Ok((fetcher, endpoints))
}

fn run(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Serve {
            host,
            port,
            workers,
            config,
        } => {
            let mut config = load_config(config)?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(workers) = workers {
                config.server.workers = workers;
            }
            start_relay_server(&config)?;
        }

        Command::Browse { proxy, config } => {
            let config = load_config(config)?;
            let (fetcher, endpoints) = fetcher_and_endpoints(&config, &proxy)?;
            let shared: SharedFetcher = Arc::new(fetcher);
            let app = App::new(shared, endpoints, &config.catalog.name_field, proxy);
            tui::run(app)?;
        }

        Command::Print {
            depth,
            proxy,
            config,
        } => {
            let config = load_config(config)?;
            let (fetcher, endpoints) = fetcher_and_endpoints(&config, &proxy)?;
            let mut session = Session::new(fetcher, endpoints, &config.catalog.name_field);
            session.load_roots();
            session.expand_to_depth(depth);
            println!("{}", render_text(session.model()));
            if let Some(error) = &session.model().error {
                eprintln!("{} {}", "Warning:".yellow().bold(), error);
            }
        }

        Command::Config { config } => {
            let config = load_config(config)?;
            print!("{}", toml::to_string_pretty(&config)?);
            let credential = match &config.credential {
                Some(secret) => format!("{} (set)", secret),
                None => "not set".to_string(),
            };
            println!("\n# credential: {}", credential);
        }

        Command::Completion { shell } => {
            let mut cmd = Args::command();
            clap_complete::generate(shell, &mut cmd, "catalog-relay", &mut io::stdout());
        }
    }
    Ok(())
}
