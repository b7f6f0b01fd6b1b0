//! Parley CLI - profile management and an interactive command shell

mod observer;
mod shell;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;

use parley_core::engine::LoopbackFactory;
use parley_core::settings::{NetworkSettings, ProxyConfig, ProxyKind};
use parley_runtime::{FriendObserver, ProfileManager, ProfileObserver, PROFILE_EXTENSION};

use observer::ConsoleObserver;

// ----------------------------------------------------------------------------
// Command Line Interface
// ----------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "parley", version, about = "Peer-to-peer messenger profile shell")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Profile directory (defaults to the per-user config directory)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Disable IPv6
    #[arg(long)]
    no_ipv6: bool,

    /// Disable UDP (TCP relays only)
    #[arg(long)]
    no_udp: bool,

    /// Proxy type for engine traffic
    #[arg(long, value_enum, default_value_t = ProxyTypeArg::None)]
    proxy_type: ProxyTypeArg,

    /// Proxy host
    #[arg(long, default_value = "")]
    proxy_host: String,

    /// Proxy port
    #[arg(long, default_value_t = 0)]
    proxy_port: u16,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ProxyTypeArg {
    None,
    Http,
    Socks5,
}

impl std::fmt::Display for ProxyTypeArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProxyTypeArg::None => "none",
            ProxyTypeArg::Http => "http",
            ProxyTypeArg::Socks5 => "socks5",
        };
        write!(f, "{name}")
    }
}

#[derive(Subcommand)]
enum Command {
    /// List available profiles
    List,
    /// Create a new profile (does not activate it)
    Create { name: String },
    /// Activate a profile and enter the interactive shell
    Run { name: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let data_dir = match cli.data_dir.clone().or_else(default_data_dir) {
        Some(dir) => dir,
        None => {
            error!("could not determine a profile directory; pass --data-dir");
            return ExitCode::FAILURE;
        }
    };

    let settings = settings_from(&cli);
    let mut manager = ProfileManager::new(data_dir, settings, Box::new(LoopbackFactory));

    match cli.command {
        Command::List => list_profiles(&manager),
        Command::Create { ref name } => create_profile(&manager, name),
        Command::Run { ref name } => run_profile(&mut manager, name),
    }
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();
}

fn default_data_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("parley"))
}

fn settings_from(cli: &Cli) -> NetworkSettings {
    NetworkSettings {
        ipv6_enabled: !cli.no_ipv6,
        udp_enabled: !cli.no_udp,
        proxy: ProxyConfig {
            kind: match cli.proxy_type {
                ProxyTypeArg::None => ProxyKind::None,
                ProxyTypeArg::Http => ProxyKind::Http,
                ProxyTypeArg::Socks5 => ProxyKind::Socks5,
            },
            host: cli.proxy_host.clone(),
            port: cli.proxy_port,
        },
    }
}

// ----------------------------------------------------------------------------
// Commands
// ----------------------------------------------------------------------------

/// List the base names of all profile saves in the data directory
fn list_profiles(manager: &ProfileManager) -> ExitCode {
    let entries = match fs::read_dir(manager.profiles_dir()) {
        Ok(entries) => entries,
        Err(_) => {
            println!("no profiles found");
            return ExitCode::SUCCESS;
        }
    };

    let mut names: Vec<String> = entries
        .flatten()
        .filter(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext == PROFILE_EXTENSION)
        })
        .filter_map(|entry| {
            entry
                .path()
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .collect();
    names.sort();

    if names.is_empty() {
        println!("no profiles found");
    } else {
        for name in names {
            println!("{name}");
        }
    }
    ExitCode::SUCCESS
}

fn create_profile(manager: &ProfileManager, name: &str) -> ExitCode {
    let password = match rpassword::prompt_password("New profile password (empty for none): ") {
        Ok(password) => password,
        Err(err) => {
            error!(%err, "could not read password");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = manager.create(name, &password) {
        error!(%err, "profile creation failed");
        return ExitCode::FAILURE;
    }

    println!("created profile {name:?} in {}", manager.profiles_dir().display());
    ExitCode::SUCCESS
}

fn run_profile(manager: &mut ProfileManager, name: &str) -> ExitCode {
    let password = match rpassword::prompt_password("Password: ") {
        Ok(password) => password,
        Err(err) => {
            error!(%err, "could not read password");
            return ExitCode::FAILURE;
        }
    };

    let console = Arc::new(ConsoleObserver);
    manager
        .hub()
        .subscribe_profile(Arc::clone(&console) as Arc<dyn ProfileObserver>);
    manager
        .hub()
        .subscribe_friend(console as Arc<dyn FriendObserver>);

    manager.activate(name, &password);
    if manager.active().is_none() {
        error!("profile not activated");
        return ExitCode::FAILURE;
    }

    shell::run(manager)
}
