//! Command-line argument parsing and configuration.
//!
//! Supports:
//! - CLI arguments via clap
//! - TOML configuration file (`config.toml` in the working directory)
//! - Merging CLI with file config (CLI takes precedence)

use crate::core::config::DEFAULT_SHELL_ORIGIN;
use crate::core::transport::NetworkOptions;
use clap::{Parser, Subcommand};
use iroh::{RelayMode, RelayUrl};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::fs;
use std::net::{SocketAddrV4, SocketAddrV6};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Stranger Connect - peer-to-peer chat with strangers, by number.
#[derive(Parser, Deserialize, Clone, Debug, Default)]
#[command(author, version, about)]
#[command(propagate_version = true)]
#[serde(default)]
pub struct Args {
    #[command(subcommand)]
    #[serde(skip)]
    pub command: Option<Command>,

    /// The IPv4 address that socket will listen on.
    #[clap(long, global = true)]
    pub ipv4_addr: Option<SocketAddrV4>,

    /// The IPv6 address that socket will listen on.
    #[clap(long, global = true)]
    pub ipv6_addr: Option<SocketAddrV6>,

    /// UDP port to bind on. If taken, tries next ports. 0 = auto (OS-assigned).
    #[clap(short, long, default_value_t = 0, global = true)]
    pub port: u16,

    /// Verbosity level (-v, -vv, -vvv).
    #[clap(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Relay mode: "default", "disabled" or a relay URL.
    #[clap(long, default_value_t = RelayModeOption::Default, global = true)]
    pub relay: RelayModeOption,

    /// Identifier to pre-fill on the login screen.
    #[clap(long)]
    pub identity: Option<String>,

    /// Origin the relative offline-shell assets are resolved against.
    #[clap(long, global = true)]
    pub shell_origin: Option<String>,

    /// Directory for all persistent data (contacts, asset cache, logs).
    /// Defaults to ~/.stranger-connect/
    #[clap(long, global = true)]
    pub conf: Option<PathBuf>,
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start the chat client (default).
    Chat,
    /// Download and cache the offline shell assets.
    Install,
    /// Fetch a URL through the offline cache (cache first, then network).
    Fetch {
        /// Absolute URL, or a path relative to the shell origin.
        url: String,

        /// Write the body here instead of stdout.
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
}

impl Args {
    /// Load Args from CLI + TOML file (if it exists).
    /// CLI values override those from the file.
    pub fn load() -> Self {
        let mut cli_args = Args::parse();

        // Resolve relative paths to absolute before any working directory change
        cli_args.conf = cli_args.conf.map(Self::resolve_path);

        let default_path = PathBuf::from("config.toml");
        if let Some(file_args) = Self::from_file(&default_path) {
            return Self::merge(file_args, cli_args);
        }

        cli_args
    }

    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Chat)
    }

    pub fn shell_origin(&self) -> &str {
        self.shell_origin.as_deref().unwrap_or(DEFAULT_SHELL_ORIGIN)
    }

    pub fn network(&self) -> NetworkOptions {
        NetworkOptions {
            relay: self.relay.clone(),
            ipv4_addr: self.ipv4_addr,
            ipv6_addr: self.ipv6_addr,
            port: self.port,
        }
    }

    /// Resolve a potentially relative path to an absolute one.
    fn resolve_path(p: PathBuf) -> PathBuf {
        if p.is_absolute() {
            p
        } else {
            std::env::current_dir().unwrap_or_default().join(p)
        }
    }

    /// Load args from a TOML file.
    fn from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        let content = fs::read_to_string(path).ok()?;
        Self::from_toml(&content)
    }

    fn from_toml(content: &str) -> Option<Self> {
        toml::from_str::<Args>(content).ok()
    }

    /// Merge file args with CLI args (CLI takes precedence).
    fn merge(mut file: Args, cli: Args) -> Args {
        file.command = cli.command;
        if cli.ipv4_addr.is_some() {
            file.ipv4_addr = cli.ipv4_addr;
        }
        if cli.ipv6_addr.is_some() {
            file.ipv6_addr = cli.ipv6_addr;
        }
        if cli.verbose > 0 {
            file.verbose = cli.verbose;
        }
        if cli.port > 0 {
            file.port = cli.port;
        }
        if cli.identity.is_some() {
            file.identity = cli.identity;
        }
        if cli.shell_origin.is_some() {
            file.shell_origin = cli.shell_origin;
        }
        if cli.conf.is_some() {
            file.conf = cli.conf;
        }
        if !matches!(cli.relay, RelayModeOption::Default) {
            file.relay = cli.relay;
        }
        file
    }
}

// ── Relay Mode Option ──────────────────────────────────────────────────────────

/// Available command line options for configuring relays.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayModeOption {
    Disabled,
    #[default]
    Default,
    Custom(RelayUrl),
}

impl FromStr for RelayModeOption {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disabled" => Ok(Self::Disabled),
            "default" => Ok(Self::Default),
            _ => Ok(Self::Custom(RelayUrl::from_str(s)?)),
        }
    }
}

impl Display for RelayModeOption {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disabled => f.write_str("disabled"),
            Self::Default => f.write_str("default"),
            Self::Custom(url) => url.fmt(f),
        }
    }
}

impl From<RelayModeOption> for RelayMode {
    fn from(value: RelayModeOption) -> Self {
        match value {
            RelayModeOption::Disabled => RelayMode::Disabled,
            RelayModeOption::Default => RelayMode::Default,
            RelayModeOption::Custom(url) => RelayMode::Custom(url.into()),
        }
    }
}
