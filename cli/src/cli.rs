//! # CLI Interface
//!
//! Command-line structure for `crux`, using `clap` derive. Global flags pick
//! the claim file, the engine config, and endpoint overrides; each
//! subcommand maps to one engine operation.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// CruxID identity client.
///
/// Registers human-readable payment identifiers, publishes the addresses
/// they resolve to, and resolves other people's identifiers.
#[derive(Parser, Debug)]
#[command(name = "crux", about = "CruxID identity client", version, propagate_version = true)]
pub struct CruxCli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every subcommand.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Engine configuration file (TOML). Defaults apply when omitted.
    #[arg(long, short = 'c', global = true, env = "CRUX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Where the identity claim (recovery phrase and key pair) is kept.
    #[arg(long, global = true, env = "CRUX_CLAIM", default_value = "crux-claim.json")]
    pub claim: PathBuf,

    /// Domain to register under, overriding the config file.
    #[arg(long, global = true, env = "CRUX_DOMAIN")]
    pub domain: Option<String>,

    /// Subdomain registrar base URL, overriding the config file.
    #[arg(long, global = true, env = "CRUX_REGISTRAR")]
    pub registrar: Option<String>,

    /// Storage hub write URL, overriding the config file.
    #[arg(long, global = true, env = "CRUX_GAIA_HUB")]
    pub gaia_hub: Option<String>,

    /// Extra naming nodes, comma separated. Queried after the defaults.
    #[arg(long = "bns-node", global = true, env = "CRUX_BNS_NODES", value_delimiter = ',')]
    pub bns_nodes: Vec<String>,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a fresh identity and save it to the claim file.
    Generate(GenerateArgs),
    /// Bind the saved (or given) recovery phrase to an existing CruxID.
    Restore(RestoreArgs),
    /// Register a subdomain under the configured domain.
    Register(RegisterArgs),
    /// Show where a CruxID's registration stands.
    Status(IdArgs),
    /// Check whether a subdomain is still free.
    Available(AvailableArgs),
    /// Publish an address mapping document (JSON file).
    Publish(PublishArgs),
    /// Print the address mapping a CruxID has published.
    Mapping(IdArgs),
    /// Resolve the address a CruxID publishes for one currency.
    Resolve(ResolveArgs),
    /// Print a CruxID's public profile.
    User(IdArgs),
    /// Print version information and exit.
    Version,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Replace an existing claim file.
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Full identifier, e.g. `alice@cruxdev.crux`.
    pub crux_id: String,

    /// Recovery phrase to restore from instead of the saved claim.
    #[arg(long, env = "CRUX_MNEMONIC", hide_env_values = true)]
    pub mnemonic: Option<String>,
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Subdomain to claim, e.g. `alice`.
    pub subdomain: String,
}

#[derive(Args, Debug)]
pub struct IdArgs {
    /// Full identifier, e.g. `alice@cruxdev.crux`.
    pub crux_id: String,
}

#[derive(Args, Debug)]
pub struct AvailableArgs {
    /// Subdomain to check.
    pub subdomain: String,
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// JSON document mapping asset ids to `{addressHash, secIdentifier?}`.
    pub mapping: PathBuf,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Full identifier, e.g. `alice@cruxdev.crux`.
    pub crux_id: String,

    /// Currency symbol, e.g. `BTC`.
    pub currency: String,

    /// Client asset table entry, `SYMBOL=ASSET_ID`. Repeatable.
    #[arg(long = "asset", value_name = "SYMBOL=ASSET_ID")]
    pub assets: Vec<String>,

    /// Client asset table as a JSON object of symbol to asset id.
    #[arg(long, value_name = "FILE")]
    pub asset_map: Option<PathBuf>,
}
