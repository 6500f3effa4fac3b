// Copyright (c) 2026 CruxPay Contributors. MIT License.
// See LICENSE for details.

//! # crux
//!
//! Command-line front end for the CruxID engine. Parses arguments, builds
//! an [`EngineConfig`] from file, environment and flags, then runs one
//! engine operation and prints the result as JSON on stdout.
//!
//! - `generate`  - new recovery phrase, saved to the claim file
//! - `restore`   - bind a phrase to an existing CruxID
//! - `register`  - claim a subdomain
//! - `status`    - registration status
//! - `available` - subdomain availability
//! - `publish`   - publish an address mapping
//! - `mapping`   - read a published mapping
//! - `resolve`   - one currency's address
//! - `user`      - public profile
//! - `version`   - build version

mod cli;
mod logging;
mod store;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::Path;

use cruxpay_protocol::config::EngineConfig;
use cruxpay_protocol::identity::{ClaimStore, CruxId, IdentityClaim, IdentityCouple};
use cruxpay_protocol::payment::ClientAssetMap;
use cruxpay_protocol::CruxNameService;

use cli::{Commands, CruxCli, GlobalArgs};
use store::FileClaimStore;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CruxCli::parse();
    logging::init_logging("crux=info,cruxpay_protocol=info", cli.global.log_format);

    if let Commands::Version = cli.command {
        print_version();
        return Ok(());
    }

    let config = engine_config(&cli.global)?;
    tracing::debug!(domain = %config.domain, registrar = %config.subdomain_registrar, "engine configured");
    let service = CruxNameService::over_http(config).context("failed to build HTTP transport")?;
    let store = FileClaimStore::new(&cli.global.claim);

    match cli.command {
        Commands::Generate(args) => generate(&service, &store, args.force),
        Commands::Restore(args) => restore(&service, &store, &args.crux_id, args.mnemonic).await,
        Commands::Register(args) => register(&service, &store, &args.subdomain).await,
        Commands::Status(args) => {
            let claim = load_claim(&store)?;
            let couple = IdentityCouple::from(CruxId::parse(&args.crux_id)?);
            let status = service.get_registration_status(Some(&couple), &claim).await?;
            print_json(&status)
        }
        Commands::Available(args) => {
            let available = service.get_name_availability(&args.subdomain).await?;
            print_json(&serde_json::json!({
                "subdomain": args.subdomain,
                "available": available,
            }))
        }
        Commands::Publish(args) => {
            let claim = load_claim(&store)?;
            let document = read_json(&args.mapping)?;
            let mapping = service.put_address_mapping(&claim, &document).await?;
            print_json(&mapping)
        }
        Commands::Mapping(args) => print_json(&service.get_address_mapping(&args.crux_id).await?),
        Commands::Resolve(args) => {
            let assets = client_assets(&args.assets, args.asset_map.as_deref())?;
            let address = service
                .resolve_address(&args.crux_id, &args.currency, &assets)
                .await?;
            print_json(&address)
        }
        Commands::User(args) => print_json(&service.get_crux_user(&args.crux_id).await?),
        Commands::Version => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn generate(service: &CruxNameService, store: &FileClaimStore, force: bool) -> Result<()> {
    if store.exists() && !force {
        bail!(
            "claim file {} already exists; pass --force to replace it",
            store.path().display()
        );
    }
    let claim = service.generate_identity()?;
    store.save(&claim)?;
    tracing::info!(path = %store.path().display(), "identity saved");

    println!("Identity generated.");
    println!("  Claim file      : {}", store.path().display());
    println!("  Owner address   : {}", claim.address().unwrap_or_default());
    println!("  Recovery phrase : {}", claim.mnemonic().unwrap_or_default());
    println!();
    println!("Write the recovery phrase down. It is the only way back into this identity.");
    Ok(())
}

async fn restore(
    service: &CruxNameService,
    store: &FileClaimStore,
    crux_id: &str,
    mnemonic: Option<String>,
) -> Result<()> {
    let claim = match mnemonic {
        Some(phrase) => IdentityClaim::from_mnemonic(phrase),
        None => load_claim(store)?,
    };
    let session = service.restore_identity(crux_id, &claim).await?;
    store.save(&session.claim)?;

    let status = service
        .get_registration_status(Some(&session.couple), &session.claim)
        .await?;
    print_json(&serde_json::json!({
        "cruxId": session.couple.crux_id,
        "address": session.claim.address(),
        "status": status,
    }))
}

async fn register(service: &CruxNameService, store: &FileClaimStore, subdomain: &str) -> Result<()> {
    let claim = load_claim(store)?;
    let session = service.register_name(&claim, subdomain).await?;
    store.save(&session.claim)?;
    print_json(&serde_json::json!({
        "cruxId": session.couple.crux_id,
        "address": session.claim.address(),
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Config file (or defaults), then flag and environment overrides.
fn engine_config(global: &GlobalArgs) -> Result<EngineConfig> {
    let mut config = match &global.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(domain) = &global.domain {
        config.domain = domain.clone();
    }
    if let Some(registrar) = &global.registrar {
        config.subdomain_registrar = registrar.clone();
    }
    if let Some(hub) = &global.gaia_hub {
        config.gaia_hub = hub.clone();
    }
    config.bns_nodes.extend(
        global
            .bns_nodes
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(str::to_string),
    );
    config.validate()?;
    Ok(config)
}

fn load_claim(store: &FileClaimStore) -> Result<IdentityClaim> {
    match store.load()? {
        Some(claim) => Ok(claim),
        None => bail!(
            "no claim file at {}; run `crux generate` or `crux restore --mnemonic`",
            store.path().display()
        ),
    }
}

/// Client asset table from `SYMBOL=ASSET_ID` pairs plus an optional JSON
/// file. Pairs win over the file.
fn client_assets(pairs: &[String], file: Option<&Path>) -> Result<ClientAssetMap> {
    let mut assets = match file {
        Some(path) => serde_json::from_value(read_json(path)?)
            .with_context(|| format!("{} is not a symbol to asset id object", path.display()))?,
        None => ClientAssetMap::new(),
    };
    for pair in pairs {
        let Some((symbol, asset_id)) = pair.split_once('=') else {
            bail!("asset entry `{pair}` is not SYMBOL=ASSET_ID");
        };
        if symbol.is_empty() || asset_id.is_empty() {
            bail!("asset entry `{pair}` is not SYMBOL=ASSET_ID");
        }
        assets.insert(symbol, asset_id);
    }
    Ok(assets)
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_version() {
    println!("crux {}", env!("CARGO_PKG_VERSION"));
    println!("  naming nodes  : {}", EngineConfig::default().resolved_bns_nodes().join(", "));
    println!("  registrar     : {}", EngineConfig::default().subdomain_registrar);
}
