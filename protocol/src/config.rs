//! # Engine Configuration & Constants
//!
//! Every fixed string the engine speaks to the outside world lives here:
//! identifier suffixes, the identity derivation path, the registrar's status
//! sentinels, storage filenames. The other half of the module is
//! [`EngineConfig`], the caller-supplied endpoint set (naming nodes,
//! registrar, storage hub) with sensible defaults and TOML loading.
//!
//! The registrar sentinels are prose, not codes. If the registrar ever
//! rewords a message, this is the only file that should need to change.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Identifier Format
// ---------------------------------------------------------------------------

/// Separator between subdomain and domain in an application identifier.
pub const CRUX_ID_SEPARATOR: char = '@';

/// The one suffix an application identifier may carry: `alice@cruxdev.crux`.
pub const CRUX_DOMAIN_SUFFIX: &str = "crux";

/// Suffix of the same identity in the naming system: `alice.cruxdev.id`.
pub const BLOCKSTACK_NAMESPACE: &str = "id";

// ---------------------------------------------------------------------------
// Key Derivation
// ---------------------------------------------------------------------------

/// Identity keychain path. `888'/0'` is the identity keychain on bitcoin,
/// the last component is the identity index.
pub const IDENTITY_DERIVATION_PATH: &str = "m/888'/0'/0'";

/// Identity index used by the engine. Always the first identity.
pub const IDENTITY_INDEX: u32 = 0;

/// Entropy for freshly generated recovery phrases. 16 bytes = 12 words.
pub const MNEMONIC_ENTROPY_BYTES: usize = 16;

/// Version byte of a mainnet pay-to-pubkey-hash address (`1...`).
pub const P2PKH_VERSION: u8 = 0x00;

// ---------------------------------------------------------------------------
// Naming System & Registrar
// ---------------------------------------------------------------------------

/// Naming-node status of a subdomain anchored on chain.
pub const REGISTERED_SUBDOMAIN_STATUS: &str = "registered_subdomain";

/// Registrar status prefix for a name batched into a registrar transaction.
pub const REGISTRAR_IN_TRANSACTION_PREFIX: &str = "Your subdomain was registered in transaction";

/// Registrar status for a name waiting to be announced on chain.
pub const REGISTRAR_QUEUED: &str =
    "Subdomain is queued for update and should be announced within the next few blocks.";

/// Registrar status for a name it has never seen. Also the availability sentinel.
pub const REGISTRAR_NOT_REGISTERED: &str = "Subdomain not registered with this registrar";

/// Registrar status for a propagated name. Deliberately ignored, the naming
/// nodes are authoritative for propagation.
pub const REGISTRAR_PROPAGATED: &str = "Subdomain propagated";

/// TTL written into every registration zonefile.
pub const ZONEFILE_TTL_SECS: u32 = 3600;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default domain for newly registered identities.
pub const DEFAULT_DOMAIN: &str = "cruxdev";

/// Naming-system read nodes that are always queried.
pub const DEFAULT_BNS_NODES: [&str; 2] = ["https://core.blockstack.org", "https://bns.cruxpay.com"];

/// Default off-chain subdomain registrar.
pub const DEFAULT_SUBDOMAIN_REGISTRAR: &str = "https://registrar.coinswitch.co:3000";

/// Default storage hub write endpoint.
pub const DEFAULT_GAIA_HUB: &str = "https://hub.cruxpay.com";

/// Default public read prefix of the storage hub.
pub const DEFAULT_GAIA_READ_URL: &str = "https://gaia.cruxpay.com";

/// Per-request HTTP timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config value `{field}` is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Endpoints and identity domain consumed by the engine.
///
/// Every field has a default, so a TOML file only needs the keys it wants
/// to override:
///
/// ```toml
/// domain = "cruxdev"
/// bns_nodes = ["https://bns.example.org"]
/// subdomain_registrar = "https://registrar.example.org"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Domain under which subdomains are registered (`cruxdev` in `alice@cruxdev.crux`).
    pub domain: String,

    /// Extra naming-system nodes. Merged after [`DEFAULT_BNS_NODES`].
    pub bns_nodes: Vec<String>,

    /// Base URL of the off-chain subdomain registrar.
    pub subdomain_registrar: String,

    /// Storage hub write endpoint, embedded in registration zonefiles.
    pub gaia_hub: String,

    /// Public read prefix for published files.
    pub gaia_read_url: String,

    /// HTTP timeout applied by the default transports.
    pub request_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
            bns_nodes: Vec::new(),
            subdomain_registrar: DEFAULT_SUBDOMAIN_REGISTRAR.to_string(),
            gaia_hub: DEFAULT_GAIA_HUB.to_string(),
            gaia_read_url: DEFAULT_GAIA_READ_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document and validate it.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Reject values that would only fail later, at the first network call.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.domain.is_empty() {
            return Err(ConfigError::Invalid {
                field: "domain",
                reason: "must not be empty".into(),
            });
        }
        let endpoints = self
            .bns_nodes
            .iter()
            .map(|n| ("bns_nodes", n))
            .chain([
                ("subdomain_registrar", &self.subdomain_registrar),
                ("gaia_hub", &self.gaia_hub),
                ("gaia_read_url", &self.gaia_read_url),
            ]);
        for (field, value) in endpoints {
            url::Url::parse(value).map_err(|e| ConfigError::Invalid {
                field,
                reason: format!("{value}: {e}"),
            })?;
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_secs",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }

    /// The naming nodes actually queried: defaults first, then configured
    /// extras, duplicates dropped, first occurrence wins.
    pub fn resolved_bns_nodes(&self) -> Vec<String> {
        let mut nodes: Vec<String> = Vec::new();
        let candidates = DEFAULT_BNS_NODES
            .iter()
            .map(|s| s.to_string())
            .chain(self.bns_nodes.iter().cloned());
        for node in candidates {
            let node = node.trim_end_matches('/').to_string();
            if !nodes.contains(&node) {
                nodes.push(node);
            }
        }
        nodes
    }

    /// HTTP timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
