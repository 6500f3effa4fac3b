//! # CruxID: Application Identifiers
//!
//! A CruxID is what a user types into a payment field:
//!
//! ```text
//! alice@cruxdev.crux
//! ^^^^^ ^^^^^^^ ^^^^
//!   |      |      `-- fixed application suffix
//!   |      `--------- domain (the wallet or exchange that registered it)
//!   `---------------- subdomain (the user)
//! ```
//!
//! The naming system knows the same identity by a different spelling:
//!
//! ```text
//! alice.cruxdev.id
//! ```
//!
//! Translation is a pure suffix substitution in both directions and never
//! loses information, so `CruxId -> BlockstackId -> CruxId` is the identity
//! function. Validation happens once, at construction, and both types are
//! immutable afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::{BLOCKSTACK_NAMESPACE, CRUX_DOMAIN_SUFFIX, CRUX_ID_SEPARATOR};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons an identifier string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("`{0}` is missing the `@` separator")]
    MissingSeparator(String),

    #[error("`{0}` must end in `.{suffix}`", suffix = CRUX_DOMAIN_SUFFIX)]
    UnknownSuffix(String),

    #[error("`{0}` is not a `subdomain.domain.{ns}` name", ns = BLOCKSTACK_NAMESPACE)]
    MalformedNativeName(String),

    #[error("empty {0}")]
    Empty(&'static str),

    #[error("{label} `{value}` may only contain a-z, 0-9, `_` and `-`")]
    DisallowedCharacters { label: &'static str, value: String },
}

// ---------------------------------------------------------------------------
// Label validation
// ---------------------------------------------------------------------------

fn validate_label(label: &'static str, value: &str) -> Result<(), IdentifierError> {
    if value.is_empty() {
        return Err(IdentifierError::Empty(label));
    }
    let allowed = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-';
    if !value.chars().all(allowed) {
        return Err(IdentifierError::DisallowedCharacters {
            label,
            value: value.to_string(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CruxId
// ---------------------------------------------------------------------------

/// Application-level identifier, `subdomain@domain.crux`.
///
/// # Examples
///
/// ```
/// use cruxpay_protocol::identity::CruxId;
///
/// let id: CruxId = "alice@cruxdev.crux".parse().unwrap();
/// assert_eq!(id.subdomain(), "alice");
/// assert_eq!(id.domain(), "cruxdev");
/// assert_eq!(id.to_string(), "alice@cruxdev.crux");
/// assert_eq!(id.to_blockstack().to_string(), "alice.cruxdev.id");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CruxId {
    subdomain: String,
    domain: String,
}

impl CruxId {
    /// Build from parts. Both labels are validated.
    pub fn new(subdomain: impl Into<String>, domain: impl Into<String>) -> Result<Self, IdentifierError> {
        let subdomain = subdomain.into();
        let domain = domain.into();
        validate_label("subdomain", &subdomain)?;
        validate_label("domain", &domain)?;
        Ok(Self { subdomain, domain })
    }

    /// Parse `subdomain@domain.crux`.
    pub fn parse(full: &str) -> Result<Self, IdentifierError> {
        let (subdomain, rest) = full
            .split_once(CRUX_ID_SEPARATOR)
            .ok_or_else(|| IdentifierError::MissingSeparator(full.to_string()))?;

        let domain = rest
            .strip_suffix(CRUX_DOMAIN_SUFFIX)
            .and_then(|d| d.strip_suffix('.'))
            .ok_or_else(|| IdentifierError::UnknownSuffix(full.to_string()))?;

        Self::new(subdomain, domain)
    }

    pub fn subdomain(&self) -> &str {
        &self.subdomain
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The naming-system spelling of this identity.
    pub fn to_blockstack(&self) -> BlockstackId {
        BlockstackId {
            subdomain: self.subdomain.clone(),
            domain: self.domain.clone(),
        }
    }
}

impl fmt::Display for CruxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}.{}",
            self.subdomain, CRUX_ID_SEPARATOR, self.domain, CRUX_DOMAIN_SUFFIX
        )
    }
}

impl FromStr for CruxId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for CruxId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CruxId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        CruxId::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// BlockstackId
// ---------------------------------------------------------------------------

/// Naming-system identifier, `subdomain.domain.id`.
///
/// Only obtainable by translating a [`CruxId`] or parsing a native name
/// string, so its labels are always valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockstackId {
    subdomain: String,
    domain: String,
}

impl BlockstackId {
    /// Parse `subdomain.domain.id`.
    pub fn parse(full: &str) -> Result<Self, IdentifierError> {
        let malformed = || IdentifierError::MalformedNativeName(full.to_string());
        let rest = full
            .strip_suffix(BLOCKSTACK_NAMESPACE)
            .and_then(|r| r.strip_suffix('.'))
            .ok_or_else(malformed)?;
        let (subdomain, domain) = rest.split_once('.').ok_or_else(malformed)?;
        validate_label("subdomain", subdomain)?;
        validate_label("domain", domain)?;
        Ok(Self {
            subdomain: subdomain.to_string(),
            domain: domain.to_string(),
        })
    }

    pub fn subdomain(&self) -> &str {
        &self.subdomain
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The application spelling of this identity.
    pub fn to_crux(&self) -> CruxId {
        CruxId {
            subdomain: self.subdomain.clone(),
            domain: self.domain.clone(),
        }
    }
}

impl fmt::Display for BlockstackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.subdomain, self.domain, BLOCKSTACK_NAMESPACE)
    }
}

impl FromStr for BlockstackId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<&CruxId> for BlockstackId {
    fn from(id: &CruxId) -> Self {
        id.to_blockstack()
    }
}

impl From<&BlockstackId> for CruxId {
    fn from(id: &BlockstackId) -> Self {
        id.to_crux()
    }
}
