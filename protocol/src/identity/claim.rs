//! # Identity Claims
//!
//! An [`IdentityClaim`] is the caller's proof of owning an identity: the
//! recovery phrase, the derived key pair, or both. The engine fills in the
//! key pair when only the phrase is present and hands the completed claim
//! back. It never keeps a copy.
//!
//! Wire format (what wallets persist):
//!
//! ```json
//! {"secrets": {"mnemonic": "...", "identityKeyPair": {"address": "...", "pubKey": "...", "privKey": "..."}}}
//! ```
//!
//! Persisting a claim is the caller's business. [`ClaimStore`] is the seam;
//! encrypt before it if the storage is not already private.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::crux_id::{BlockstackId, CruxId};
use crate::crypto::keys::{derive_identity_keypair, IdentityKeyPair, KeyError};

/// Secret half of a claim.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySecrets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_key_pair: Option<IdentityKeyPair>,
}

impl fmt::Debug for IdentitySecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentitySecrets")
            .field("mnemonic", &self.mnemonic.as_ref().map(|_| "<redacted>"))
            .field("identity_key_pair", &self.identity_key_pair)
            .finish()
    }
}

/// Everything needed to act as an identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaim {
    pub secrets: IdentitySecrets,
}

impl IdentityClaim {
    /// A claim carrying only a recovery phrase.
    pub fn from_mnemonic(mnemonic: impl Into<String>) -> Self {
        Self {
            secrets: IdentitySecrets {
                mnemonic: Some(mnemonic.into()),
                identity_key_pair: None,
            },
        }
    }

    /// A claim carrying both halves.
    pub fn new(mnemonic: impl Into<String>, key_pair: IdentityKeyPair) -> Self {
        Self {
            secrets: IdentitySecrets {
                mnemonic: Some(mnemonic.into()),
                identity_key_pair: Some(key_pair),
            },
        }
    }

    pub fn mnemonic(&self) -> Option<&str> {
        self.secrets.mnemonic.as_deref()
    }

    pub fn key_pair(&self) -> Option<&IdentityKeyPair> {
        self.secrets.identity_key_pair.as_ref()
    }

    /// Owner address of the claim's key pair, if it has one.
    pub fn address(&self) -> Option<&str> {
        self.key_pair().map(|kp| kp.address.as_str())
    }

    /// Derive and attach the key pair if it is missing. A present key pair
    /// is never regenerated.
    ///
    /// Returns `Ok(false)` without touching anything if there is no phrase
    /// to derive from.
    pub fn complete(&mut self) -> Result<bool, KeyError> {
        if self.secrets.identity_key_pair.is_some() {
            return Ok(true);
        }
        match self.secrets.mnemonic.as_deref() {
            Some(mnemonic) => {
                self.secrets.identity_key_pair = Some(derive_identity_keypair(mnemonic)?);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// An identity in both spellings. Returned by restore and register, and
/// passed back in by the caller to ask for registration status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityCouple {
    pub crux_id: CruxId,
    pub bs_id: BlockstackId,
}

impl From<CruxId> for IdentityCouple {
    fn from(crux_id: CruxId) -> Self {
        let bs_id = crux_id.to_blockstack();
        Self { crux_id, bs_id }
    }
}

// ---------------------------------------------------------------------------
// Claim persistence
// ---------------------------------------------------------------------------

/// Somewhere to keep a claim between sessions.
///
/// Implementations store the claim as given. Encrypting it is up to the
/// caller or the implementation.
pub trait ClaimStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn load(&self) -> Result<Option<IdentityClaim>, Self::Error>;

    fn save(&self, claim: &IdentityClaim) -> Result<(), Self::Error>;
}

/// Process-local claim store.
#[derive(Debug, Default)]
pub struct MemoryClaimStore {
    slot: RwLock<Option<IdentityClaim>>,
}

impl MemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClaimStore for MemoryClaimStore {
    type Error = std::convert::Infallible;

    fn load(&self) -> Result<Option<IdentityClaim>, Self::Error> {
        Ok(self.slot.read().clone())
    }

    fn save(&self, claim: &IdentityClaim) -> Result<(), Self::Error> {
        *self.slot.write() = Some(claim.clone());
        Ok(())
    }
}
