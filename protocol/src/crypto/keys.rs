//! # Identity Key Derivation
//!
//! Turns a BIP-39 recovery phrase into the single secp256k1 key pair that
//! owns a CruxID.
//!
//! ```text
//! mnemonic --PBKDF2--> seed (64 bytes)
//!          --BIP-32--> m/888'/0'/0'
//!          --> private key (32 bytes), compressed public key (33 bytes)
//!          --> P2PKH address (owner address in the naming system)
//! ```
//!
//! Derivation is deterministic: the same phrase always yields the same
//! [`IdentityKeyPair`], which is what makes "restore from phrase" work.
//!
//! ## Private key form
//!
//! Wallet tooling often exports secp256k1 private keys in the 33-byte
//! "compressed WIF payload" form, the 32-byte scalar followed by a `01`
//! compression flag. The engine only ever stores the 32-byte scalar, so
//! every path into an [`IdentityKeyPair`] goes through
//! [`sanitize_private_key`].
//!
//! Key material is never logged.

use bip32::{DerivationPath, XPrv};
use bip39::Mnemonic;
use k256::ecdsa::{signature::Signer, Signature, SigningKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::hash::p2pkh_address;
use crate::config::{IDENTITY_DERIVATION_PATH, MNEMONIC_ENTROPY_BYTES};

/// Errors that can occur during key operations.
///
/// Messages never echo the phrase or key bytes back.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("key derivation failed: {0}")]
    Derivation(String),

    #[error("invalid private key: expected 32 bytes of hex (optionally with a 01 suffix)")]
    InvalidPrivateKey,
}

/// The identity key pair, in the string form the rest of the system speaks.
///
/// Serialized with the wire names `address`, `pubKey`, `privKey`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityKeyPair {
    /// P2PKH address of the public key. The on-chain owner of the name.
    pub address: String,

    /// Hex of the 33-byte compressed public key.
    #[serde(rename = "pubKey")]
    pub public_key: String,

    /// Hex of the 32-byte private key. Always compressed form.
    #[serde(rename = "privKey", deserialize_with = "deserialize_private_key")]
    private_key_hex: String,
}

impl IdentityKeyPair {
    /// Build a key pair from already-derived parts, normalizing the private key.
    pub fn new(
        address: impl Into<String>,
        public_key: impl Into<String>,
        private_key_hex: &str,
    ) -> Self {
        Self {
            address: address.into(),
            public_key: public_key.into(),
            private_key_hex: sanitize_private_key(private_key_hex),
        }
    }

    /// Hex of the 32-byte private key.
    ///
    /// Handle with care; this is the write capability for the identity's
    /// storage and the proof of ownership for its name.
    pub fn private_key_hex(&self) -> &str {
        &self.private_key_hex
    }

    /// The private key as a secp256k1 signing key.
    pub fn signing_key(&self) -> Result<SigningKey, KeyError> {
        signing_key_from_hex(&self.private_key_hex)
    }

    /// ECDSA-sign `message` (SHA-256 digest) and return the DER signature as hex.
    pub fn sign_hex(&self, message: &[u8]) -> Result<String, KeyError> {
        let signature: Signature = self.signing_key()?.sign(message);
        Ok(hex::encode(signature.to_der().as_bytes()))
    }
}

impl fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityKeyPair")
            .field("address", &self.address)
            .field("public_key", &self.public_key)
            .field("private_key_hex", &"<redacted>")
            .finish()
    }
}

fn deserialize_private_key<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(sanitize_private_key(&raw))
}

/// Strip the trailing `01` compression flag from a 66-hex-char private key.
///
/// Anything else is returned unchanged.
///
/// ```
/// use cruxpay_protocol::crypto::keys::sanitize_private_key;
///
/// let compressed = "6bd397dc89272e71165a0e7d197b280c7a88ed5b1e44e1928c25455506f1968f";
/// let flagged = format!("{compressed}01");
/// assert_eq!(sanitize_private_key(&flagged), compressed);
/// assert_eq!(sanitize_private_key(compressed), compressed);
/// ```
pub fn sanitize_private_key(private_key_hex: &str) -> String {
    if private_key_hex.len() == 66 && private_key_hex.ends_with("01") {
        private_key_hex[..64].to_string()
    } else {
        private_key_hex.to_string()
    }
}

/// Parse a hex private key (either form) into a signing key.
pub fn signing_key_from_hex(private_key_hex: &str) -> Result<SigningKey, KeyError> {
    let bytes =
        hex::decode(sanitize_private_key(private_key_hex)).map_err(|_| KeyError::InvalidPrivateKey)?;
    if bytes.len() != 32 {
        return Err(KeyError::InvalidPrivateKey);
    }
    SigningKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPrivateKey)
}

/// Compressed SEC1 public key of a signing key.
pub fn compressed_public_key(signing_key: &SigningKey) -> Vec<u8> {
    signing_key
        .verifying_key()
        .to_encoded_point(true)
        .as_bytes()
        .to_vec()
}

/// Produce a fresh 12-word English recovery phrase from the OS RNG.
pub fn generate_mnemonic() -> Result<String, KeyError> {
    let mut entropy = [0u8; MNEMONIC_ENTROPY_BYTES];
    OsRng.fill_bytes(&mut entropy);
    let mnemonic =
        Mnemonic::from_entropy(&entropy).map_err(|e| KeyError::InvalidMnemonic(e.to_string()))?;
    Ok(mnemonic.to_string())
}

/// Derive the identity key pair for `mnemonic` at the fixed identity index.
///
/// # Example
///
/// ```
/// use cruxpay_protocol::crypto::keys::derive_identity_keypair;
///
/// let kp = derive_identity_keypair(
///     "jelly level auction pluck system record unique huge text fold galaxy home",
/// ).unwrap();
/// assert_eq!(kp.address, "1HtFkbXFWHFW5Kd4GLfiRqkffS5KLZ91eJ");
/// ```
pub fn derive_identity_keypair(mnemonic: &str) -> Result<IdentityKeyPair, KeyError> {
    let mnemonic =
        Mnemonic::parse_normalized(mnemonic).map_err(|e| KeyError::InvalidMnemonic(e.to_string()))?;
    let seed = mnemonic.to_seed("");

    let path = DerivationPath::from_str(IDENTITY_DERIVATION_PATH)
        .map_err(|e| KeyError::Derivation(e.to_string()))?;
    let node = XPrv::derive_from_path(seed, &path).map_err(|e| KeyError::Derivation(e.to_string()))?;

    let public_key = node.public_key().to_bytes();
    Ok(IdentityKeyPair::new(
        p2pkh_address(&public_key),
        hex::encode(public_key),
        &hex::encode(node.to_bytes()),
    ))
}
