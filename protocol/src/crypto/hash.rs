//! # Hashing Utilities
//!
//! The handful of hash constructions the identity layer needs to speak
//! bitcoin-flavoured addresses:
//!
//! - **SHA-256** for message digests and as the first half of HASH160.
//! - **HASH160** = `RIPEMD-160(SHA-256(data))`, the public-key fingerprint
//!   inside every pay-to-pubkey-hash address.
//! - **Base58Check** encoding of `version || HASH160(pubkey)`, which is what
//!   the naming system stores as an identity's owner address.
//!
//! Nothing here is novel. The naming system decides the address format and
//! we match it byte for byte; an address that differs by one character is
//! a different owner.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::config::P2PKH_VERSION;

/// Compute the SHA-256 hash of the input data.
///
/// # Example
///
/// ```
/// use cruxpay_protocol::crypto::sha256;
///
/// let hash = sha256(b"crux");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute `SHA-256(SHA-256(data))`.
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// Compute `RIPEMD-160(SHA-256(data))`.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(sha256(data));
    hasher.finalize().into()
}

/// Encode a compressed public key as a mainnet P2PKH address (`1...`).
///
/// The checksum is the first four bytes of `double_sha256` over the
/// versioned payload, which `bs58`'s check mode computes for us.
pub fn p2pkh_address(public_key: &[u8]) -> String {
    bs58::encode(hash160(public_key))
        .with_check_version(P2PKH_VERSION)
        .into_string()
}
