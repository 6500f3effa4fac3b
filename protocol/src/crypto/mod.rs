//! # Cryptographic Primitives
//!
//! Everything the identity engine does with key material passes through
//! here. There is deliberately very little of it:
//!
//! - **BIP-39 / BIP-32** turn a recovery phrase into the identity key.
//! - **secp256k1** (via `k256`) is the curve of that key, and signs the
//!   storage-hub challenge and the profile document.
//! - **SHA-256 + RIPEMD-160 + Base58Check** produce the owner address the
//!   naming system records.
//!
//! Everything here is a thin wrapper over audited crates. The only thing
//! this module decides is *which* path and *which* encoding, and those have
//! to match what the naming system and storage hub already expect.

pub mod hash;
pub mod keys;

pub use hash::{double_sha256, hash160, p2pkh_address, sha256};
pub use keys::{derive_identity_keypair, generate_mnemonic, IdentityKeyPair, KeyError};
