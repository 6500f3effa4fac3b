//! # Identity Module
//!
//! Who is who. Two layers:
//!
//! 1. **CruxID** ([`crux_id`]): the identifier users see,
//!    `alice@cruxdev.crux`, and its naming-system twin `alice.cruxdev.id`.
//!    Parsing is strict and translation is lossless.
//! 2. **Claims** ([`claim`]): the secrets that prove ownership of an
//!    identity (recovery phrase and derived key pair), plus the
//!    [`IdentityCouple`] handle the engine returns once an identity has been
//!    restored or registered.
//!
//! Key derivation itself lives in [`crate::crypto::keys`].

pub mod claim;
pub mod crux_id;

pub use claim::{ClaimStore, IdentityClaim, IdentityCouple, IdentitySecrets, MemoryClaimStore};
pub use crux_id::{BlockstackId, CruxId, IdentifierError};
