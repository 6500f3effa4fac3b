//! # Payment Module
//!
//! The part of an identity a payer actually cares about: where to send
//! coins.
//!
//! - [`mapping`]: the published asset-id to address document and the
//!   client-side currency indirection that resolves one currency.
//! - [`user`]: the public profile (identity key plus all published
//!   addresses) and the signed profile document behind it.

pub mod mapping;
pub mod user;

pub use mapping::{resolve_address, Address, AddressMapping, ClientAssetMap};
pub use user::{build_profile, verify_profile, CruxUser, UserAddress};
