//! # Public Payment Profile
//!
//! What anyone can learn about a CruxID without secrets: its identity
//! public key (from the signed profile document written at registration)
//! and every address it published, keyed by asset id.
//!
//! The profile document is signed by the identity key over its canonical
//! JSON form (keys sorted, no whitespace):
//!
//! ```json
//! {
//!   "claim": {"@context": "http://schema.org", "@type": "Person"},
//!   "issuedAt": "2026-01-01T00:00:00Z",
//!   "issuer": {"publicKey": "02bc9c..."},
//!   "subject": {"publicKey": "02bc9c..."},
//!   "signature": "3045..."
//! }
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use k256::ecdsa::{signature::Verifier, Signature, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::mapping::AddressMapping;
use crate::crypto::keys::{IdentityKeyPair, KeyError};
use crate::identity::CruxId;

// ---------------------------------------------------------------------------
// Profile document
// ---------------------------------------------------------------------------

fn unsigned_profile(public_key: &str, issued_at: DateTime<Utc>) -> Value {
    json!({
        "claim": {"@context": "http://schema.org", "@type": "Person"},
        "issuedAt": issued_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        "issuer": {"publicKey": public_key},
        "subject": {"publicKey": public_key},
    })
}

/// Build and sign the profile document for `key_pair`.
pub fn build_profile(key_pair: &IdentityKeyPair, issued_at: DateTime<Utc>) -> Result<Value, KeyError> {
    let mut profile = unsigned_profile(&key_pair.public_key, issued_at);
    let signature = key_pair.sign_hex(profile.to_string().as_bytes())?;
    if let Value::Object(fields) = &mut profile {
        fields.insert("signature".into(), Value::String(signature));
    }
    Ok(profile)
}

/// The issuer public key of a profile document.
pub fn profile_public_key(profile: &Value) -> Option<&str> {
    profile.get("issuer")?.get("publicKey")?.as_str()
}

/// Check the profile signature against its own issuer key.
pub fn verify_profile(profile: &Value) -> bool {
    let verify = || -> Option<bool> {
        let public_key = hex::decode(profile_public_key(profile)?).ok()?;
        let signature = hex::decode(profile.get("signature")?.as_str()?).ok()?;
        let issued_at = profile.get("issuedAt")?.as_str()?;
        let issued_at = DateTime::parse_from_rfc3339(issued_at).ok()?.with_timezone(&Utc);

        let mut unsigned = unsigned_profile(profile_public_key(profile)?, issued_at);
        if let (Some(expected), Value::Object(fields)) = (profile.get("subject"), &mut unsigned) {
            fields.insert("subject".into(), expected.clone());
        }

        let key = VerifyingKey::from_sec1_bytes(&public_key).ok()?;
        let signature = Signature::from_der(&signature).ok()?;
        Some(key.verify(unsigned.to_string().as_bytes(), &signature).is_ok())
    };
    verify().unwrap_or(false)
}

// ---------------------------------------------------------------------------
// CruxUser
// ---------------------------------------------------------------------------

/// One published address, as seen by a reader without a client table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAddress {
    pub asset_id: String,
    pub address_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// Public profile of a CruxID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CruxUser {
    pub crux_id: CruxId,
    /// Identity public key (hex), when the profile names one.
    pub public_key: Option<String>,
    pub addresses: Vec<UserAddress>,
}

impl CruxUser {
    pub fn from_documents(crux_id: CruxId, profile: &Value, mapping: &AddressMapping) -> Self {
        let addresses = mapping
            .iter()
            .map(|(asset_id, address)| UserAddress {
                asset_id: asset_id.clone(),
                address_hash: address.address_hash.clone(),
                tag: address.tag.clone(),
            })
            .collect();
        Self {
            crux_id,
            public_key: profile_public_key(profile).map(str::to_string),
            addresses,
        }
    }

    pub fn address_for(&self, asset_id: &str) -> Option<&UserAddress> {
        self.addresses.iter().find(|a| a.asset_id == asset_id)
    }
}
