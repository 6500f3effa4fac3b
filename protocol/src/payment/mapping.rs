//! # Address Mappings
//!
//! An identity publishes one JSON document listing its receive addresses:
//!
//! ```json
//! {
//!   "1d6e1a99-1e77-41e1-9ebb-0e216faa166a": {"addressHash": "1HX4bzHH...", "secIdentifier": "memo"},
//!   "9dbdc727-de68-4f2a-8956-04a38ed71ca5": {"addressHash": "0x0a2311..."}
//! }
//! ```
//!
//! The keys are **asset ids**, opaque strings. Nothing in the document says
//! which currency an asset id stands for; only the client application that
//! assigned them knows, through its private [`ClientAssetMap`]:
//!
//! ```text
//! "BTC" --ClientAssetMap--> "1d6e1a99-..." --AddressMapping--> {addressHash, tag}
//! ```
//!
//! Two clients with disjoint asset-id spaces can share one published
//! mapping, and a reader without the client table learns nothing about
//! which coins the owner holds.
//!
//! Each stage fails on its own terms: the client never listed the currency
//! ([`CruxError::AssetNotListedByClient`]) versus the owner never published
//! it ([`CruxError::AssetNotSupportedByUser`]).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::error::CruxError;

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// One receive address. Passed through untouched; no casing or format
/// normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(rename = "addressHash")]
    pub address_hash: String,

    /// Memo, destination tag or payment id, for chains that need one.
    #[serde(
        rename = "secIdentifier",
        alias = "tag",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub tag: Option<String>,
}

impl Address {
    pub fn new(address_hash: impl Into<String>) -> Self {
        Self {
            address_hash: address_hash.into(),
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

// ---------------------------------------------------------------------------
// AddressMapping
// ---------------------------------------------------------------------------

/// Asset id to address, as published by the owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressMapping(BTreeMap<String, Address>);

impl AddressMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and decode a mapping document.
    ///
    /// All or nothing: one malformed entry rejects the whole document, and
    /// the error names that entry.
    pub fn decode(document: &Value) -> Result<Self, CruxError> {
        let entries = document
            .as_object()
            .ok_or_else(|| CruxError::AddressMappingDecodingFailure {
                asset_id: String::new(),
                reason: "mapping must be a JSON object".into(),
            })?;

        let mut mapping = BTreeMap::new();
        for (asset_id, entry) in entries {
            let address = serde_json::from_value::<Address>(entry.clone()).map_err(|e| {
                CruxError::AddressMappingDecodingFailure {
                    asset_id: asset_id.clone(),
                    reason: e.to_string(),
                }
            })?;
            mapping.insert(asset_id.clone(), address);
        }
        Ok(Self(mapping))
    }

    /// The document form, with the published field names.
    pub fn to_value(&self) -> Value {
        // A map of plain strings always serializes.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn insert(&mut self, asset_id: impl Into<String>, address: Address) -> Option<Address> {
        self.0.insert(asset_id.into(), address)
    }

    pub fn get(&self, asset_id: &str) -> Option<&Address> {
        self.0.get(asset_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Address)> {
        self.0.iter()
    }
}

impl FromIterator<(String, Address)> for AddressMapping {
    fn from_iter<I: IntoIterator<Item = (String, Address)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// ClientAssetMap
// ---------------------------------------------------------------------------

/// A client application's currency code to asset id table.
///
/// Currency codes are case-insensitive (`btc` and `BTC` are the same key);
/// asset ids are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "HashMap<String, String>")]
pub struct ClientAssetMap(HashMap<String, String>);

impl ClientAssetMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, currency: &str, asset_id: impl Into<String>) {
        self.0.insert(currency.to_lowercase(), asset_id.into());
    }

    pub fn asset_id(&self, currency: &str) -> Option<&str> {
        self.0.get(&currency.to_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<HashMap<String, String>> for ClientAssetMap {
    fn from(raw: HashMap<String, String>) -> Self {
        raw.into_iter().collect()
    }
}

impl<C: AsRef<str>, A: Into<String>> FromIterator<(C, A)> for ClientAssetMap {
    fn from_iter<I: IntoIterator<Item = (C, A)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (currency, asset_id) in iter {
            map.insert(currency.as_ref(), asset_id);
        }
        map
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve `currency` through the client table, then the owner's mapping.
pub fn resolve_address<'a>(
    mapping: &'a AddressMapping,
    currency: &str,
    client_assets: &ClientAssetMap,
) -> Result<&'a Address, CruxError> {
    let asset_id = client_assets
        .asset_id(currency)
        .ok_or_else(|| CruxError::AssetNotListedByClient(currency.to_string()))?;
    mapping
        .get(asset_id)
        .ok_or_else(|| CruxError::AssetNotSupportedByUser(currency.to_string()))
}
