//! # Storage Hub
//!
//! Each identity owns a small bucket of JSON files on a Gaia-style storage
//! hub, keyed by its owner address. Writes are authorized by the identity's
//! private key; reads are public.
//!
//! ```text
//!   connect(private key)
//!     GET  {hub}/hub_info                      -> challenge_text, read_url_prefix
//!     token = base64({"publickey", "signature": DER(ECDSA(challenge))})
//!
//!   upload(session, file, json)
//!     POST {hub}/store/{address}/{file}        Authorization: bearer v0 token
//!
//!   fetch(owner address, file)
//!     GET  {read prefix}/{address}/{file}      404 / empty / non-JSON -> None
//! ```
//!
//! The engine treats the hub as an opaque collaborator behind
//! [`StorageHub`]. [`GaiaHub`] is the HTTP implementation, [`MemoryHub`]
//! keeps everything in-process.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use super::transport::{join_url, JsonTransport, TransportError};
use crate::crypto::hash::p2pkh_address;
use crate::crypto::keys::{compressed_public_key, signing_key_from_hex, KeyError};
use crate::error::UploadFailure;
use k256::ecdsa::{signature::Signer, Signature};

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// The fixed set of files the engine reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadableFile {
    /// Address mapping (`asset id -> address`).
    CruxPay,
    ClientConfig,
    ClientMapping,
    AssetList,
    /// Signed profile document written at registration.
    Profile,
}

impl UploadableFile {
    pub const ALL: [UploadableFile; 5] = [
        UploadableFile::CruxPay,
        UploadableFile::ClientConfig,
        UploadableFile::ClientMapping,
        UploadableFile::AssetList,
        UploadableFile::Profile,
    ];

    pub fn filename(self) -> &'static str {
        match self {
            UploadableFile::CruxPay => "cruxpay.json",
            UploadableFile::ClientConfig => "client-config.json",
            UploadableFile::ClientMapping => "client-mapping.json",
            UploadableFile::AssetList => "asset-list.json",
            UploadableFile::Profile => "profile.json",
        }
    }

    /// Sub-reason reported when uploading this file fails.
    pub fn upload_failure(self) -> UploadFailure {
        match self {
            UploadableFile::CruxPay => UploadFailure::CruxPay,
            UploadableFile::ClientConfig => UploadFailure::ClientConfig,
            UploadableFile::AssetList => UploadFailure::AssetList,
            UploadableFile::ClientMapping | UploadableFile::Profile => UploadFailure::Generic,
        }
    }
}

impl fmt::Display for UploadableFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.filename())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum HubError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("hub rejected the request (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("hub_info response is missing `{0}`")]
    MalformedHubInfo(&'static str),

    #[error(transparent)]
    Key(#[from] KeyError),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Write capability for one identity's storage bucket.
#[derive(Clone, PartialEq, Eq)]
pub struct HubSession {
    /// Owner address. Files live under this bucket.
    pub address: String,
    /// Public read prefix announced by the hub.
    pub url_prefix: String,
    /// Bearer token for writes.
    pub token: String,
    /// Hub write endpoint.
    pub server: String,
}

impl fmt::Debug for HubSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubSession")
            .field("address", &self.address)
            .field("url_prefix", &self.url_prefix)
            .field("token", &"<redacted>")
            .field("server", &self.server)
            .finish()
    }
}

#[async_trait]
pub trait StorageHub: Send + Sync {
    /// Obtain a write capability from the identity's private key.
    async fn connect(&self, private_key_hex: &str) -> Result<HubSession, HubError>;

    /// Store `content` as `file`. Returns the public URL of the file.
    async fn upload(
        &self,
        session: &HubSession,
        file: UploadableFile,
        content: &Value,
    ) -> Result<String, HubError>;

    /// Read `file` published by `owner_address`. `None` when not published.
    async fn fetch(&self, owner_address: &str, file: UploadableFile)
        -> Result<Option<Value>, HubError>;

    /// Write endpoint announced in registration zonefiles.
    fn write_url(&self) -> &str;
}

// ---------------------------------------------------------------------------
// GaiaHub
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct HubInfo {
    challenge_text: Option<String>,
    read_url_prefix: Option<String>,
}

/// Gaia-protocol hub over a [`JsonTransport`].
pub struct GaiaHub {
    transport: Arc<dyn JsonTransport>,
    write_url: String,
    read_url: String,
}

impl GaiaHub {
    pub fn new(
        transport: Arc<dyn JsonTransport>,
        write_url: impl Into<String>,
        read_url: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            write_url: write_url.into().trim_end_matches('/').to_string(),
            read_url: read_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Legacy `v0` auth token: base64 of the public key and a DER signature
    /// over the hub challenge.
    pub fn v0_token(private_key_hex: &str, challenge: &str) -> Result<String, KeyError> {
        let signing_key = signing_key_from_hex(private_key_hex)?;
        let signature: Signature = signing_key.sign(challenge.as_bytes());
        let payload = json!({
            "publickey": hex::encode(compressed_public_key(&signing_key)),
            "signature": hex::encode(signature.to_der().as_bytes()),
        });
        Ok(BASE64.encode(payload.to_string()))
    }
}

#[async_trait]
impl StorageHub for GaiaHub {
    async fn connect(&self, private_key_hex: &str) -> Result<HubSession, HubError> {
        let signing_key = signing_key_from_hex(private_key_hex)?;
        let address = p2pkh_address(&compressed_public_key(&signing_key));

        let response = self
            .transport
            .get(&join_url(&self.write_url, "hub_info"))
            .await?;
        if !response.is_success() {
            return Err(HubError::Rejected {
                status: response.status,
                body: response.body_text(),
            });
        }
        let info: HubInfo = response
            .body
            .and_then(|b| serde_json::from_value(b).ok())
            .ok_or(HubError::MalformedHubInfo("body"))?;
        let challenge = info
            .challenge_text
            .ok_or(HubError::MalformedHubInfo("challenge_text"))?;
        let url_prefix = info
            .read_url_prefix
            .ok_or(HubError::MalformedHubInfo("read_url_prefix"))?;

        debug!(%address, hub = %self.write_url, "connected to storage hub");
        Ok(HubSession {
            token: Self::v0_token(private_key_hex, &challenge)?,
            address,
            url_prefix,
            server: self.write_url.clone(),
        })
    }

    async fn upload(
        &self,
        session: &HubSession,
        file: UploadableFile,
        content: &Value,
    ) -> Result<String, HubError> {
        let url = join_url(
            &session.server,
            &format!("store/{}/{}", session.address, file.filename()),
        );
        let response = self
            .transport
            .post(&url, content, Some(&session.token))
            .await?;
        if !response.is_success() {
            return Err(HubError::Rejected {
                status: response.status,
                body: response.body_text(),
            });
        }
        let public_url = response
            .str_field("publicURL")
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}{}/{}", session.url_prefix, session.address, file));
        debug!(%file, %public_url, "uploaded");
        Ok(public_url)
    }

    async fn fetch(
        &self,
        owner_address: &str,
        file: UploadableFile,
    ) -> Result<Option<Value>, HubError> {
        let url = join_url(&self.read_url, &format!("{owner_address}/{}", file.filename()));
        let response = self.transport.get(&url).await?;
        if response.is_not_found() {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(HubError::Rejected {
                status: response.status,
                body: response.body_text(),
            });
        }
        // A missing blob comes back as an XML error page, i.e. no JSON body.
        Ok(response.body)
    }

    fn write_url(&self) -> &str {
        &self.write_url
    }
}

// ---------------------------------------------------------------------------
// MemoryHub
// ---------------------------------------------------------------------------

/// In-process hub. Useful for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryHub {
    write_url: String,
    files: RwLock<HashMap<(String, UploadableFile), Value>>,
    failing: RwLock<HashSet<UploadableFile>>,
}

impl MemoryHub {
    pub fn new(write_url: impl Into<String>) -> Self {
        Self {
            write_url: write_url.into(),
            ..Self::default()
        }
    }

    /// Make every upload of `file` fail until cleared.
    pub fn fail_uploads_of(&self, file: UploadableFile) {
        self.failing.write().insert(file);
    }

    pub fn clear_failures(&self) {
        self.failing.write().clear();
    }

    /// Seed a file directly, as if `owner_address` had published it.
    pub fn insert(&self, owner_address: &str, file: UploadableFile, content: Value) {
        self.files
            .write()
            .insert((owner_address.to_string(), file), content);
    }

    pub fn get(&self, owner_address: &str, file: UploadableFile) -> Option<Value> {
        self.files
            .read()
            .get(&(owner_address.to_string(), file))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

#[async_trait]
impl StorageHub for MemoryHub {
    async fn connect(&self, private_key_hex: &str) -> Result<HubSession, HubError> {
        let signing_key = signing_key_from_hex(private_key_hex)?;
        let address = p2pkh_address(&compressed_public_key(&signing_key));
        Ok(HubSession {
            url_prefix: format!("memory://{address}/"),
            token: String::new(),
            server: self.write_url.clone(),
            address,
        })
    }

    async fn upload(
        &self,
        session: &HubSession,
        file: UploadableFile,
        content: &Value,
    ) -> Result<String, HubError> {
        if self.failing.read().contains(&file) {
            return Err(HubError::Rejected {
                status: 500,
                body: format!("injected failure for {file}"),
            });
        }
        self.insert(&session.address, file, content.clone());
        Ok(format!("{}{}", session.url_prefix, file))
    }

    async fn fetch(
        &self,
        owner_address: &str,
        file: UploadableFile,
    ) -> Result<Option<Value>, HubError> {
        Ok(self.get(owner_address, file))
    }

    fn write_url(&self) -> &str {
        &self.write_url
    }
}
