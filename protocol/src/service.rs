//! # CruxID Name Service
//!
//! The engine. [`CruxNameService`] drives an identity through its
//! lifecycle and answers questions about other identities:
//!
//! ```text
//!   generate_identity ----+
//!                         +--> Session { claim, couple } --> get_registration_status
//!   restore_identity -----+              ^
//!   register_name --------------------- -+
//!
//!   get_name_availability    registrar only
//!   put_address_mapping      storage hub only
//!   get_address_mapping      naming nodes -> storage hub
//!   resolve_address          naming nodes -> storage hub -> client asset table
//!   get_crux_user            naming nodes -> storage hub (profile + mapping)
//! ```
//!
//! ## Sessions
//!
//! The engine holds no per-identity state. Restoring or registering returns
//! a [`Session`] and the caller passes its [`IdentityCouple`] back when it
//! wants a status. Two callers sharing one service never see each other's
//! identity.
//!
//! ## Registration
//!
//! Registration is profile upload, then one registrar submission, with no
//! retry and no rollback. A registration that fails after the profile
//! upload can be retried as a whole: the same phrase derives the same key
//! and the same zonefile. Registrations on one service instance are
//! serialized.

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::crypto::keys::{derive_identity_keypair, generate_mnemonic, IdentityKeyPair};
use crate::error::CruxError;
use crate::identity::{CruxId, IdentityClaim, IdentityCouple};
use crate::naming::{NameResolver, Owner, RegistrarClient, RegistrationStatus};
use crate::network::hub::{GaiaHub, HubError, StorageHub, UploadableFile};
use crate::network::transport::{HttpTransport, JsonTransport, TransportError};
use crate::payment::mapping::{resolve_address, Address, AddressMapping, ClientAssetMap};
use crate::payment::user::{build_profile, verify_profile, CruxUser};

/// A restored or freshly registered identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// The claim with its key pair filled in.
    pub claim: IdentityClaim,
    pub couple: IdentityCouple,
}

pub struct CruxNameService {
    config: EngineConfig,
    resolver: NameResolver,
    registrar: RegistrarClient,
    hub: Arc<dyn StorageHub>,
    registration: Mutex<()>,
}

impl CruxNameService {
    /// Build a service over explicit collaborators.
    pub fn new(
        config: EngineConfig,
        transport: Arc<dyn JsonTransport>,
        hub: Arc<dyn StorageHub>,
    ) -> Self {
        let resolver = NameResolver::new(Arc::clone(&transport), config.resolved_bns_nodes());
        let registrar = RegistrarClient::new(transport, config.subdomain_registrar.clone());
        Self {
            config,
            resolver,
            registrar,
            hub,
            registration: Mutex::new(()),
        }
    }

    /// Build a service talking HTTP to the configured endpoints.
    pub fn over_http(config: EngineConfig) -> Result<Self, TransportError> {
        let transport: Arc<dyn JsonTransport> =
            Arc::new(HttpTransport::new(config.request_timeout())?);
        let hub = Arc::new(GaiaHub::new(
            Arc::clone(&transport),
            config.gaia_hub.clone(),
            config.gaia_read_url.clone(),
        ));
        Ok(Self::new(config, transport, hub))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Identity lifecycle
    // -----------------------------------------------------------------------

    /// Fresh phrase and its key pair. The phrase is only ever returned here;
    /// the caller must keep it.
    pub fn generate_identity(&self) -> Result<IdentityClaim, CruxError> {
        let mnemonic = generate_mnemonic()?;
        let key_pair = derive_identity_keypair(&mnemonic)?;
        info!(address = %key_pair.address, "generated new identity");
        Ok(IdentityClaim::new(mnemonic, key_pair))
    }

    /// Bind `claim` to `full_id`. Any owner the naming nodes report must be
    /// the claim's address, even while a lagging node has not seen the name.
    pub async fn restore_identity(
        &self,
        full_id: &str,
        claim: &IdentityClaim,
    ) -> Result<Session, CruxError> {
        let claim = complete_with_mnemonic(claim)?;
        let claimed = claim_address(&claim)?.to_string();
        let crux_id = CruxId::parse(full_id)?;
        let couple = IdentityCouple::from(crux_id);

        let lookup = self.resolver.lookup(&couple.bs_id).await?;
        match lookup.owner() {
            Owner::Known(on_chain) if on_chain != claimed => {
                return Err(CruxError::IdentityMismatch {
                    claimed,
                    on_chain: on_chain.to_string(),
                });
            }
            Owner::Disputed => {
                return Err(CruxError::NameIntegrityCheckFailed(couple.crux_id.to_string()));
            }
            Owner::Known(_) | Owner::Missing => {}
        }

        info!(crux_id = %couple.crux_id, "identity restored");
        Ok(Session { claim, couple })
    }

    /// Register `subdomain` under the configured domain for `claim`.
    pub async fn register_name(
        &self,
        claim: &IdentityClaim,
        subdomain: &str,
    ) -> Result<Session, CruxError> {
        let _guard = self.registration.lock().await;

        let claim = complete_with_mnemonic(claim)?;
        let key_pair = claim.key_pair().ok_or(CruxError::MissingIdentityKeyPair)?;
        let crux_id = CruxId::new(subdomain, self.config.domain.clone())?;

        self.upload_profile(key_pair).await?;
        self.registrar
            .register(subdomain, &key_pair.address, self.hub.write_url())
            .await?;

        let couple = IdentityCouple::from(crux_id);
        info!(crux_id = %couple.crux_id, "name submitted for registration");
        Ok(Session { claim, couple })
    }

    async fn upload_profile(&self, key_pair: &IdentityKeyPair) -> Result<(), CruxError> {
        let profile = build_profile(key_pair, Utc::now())?;
        let session = self
            .hub
            .connect(key_pair.private_key_hex())
            .await
            .map_err(|e| CruxError::ProfileUploadFailed(e.to_string()))?;
        self.hub
            .upload(&session, UploadableFile::Profile, &profile)
            .await
            .map_err(|e| CruxError::ProfileUploadFailed(e.to_string()))?;
        Ok(())
    }

    /// Where a registration stands right now. `NONE` without I/O when there
    /// is no session.
    pub async fn get_registration_status(
        &self,
        session: Option<&IdentityCouple>,
        claim: &IdentityClaim,
    ) -> Result<RegistrationStatus, CruxError> {
        let Some(couple) = session else {
            return Ok(RegistrationStatus::none());
        };
        let claim = complete_any(claim)?;
        let claimed = claim_address(&claim)?;

        let lookup = self.resolver.lookup(&couple.bs_id).await?;
        if let Some(status) = lookup
            .agreed_record()
            .and_then(|r| RegistrationStatus::from_on_chain(r, claimed))
        {
            return Ok(status);
        }
        let raw = self.registrar.status(couple.bs_id.subdomain()).await?;
        Ok(RegistrationStatus::from_registrar(raw.as_deref()))
    }

    /// Whether the registrar would accept `subdomain`.
    pub async fn get_name_availability(&self, subdomain: &str) -> Result<bool, CruxError> {
        self.registrar.is_available(subdomain).await
    }

    // -----------------------------------------------------------------------
    // Address mappings
    // -----------------------------------------------------------------------

    /// Validate and publish an address mapping document for `claim`.
    pub async fn put_address_mapping(
        &self,
        claim: &IdentityClaim,
        document: &Value,
    ) -> Result<AddressMapping, CruxError> {
        let claim = complete_any(claim)?;
        let key_pair = claim.key_pair().ok_or(CruxError::MissingIdentityKeyPair)?;
        let mapping = AddressMapping::decode(document)?;

        let file = UploadableFile::CruxPay;
        let upload_failed = |e: HubError| CruxError::StorageUploadFailed {
            file,
            kind: file.upload_failure(),
            reason: e.to_string(),
        };
        let session = self
            .hub
            .connect(key_pair.private_key_hex())
            .await
            .map_err(upload_failed)?;
        self.hub
            .upload(&session, file, &mapping.to_value())
            .await
            .map_err(upload_failed)?;

        info!(address = %key_pair.address, entries = mapping.len(), "address mapping published");
        Ok(mapping)
    }

    /// The mapping published by `full_id`.
    pub async fn get_address_mapping(&self, full_id: &str) -> Result<AddressMapping, CruxError> {
        let crux_id = CruxId::parse(full_id)?;
        let owner = self.owner_address(&crux_id).await?;
        let document = self.fetch_published(&owner, UploadableFile::CruxPay).await?;
        AddressMapping::decode(&document)
    }

    /// The address `full_id` publishes for `currency`, as seen through
    /// `client_assets`.
    pub async fn resolve_address(
        &self,
        full_id: &str,
        currency: &str,
        client_assets: &ClientAssetMap,
    ) -> Result<Address, CruxError> {
        let mapping = self.get_address_mapping(full_id).await?;
        resolve_address(&mapping, currency, client_assets).cloned()
    }

    /// Public profile of `full_id`.
    pub async fn get_crux_user(&self, full_id: &str) -> Result<CruxUser, CruxError> {
        let crux_id = CruxId::parse(full_id)?;
        let owner = self.owner_address(&crux_id).await?;
        let profile = self.fetch_published(&owner, UploadableFile::Profile).await?;
        if !verify_profile(&profile) {
            warn!(%crux_id, "profile signature does not verify");
        }
        let document = self.fetch_published(&owner, UploadableFile::CruxPay).await?;
        let mapping = AddressMapping::decode(&document)?;
        Ok(CruxUser::from_documents(crux_id, &profile, &mapping))
    }

    async fn owner_address(&self, crux_id: &CruxId) -> Result<String, CruxError> {
        let lookup = self.resolver.lookup(&crux_id.to_blockstack()).await?;
        match lookup.owner() {
            Owner::Known(address) => Ok(address.to_string()),
            Owner::Missing => Err(CruxError::UserDoesNotExist(crux_id.to_string())),
            Owner::Disputed => Err(CruxError::NameIntegrityCheckFailed(crux_id.to_string())),
        }
    }

    async fn fetch_published(&self, owner: &str, file: UploadableFile) -> Result<Value, CruxError> {
        self.hub
            .fetch(owner, file)
            .await
            .map_err(|e| CruxError::StorageFetchFailed(e.to_string()))?
            .ok_or_else(|| CruxError::StorageEmptyResponse {
                owner: owner.to_string(),
                file,
            })
    }
}

/// Operations that must be able to re-derive the key need the phrase.
fn complete_with_mnemonic(claim: &IdentityClaim) -> Result<IdentityClaim, CruxError> {
    if claim.mnemonic().is_none() {
        return Err(CruxError::MissingMnemonic);
    }
    complete_any(claim)
}

fn complete_any(claim: &IdentityClaim) -> Result<IdentityClaim, CruxError> {
    let mut claim = claim.clone();
    if !claim.complete()? {
        return Err(CruxError::MissingIdentityKeyPair);
    }
    Ok(claim)
}

fn claim_address(claim: &IdentityClaim) -> Result<&str, CruxError> {
    claim.address().ok_or(CruxError::MissingIdentityKeyPair)
}
