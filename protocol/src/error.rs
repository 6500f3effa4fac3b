//! Error types for the identity engine.
//!
//! Every engine operation that can fail returns a [`CruxError`]. Lower-level
//! modules keep their own error enums (`KeyError`, `TransportError`,
//! `HubError`) and get folded in here at the engine boundary, with the raw
//! upstream detail preserved as text.

use thiserror::Error;

use crate::crypto::keys::KeyError;
use crate::identity::IdentifierError;
use crate::network::hub::UploadableFile;

/// Coarse classification of a [`CruxError`].
///
/// Lets callers tell "this identity does not exist" apart from "it exists
/// but has not published that file" apart from "the network is down"
/// without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller handed in something malformed.
    Input,
    /// The identity or the requested data does not exist.
    NotFound,
    /// Secrets and on-chain state disagree.
    Identity,
    /// An upstream service answered, and the answer was no.
    Rejected,
    /// Transport or storage infrastructure failed.
    Infrastructure,
}

/// Per-file reason attached to [`CruxError::StorageUploadFailed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFailure {
    CruxPay,
    ClientConfig,
    AssetList,
    Generic,
}

/// Errors that can occur in the identity engine.
#[derive(Debug, Error)]
pub enum CruxError {
    /// The identifier is not `subdomain@domain.crux` (or its native form).
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// The claim has no recovery phrase, and the operation needs one.
    #[error("identity claim has no mnemonic")]
    MissingMnemonic,

    /// The claim has neither a key pair nor a phrase to derive one from.
    #[error("identity claim has neither a key pair nor a mnemonic")]
    MissingIdentityKeyPair,

    /// The naming system binds the identifier to a different owner.
    #[error("identity mismatch: claim owns {claimed}, naming system says {on_chain}")]
    IdentityMismatch {
        /// Address derived from the claim.
        claimed: String,
        /// Owner address reported by the naming system.
        on_chain: String,
    },

    /// An address mapping entry is not `{addressHash, secIdentifier?}`.
    #[error("address mapping entry `{asset_id}` is malformed: {reason}")]
    AddressMappingDecodingFailure {
        /// Key of the offending entry (empty when the whole document is bad).
        asset_id: String,
        /// Decoder message.
        reason: String,
    },

    /// The client application never declared this currency.
    #[error("currency {0} is not listed by the client")]
    AssetNotListedByClient(String),

    /// The owner published no address for this currency.
    #[error("currency {0} is not supported by the user")]
    AssetNotSupportedByUser(String),

    /// The profile document could not be uploaded during registration.
    #[error("profile upload failed: {0}")]
    ProfileUploadFailed(String),

    /// A storage upload failed. `kind` is chosen by file.
    #[error("upload of {file} failed ({kind:?}): {reason}")]
    StorageUploadFailed {
        file: UploadableFile,
        kind: UploadFailure,
        reason: String,
    },

    /// The registrar could not be reached at the transport layer.
    #[error("registrar unreachable: {0}")]
    RegistrarUnreachable(String),

    /// The registrar answered the registration with something other than `status: true`.
    #[error("registrar did not acknowledge the registration: {response}")]
    RegistrationAcknowledgementFailed {
        /// Raw registrar response body.
        response: String,
    },

    /// The naming system has no owner for this identifier.
    #[error("user {0} does not exist")]
    UserDoesNotExist(String),

    /// The owner exists but has not published the requested file.
    #[error("{owner} has not published {file}")]
    StorageEmptyResponse { owner: String, file: UploadableFile },

    /// Reading a published file failed at the transport layer.
    #[error("storage fetch failed: {0}")]
    StorageFetchFailed(String),

    /// No configured naming node answered.
    #[error("naming system unreachable: {0}")]
    NamingSystemUnreachable(String),

    /// Naming nodes disagree and no majority names an owner.
    #[error("naming nodes disagree about {0}")]
    NameIntegrityCheckFailed(String),

    /// Recovery phrase or key material is malformed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(#[from] KeyError),
}

impl CruxError {
    /// Which family of failure this is.
    pub fn category(&self) -> ErrorCategory {
        match self {
            CruxError::InvalidIdentifier(_)
            | CruxError::MissingMnemonic
            | CruxError::MissingIdentityKeyPair
            | CruxError::AddressMappingDecodingFailure { .. }
            | CruxError::AssetNotListedByClient(_)
            | CruxError::KeyDerivation(_) => ErrorCategory::Input,
            CruxError::AssetNotSupportedByUser(_)
            | CruxError::UserDoesNotExist(_)
            | CruxError::StorageEmptyResponse { .. } => ErrorCategory::NotFound,
            CruxError::IdentityMismatch { .. } | CruxError::NameIntegrityCheckFailed(_) => {
                ErrorCategory::Identity
            }
            CruxError::RegistrationAcknowledgementFailed { .. } => ErrorCategory::Rejected,
            CruxError::ProfileUploadFailed(_)
            | CruxError::StorageUploadFailed { .. }
            | CruxError::StorageFetchFailed(_)
            | CruxError::RegistrarUnreachable(_)
            | CruxError::NamingSystemUnreachable(_) => ErrorCategory::Infrastructure,
        }
    }
}

impl From<IdentifierError> for CruxError {
    fn from(e: IdentifierError) -> Self {
        CruxError::InvalidIdentifier(e.to_string())
    }
}
