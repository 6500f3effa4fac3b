//! # Registration Status
//!
//! Registration is asynchronous. After the registrar accepts a name it sits
//! in the registrar's queue, then in a batch transaction, then on chain
//! where the naming nodes finally see it. Status is recomputed from scratch
//! on every query; nothing is cached.
//!
//! | on-chain (agreed by nodes)          | registrar says               | result                   |
//! |-------------------------------------|------------------------------|--------------------------|
//! | registered, owner == claim          | (not asked)                  | `DONE`, propagated       |
//! | registered, owner != claim          | (not asked)                  | `REJECT`                 |
//! | anything else                       | registered in transaction .. | `PENDING`, registrar     |
//! | anything else                       | queued for update ..         | `PENDING`, blockchain    |
//! | anything else                       | not registered ..            | `NONE`, not registered   |
//! | anything else                       | anything else                | `NONE`                   |
//!
//! The registrar's own "Subdomain propagated" message lands in the last row.
//! Only the naming nodes get to say a name is done.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::resolver::NameRecord;
use crate::config::{
    REGISTRAR_IN_TRANSACTION_PREFIX, REGISTRAR_NOT_REGISTERED, REGISTRAR_PROPAGATED,
    REGISTRAR_QUEUED,
};

pub const DETAIL_NOT_REGISTERED: &str = "Subdomain not registered with this registrar.";
pub const DETAIL_PENDING_REGISTRAR: &str = "Subdomain registration pending on registrar.";
pub const DETAIL_PENDING_BLOCKCHAIN: &str = "Subdomain registration pending on blockchain.";
pub const DETAIL_DONE: &str = "Subdomain propagated.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RegistrationState {
    None,
    Pending,
    Done,
    Reject,
}

impl fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RegistrationState::None => "NONE",
            RegistrationState::Pending => "PENDING",
            RegistrationState::Done => "DONE",
            RegistrationState::Reject => "REJECT",
        };
        f.write_str(s)
    }
}

/// A state plus human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationStatus {
    pub status: RegistrationState,
    pub status_detail: String,
}

impl RegistrationStatus {
    fn with(status: RegistrationState, detail: &str) -> Self {
        Self {
            status,
            status_detail: detail.to_string(),
        }
    }

    /// `NONE` with no detail. Also the answer when no identity is known.
    pub fn none() -> Self {
        Self::with(RegistrationState::None, "")
    }

    /// Decide from the on-chain record alone.
    ///
    /// `Some` only when the record is an anchored subdomain; otherwise the
    /// registrar has to be asked.
    pub fn from_on_chain(record: &NameRecord, claimed_address: &str) -> Option<Self> {
        if !record.is_registered_subdomain() {
            return None;
        }
        if record.address.as_deref() == Some(claimed_address) {
            Some(Self::with(RegistrationState::Done, DETAIL_DONE))
        } else {
            Some(Self::with(RegistrationState::Reject, ""))
        }
    }

    /// Classify the registrar's free-text status.
    pub fn from_registrar(raw: Option<&str>) -> Self {
        match raw {
            Some(s) if s.contains(REGISTRAR_IN_TRANSACTION_PREFIX) => {
                Self::with(RegistrationState::Pending, DETAIL_PENDING_REGISTRAR)
            }
            Some(REGISTRAR_QUEUED) => Self::with(RegistrationState::Pending, DETAIL_PENDING_BLOCKCHAIN),
            Some(REGISTRAR_NOT_REGISTERED) => {
                Self::with(RegistrationState::None, DETAIL_NOT_REGISTERED)
            }
            Some(REGISTRAR_PROPAGATED) => {
                debug!("ignoring registrar propagation notice, naming nodes decide");
                Self::none()
            }
            _ => Self::none(),
        }
    }

    /// Both stages in order. `registrar` is only consulted when the record
    /// does not settle it.
    pub fn from_sources(
        on_chain: Option<&NameRecord>,
        claimed_address: &str,
        registrar: Option<&str>,
    ) -> Self {
        on_chain
            .and_then(|r| Self::from_on_chain(r, claimed_address))
            .unwrap_or_else(|| Self::from_registrar(registrar))
    }

    pub fn is_final(&self) -> bool {
        matches!(self.status, RegistrationState::Done | RegistrationState::Reject)
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.status_detail.is_empty() {
            write!(f, "{}", self.status)
        } else {
            write!(f, "{} ({})", self.status, self.status_detail)
        }
    }
}
