//! # Multi-Node Name Resolution
//!
//! The naming system is read through several independent mirror nodes.
//! Mirrors lag each other, so a single answer is not the truth; the set of
//! answers is. The resolver therefore asks **every** configured node for
//! the same name, concurrently, and keeps every answer in node order:
//!
//! ```text
//!            +--> core.blockstack.org/v1/names/alice.cruxdev.id --> Record
//! lookup ----+--> bns.cruxpay.com/v1/names/alice.cruxdev.id     --> NotFound
//!            +--> bns.example.org/v1/names/alice.cruxdev.id     --> Failed
//! ```
//!
//! Interpreting the answers is left to [`NameLookup`]:
//!
//! - [`NameLookup::agreed_record`]: a record only when every node that
//!   answered returned the same record. A split (one mirror propagated, one
//!   not) yields `None`: the name is not settled yet.
//! - [`NameLookup::majority_record`]: a record held by a strict majority of
//!   answering nodes, for reads that must name an owner.
//!
//! "Not found" is an answer, not an error. A node failing at the transport
//! layer is logged and ignored. Only when *every* node fails does the lookup
//! fail, with [`CruxError::NamingSystemUnreachable`].

use futures::future::join_all;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::REGISTERED_SUBDOMAIN_STATUS;
use crate::error::CruxError;
use crate::identity::BlockstackId;
use crate::network::transport::{join_url, JsonResponse, JsonTransport};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// What a naming node reports for an existing name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct NameRecord {
    #[serde(default)]
    pub status: Option<String>,
    /// Owner address.
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub zonefile: Option<String>,
}

impl NameRecord {
    /// Anchored on chain as a subdomain.
    pub fn is_registered_subdomain(&self) -> bool {
        self.status.as_deref() == Some(REGISTERED_SUBDOMAIN_STATUS)
    }

    /// Records are the same for decision purposes when status and owner match.
    fn same_as(&self, other: &NameRecord) -> bool {
        self.status == other.status && self.address == other.address
    }
}

/// One node's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeAnswer {
    Record(NameRecord),
    NotFound,
    Failed(String),
}

impl NodeAnswer {
    /// Normalize a raw node response.
    ///
    /// 404, or a JSON body with neither an owner nor a registered status,
    /// means the name does not exist.
    pub fn from_response(response: &JsonResponse) -> Self {
        if response.is_not_found() {
            return NodeAnswer::NotFound;
        }
        if !response.is_success() {
            return NodeAnswer::Failed(format!("status {}", response.status));
        }
        let Some(body) = response.body.as_ref() else {
            return NodeAnswer::Failed("response is not JSON".into());
        };
        match serde_json::from_value::<NameRecord>(body.clone()) {
            Ok(record) if record.address.is_some() || record.is_registered_subdomain() => {
                NodeAnswer::Record(record)
            }
            Ok(_) => NodeAnswer::NotFound,
            Err(_) if matches!(body, Value::Object(_)) => NodeAnswer::NotFound,
            Err(e) => NodeAnswer::Failed(format!("unexpected body: {e}")),
        }
    }
}

// ---------------------------------------------------------------------------
// NameLookup
// ---------------------------------------------------------------------------

/// Every node's answer for one name, in configured node order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameLookup {
    pub name: String,
    pub answers: Vec<(String, NodeAnswer)>,
}

impl NameLookup {
    fn answering(&self) -> impl Iterator<Item = &NodeAnswer> {
        self.answers
            .iter()
            .map(|(_, a)| a)
            .filter(|a| !matches!(a, NodeAnswer::Failed(_)))
    }

    pub fn answering_count(&self) -> usize {
        self.answering().count()
    }

    /// Every answering node said "not found".
    pub fn is_unanimous_not_found(&self) -> bool {
        self.answering_count() > 0 && self.answering().all(|a| *a == NodeAnswer::NotFound)
    }

    /// The record every answering node agrees on.
    pub fn agreed_record(&self) -> Option<&NameRecord> {
        let mut answering = self.answering();
        let first = match answering.next()? {
            NodeAnswer::Record(r) => r,
            _ => return None,
        };
        answering
            .all(|a| matches!(a, NodeAnswer::Record(r) if r.same_as(first)))
            .then_some(first)
    }

    /// A record reported by more than half of the answering nodes.
    pub fn majority_record(&self) -> Option<&NameRecord> {
        let total = self.answering_count();
        let records: Vec<&NameRecord> = self
            .answering()
            .filter_map(|a| match a {
                NodeAnswer::Record(r) => Some(r),
                _ => None,
            })
            .collect();
        records.iter().copied().find(|candidate| {
            let votes = records.iter().filter(|r| r.same_as(candidate)).count();
            votes * 2 > total
        })
    }

    /// Answering nodes do not all say the same thing.
    pub fn is_split(&self) -> bool {
        self.answering_count() > 1 && self.agreed_record().is_none() && !self.is_unanimous_not_found()
    }

    /// Who owns the name, for reads of published data.
    ///
    /// Nodes that have not seen the name yet do not dispute an owner. Two
    /// different owners do, and then only a strict majority settles it.
    pub fn owner(&self) -> Owner<'_> {
        let mut owners: Vec<&str> = Vec::new();
        for answer in self.answering() {
            if let NodeAnswer::Record(NameRecord {
                address: Some(address),
                ..
            }) = answer
            {
                if !owners.contains(&address.as_str()) {
                    owners.push(address);
                }
            }
        }
        match owners.as_slice() {
            [] => Owner::Missing,
            [only] => Owner::Known(only),
            _ => match self.majority_record().and_then(|r| r.address.as_deref()) {
                Some(address) => Owner::Known(address),
                None => Owner::Disputed,
            },
        }
    }
}

/// Outcome of [`NameLookup::owner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner<'a> {
    /// No answering node names an owner.
    Missing,
    Known(&'a str),
    /// Nodes name different owners and none has a majority.
    Disputed,
}

// ---------------------------------------------------------------------------
// NameResolver
// ---------------------------------------------------------------------------

/// Fans a name query out to every configured naming node.
pub struct NameResolver {
    transport: Arc<dyn JsonTransport>,
    nodes: Vec<String>,
}

impl NameResolver {
    pub fn new(transport: Arc<dyn JsonTransport>, nodes: Vec<String>) -> Self {
        Self { transport, nodes }
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// Query every node for `name` and collect the answers.
    pub async fn lookup(&self, name: &BlockstackId) -> Result<NameLookup, CruxError> {
        let name = name.to_string();
        if self.nodes.is_empty() {
            return Err(CruxError::NamingSystemUnreachable(
                "no naming nodes configured".into(),
            ));
        }

        let requests = self.nodes.iter().map(|node| {
            let url = join_url(node, &format!("v1/names/{name}"));
            async move {
                debug!(%url, "querying naming node");
                let answer = match self.transport.get(&url).await {
                    Ok(response) => NodeAnswer::from_response(&response),
                    Err(e) => NodeAnswer::Failed(e.to_string()),
                };
                if let NodeAnswer::Failed(reason) = &answer {
                    warn!(%node, %reason, "naming node failed");
                }
                (node.clone(), answer)
            }
        });
        let answers = join_all(requests).await;
        let lookup = NameLookup { name, answers };

        if lookup.answering_count() == 0 {
            let reasons: Vec<String> = lookup
                .answers
                .iter()
                .map(|(node, answer)| match answer {
                    NodeAnswer::Failed(r) => format!("{node}: {r}"),
                    _ => node.clone(),
                })
                .collect();
            return Err(CruxError::NamingSystemUnreachable(reasons.join("; ")));
        }
        if lookup.is_split() {
            warn!(name = %lookup.name, "naming nodes disagree");
        }
        Ok(lookup)
    }
}
