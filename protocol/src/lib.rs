// Copyright (c) 2026 CruxPay Contributors. MIT License.
// See LICENSE for details.

//! # CruxPay Protocol: Identity Engine
//!
//! Resolves human-readable payment identifiers (`alice@cruxdev.crux`) to
//! cryptocurrency addresses, and lets an identity owner register a name and
//! publish where they want to be paid.
//!
//! Two pieces of outside infrastructure do the heavy lifting: a
//! blockchain-anchored naming system, read through several mirror nodes,
//! and a per-identity storage hub. This crate is the client that turns
//! their eventually-consistent answers into one decision: *is this identity
//! registered, and what address does it expose for this coin?*
//!
//! ## Architecture
//!
//! - **config**: Protocol constants and caller-supplied endpoints.
//! - **crypto**: Recovery phrase to identity key, owner address encoding.
//! - **identity**: CruxID parsing and translation, identity claims.
//! - **network**: JSON transport and storage hub collaborators.
//! - **naming**: Multi-node name lookup, registrar client, status table.
//! - **payment**: Address mappings, client asset indirection, public profile.
//! - **service**: The engine tying it together.
//! - **error**: One error type for every engine operation.
//!
//! ## Design Philosophy
//!
//! 1. On-chain truth beats the registrar's queue, every time.
//! 2. "Not found" is an answer. Transport failure is an error. Never
//!    confuse the two.
//! 3. Secrets are never logged and never retained by the engine.
//! 4. Decisions are pure functions of collected answers, so they are tested
//!    without a network.

pub mod config;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod naming;
pub mod network;
pub mod payment;
pub mod service;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use error::{CruxError, ErrorCategory};
pub use service::{CruxNameService, Session};
