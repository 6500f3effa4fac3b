//! # Naming Module
//!
//! Client side of the naming system and its off-chain registrar.
//!
//! ```text
//! resolver.rs   - fan-out lookup across mirror nodes, node agreement
//! status.rs     - pure registration status classification
//! registrar.rs  - registrar status query and subdomain submission
//! ```
//!
//! Network I/O lives in `resolver` and `registrar`; `status` is a pure
//! function of their answers and is tested without a transport.

pub mod registrar;
pub mod resolver;
pub mod status;

pub use registrar::RegistrarClient;
pub use resolver::{NameLookup, NameRecord, NameResolver, NodeAnswer, Owner};
pub use status::{RegistrationState, RegistrationStatus};
