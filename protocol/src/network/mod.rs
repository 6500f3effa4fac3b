//! # Network Module
//!
//! The engine's two outbound collaborators.
//!
//! ```text
//! transport.rs  - JSON-over-HTTP request primitive (reqwest in production)
//! hub.rs        - Per-identity storage hub: connect, upload, fetch
//! ```
//!
//! ## Design Decisions
//!
//! - Both are traits (`JsonTransport`, `StorageHub`) so the whole engine
//!   runs against in-process doubles in tests. No test touches a socket.
//! - The transport never interprets status codes. A 404 from a naming node
//!   means "no such name", a 404 from the hub means "not published"; only
//!   the caller knows which.
//! - No retries or backoff here. Each call completes or fails once.

pub mod hub;
pub mod transport;

pub use hub::{GaiaHub, HubError, HubSession, MemoryHub, StorageHub, UploadableFile};
pub use transport::{join_url, HttpTransport, JsonResponse, JsonTransport, TransportError};
