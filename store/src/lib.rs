//! Table-store gateway, catalog, and cart/session state for the Printworks
//! storefront.
//!
//! Everything the storefront persists lives in a hosted table-store (a
//! spreadsheet-as-database service with a REST API): the artwork and icon
//! catalog, deployment keys, and one row per visitor session holding that
//! visitor's cart. This crate owns the wire types for those tables, a typed
//! REST client, the catalog snapshot cache, the pure cart reconciliation
//! rules, and the session-store seam with its table-backed implementation.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  cart (pure reconciliation, no I/O)      │
//! ├──────────────────────────────────────────┤
//! │  catalog / session / sweep               │  ← domain records, seams
//! ├──────────────────────────────────────────┤
//! │  client / rows                           │  ← REST gateway, wire shapes
//! └──────────────────────────────────────────┘
//! ```
//!
//! Cart mutations are read-modify-write against the external rows with no
//! version check; concurrent requests for one session are last-writer-wins.
//! That risk is accepted rather than mitigated — the table-store is the
//! single source of truth and nothing is cached in process besides the
//! timestamp-gated catalog snapshot.

pub mod cart;
pub mod catalog;
pub mod client;
pub mod error;
pub mod rows;
pub mod session;
pub mod sweep;

pub use cart::{CART_CAPACITY, Cart, CartItem};
pub use catalog::{Artwork, CatalogCache, Icon, price_for};
pub use client::TableStore;
pub use error::{CartError, Result, StoreError};
#[cfg(any(test, feature = "test-utils"))]
pub use session::MemorySessionStore;
pub use session::{SessionId, SessionRecord, SessionState, SessionStore, TableSessionStore};
