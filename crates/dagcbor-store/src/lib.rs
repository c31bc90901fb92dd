//! Content-addressed storage for DAG-CBOR objects.
//!
//! A [`CborStore`] sits on top of any [`Blockstore`] and stores values under
//! the identifier of their canonical encoding. Values reach the store in one
//! of two ways:
//!
//! - **Self-describing** values ([`CborBytes`], [`DagNode`](dagcbor_node::DagNode))
//!   serialize themselves and claim an identifier, which the store checks.
//! - Everything else goes through the store's
//!   [`Transcoder`](dagcbor_codec::Transcoder): object trees directly, host
//!   types wrapped in [`Registered`].
//!
//! # Storage Backends
//!
//! - [`InMemoryBlockstore`] -- `HashMap`-based store for tests and embedding
//!
//! `get_many` decodes in a background task; the [`Cursors`] handle it
//! returns stops that task when cancelled or dropped.

pub mod config;
pub mod cursor;
pub mod error;
pub mod memory;
pub mod store;
pub mod traits;
pub mod values;

pub use config::StoreConfig;
pub use cursor::{Cursor, Cursors, GetMany};
pub use error::{BoxError, StoreError, StoreResult};
pub use memory::InMemoryBlockstore;
pub use store::CborStore;
pub use traits::{BlockViewer, Blockstore, CborMarshaler, CborUnmarshaler, Loadable, Storable};
pub use values::{CborBytes, Registered};
