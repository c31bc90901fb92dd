//! Collaborator and capability traits.

use std::any::Any;

use async_trait::async_trait;
use dagcbor_types::{Block, Cid};

use crate::error::{BoxError, StoreResult};

/// Content-addressed block storage backing a [`CborStore`](crate::CborStore).
///
/// Implementations provide their own concurrency safety; the store adds no
/// locking of its own.
#[async_trait]
pub trait Blockstore: Send + Sync {
    /// Fetch a block. `Ok(None)` when it is absent.
    async fn get(&self, cid: &Cid) -> StoreResult<Option<Block>>;

    /// Store a block. Storing an existing identifier is a no-op.
    async fn put(&self, block: Block) -> StoreResult<()>;

    /// Fetch many blocks at once, returning the blocks found and the
    /// identifiers that were not.
    ///
    /// Default implementation calls `get()` for each identifier.
    async fn get_many(&self, cids: &[Cid]) -> StoreResult<(Vec<Block>, Vec<Cid>)> {
        let mut found = Vec::new();
        let mut missing = Vec::new();
        for cid in cids {
            match self.get(cid).await? {
                Some(block) => found.push(block),
                None => missing.push(*cid),
            }
        }
        Ok((found, missing))
    }

    /// Store many blocks.
    ///
    /// Default implementation calls `put()` for each block.
    async fn put_many(&self, blocks: Vec<Block>) -> StoreResult<()> {
        for block in blocks {
            self.put(block).await?;
        }
        Ok(())
    }

    /// Zero-copy access, if the backend supports it.
    fn viewer(&self) -> Option<&dyn BlockViewer> {
        None
    }
}

/// Borrowed access to stored bytes without copying them out.
pub trait BlockViewer: Send + Sync {
    /// Call `f` with the bytes stored under `cid`. The bytes must not be
    /// retained past the call.
    fn view(&self, cid: &Cid, f: &mut dyn FnMut(&[u8]) -> StoreResult<()>) -> StoreResult<()>;
}

/// A value that writes its own binary form.
pub trait CborMarshaler {
    fn marshal_cbor(&self) -> Result<Vec<u8>, BoxError>;
}

/// A value that reads its own binary form.
pub trait CborUnmarshaler {
    fn unmarshal_cbor(&mut self, bytes: &[u8]) -> Result<(), BoxError>;
}

/// Anything that can be put into a store.
///
/// Values without a marshaler go through the store's transcoder, keyed by
/// their concrete type. A value that also reports an identifier is
/// self-describing: its bytes must hash to that identifier.
pub trait Storable: Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn as_marshaler(&self) -> Option<&dyn CborMarshaler> {
        None
    }

    /// The identifier this value claims for itself.
    fn cid(&self) -> Option<Cid> {
        None
    }
}

/// Anything a store can decode into.
pub trait Loadable: Send {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn as_unmarshaler(&mut self) -> Option<&mut dyn CborUnmarshaler> {
        None
    }
}
