//! The content-addressed object store.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use dagcbor_codec::Transcoder;
use dagcbor_hash::CidPrefix;
use dagcbor_node::DagNode;
use dagcbor_types::{Block, Cid};
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::cursor::{self, GetMany, Job};
use crate::error::{StoreError, StoreResult};
use crate::traits::{Blockstore, Loadable, Storable};

/// Puts values in and gets them out of a [`Blockstore`], keyed by the
/// identifier of their canonical encoding.
pub struct CborStore<B> {
    blocks: B,
    transcoder: Arc<Transcoder>,
    config: StoreConfig,
}

impl<B: Blockstore> CborStore<B> {
    /// A store with a transcoder covering only the built-in rules.
    pub fn new(blocks: B) -> Self {
        Self::with_transcoder(blocks, Arc::new(Transcoder::default()))
    }

    /// Create a new store encoding and decoding through `transcoder`.
    pub fn with_transcoder(blocks: B, transcoder: Arc<Transcoder>) -> Self {
        Self {
            blocks,
            transcoder,
            config: StoreConfig::default(),
        }
    }

    /// Replace the store configuration.
    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// The transcoder values pass through.
    pub fn transcoder(&self) -> &Transcoder {
        &self.transcoder
    }

    /// The configuration in effect.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The underlying blockstore.
    pub fn blockstore(&self) -> &B {
        &self.blocks
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Store a value and return its identifier.
    pub async fn put(&self, value: &dyn Storable) -> StoreResult<Cid> {
        let block = self.to_block(value)?;
        let cid = *block.cid();
        self.blocks.put(block).await?;
        debug!(cid = %cid, "stored object");
        Ok(cid)
    }

    /// Store several values in one blockstore call.
    ///
    /// Every value is serialized and checked first; one failure aborts the
    /// batch before anything is written.
    pub async fn put_many(&self, values: &[&dyn Storable]) -> StoreResult<Vec<Cid>> {
        let blocks = values
            .iter()
            .map(|v| self.to_block(*v))
            .collect::<StoreResult<Vec<_>>>()?;
        let cids: Vec<Cid> = blocks.iter().map(|b| *b.cid()).collect();
        self.blocks.put_many(blocks).await?;
        debug!(count = cids.len(), "stored objects");
        Ok(cids)
    }

    fn to_block(&self, value: &dyn Storable) -> StoreResult<Block> {
        let claimed = value.cid();
        let prefix = match &claimed {
            Some(cid) => {
                let own = CidPrefix::from_cid(cid)?;
                CidPrefix {
                    codec: own.codec,
                    length: own.length,
                    ..CidPrefix::dag_cbor(own.hash)
                }
            }
            None => self.config.prefix(),
        };

        let block = match value.as_marshaler() {
            Some(marshaler) => {
                let raw = marshaler
                    .marshal_cbor()
                    .map_err(StoreError::Serialization)?;
                Block::new(prefix.sum(&raw)?, raw)
            }
            None => DagNode::wrap_object(&self.transcoder, value.as_any(), prefix)?.to_block(),
        };

        let actual = *block.cid();
        if let Some(expected) = claimed {
            if expected != actual {
                warn!(expected = %expected, actual = %actual, "value hashes elsewhere than its claimed identifier");
                return Err(StoreError::CidMismatch { expected, actual });
            }
        }
        Ok(block)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Decode the object under `cid` into `out`.
    ///
    /// Decodes straight from the blockstore's bytes when it offers a
    /// viewer.
    pub async fn get(&self, cid: &Cid, out: &mut dyn Loadable) -> StoreResult<()> {
        if let Some(viewer) = self.blocks.viewer() {
            return viewer.view(cid, &mut |bytes| load_into(&self.transcoder, bytes, out));
        }
        let block = self.fetch(cid).await?;
        load_into(&self.transcoder, block.data(), out)
    }

    /// The object under `cid` as a wrapped node. The identifier is trusted,
    /// not recomputed.
    pub async fn get_node(&self, cid: &Cid) -> StoreResult<DagNode> {
        let block = self.fetch(cid).await?;
        Ok(DagNode::decode_block_with(&self.transcoder, &block)?)
    }

    async fn fetch(&self, cid: &Cid) -> StoreResult<Block> {
        self.blocks
            .get(cid)
            .await?
            .ok_or(StoreError::NotFound(*cid))
    }

    /// Fetch many objects in one blockstore call and decode them in the
    /// background, one output slot per identifier.
    ///
    /// Slots for missing identifiers are dropped; those identifiers come
    /// back in [`GetMany::missing`].
    pub async fn get_many<T: Loadable + 'static>(
        &self,
        cids: &[Cid],
        outs: Vec<T>,
    ) -> StoreResult<GetMany<T>> {
        if cids.len() != outs.len() {
            return Err(StoreError::LengthMismatch {
                cids: cids.len(),
                outs: outs.len(),
            });
        }

        let (found, missing) = self.blocks.get_many(cids).await?;
        let found: HashMap<Cid, Bytes> = found.into_iter().map(Block::into_parts).collect();
        let jobs: Vec<Job<T>> = cids
            .iter()
            .zip(outs)
            .enumerate()
            .filter_map(|(index, (cid, out))| {
                found.get(cid).map(|bytes| Job {
                    cid: *cid,
                    index,
                    bytes: bytes.clone(),
                    out,
                })
            })
            .collect();
        debug!(
            requested = cids.len(),
            found = jobs.len(),
            missing = missing.len(),
            "get_many"
        );

        let cursors = cursor::spawn(Arc::clone(&self.transcoder), jobs, self.config.cursor_buffer);
        Ok(GetMany { missing, cursors })
    }
}

impl<B> std::fmt::Debug for CborStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CborStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Decode `bytes` into `out`, preferring the slot's own unmarshaler.
pub(crate) fn load_into(
    transcoder: &Transcoder,
    bytes: &[u8],
    out: &mut dyn Loadable,
) -> StoreResult<()> {
    if let Some(unmarshaler) = out.as_unmarshaler() {
        return unmarshaler
            .unmarshal_cbor(bytes)
            .map_err(StoreError::Serialization);
    }
    let node = transcoder.decode(bytes)?;
    transcoder.unmarshal_into(node, out.as_any_mut())?;
    Ok(())
}
