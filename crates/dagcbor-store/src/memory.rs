use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use dagcbor_types::{Block, Cid};

use crate::error::{StoreError, StoreResult};
use crate::traits::{BlockViewer, Blockstore};

/// In-memory, HashMap-based blockstore.
///
/// Intended for tests and embedding. Blocks sit behind a `RwLock`; reads
/// hand out cheap clones of the shared payload.
pub struct InMemoryBlockstore {
    blocks: RwLock<HashMap<Cid, Block>>,
}

impl InMemoryBlockstore {
    /// Create a new empty blockstore.
    pub fn new() -> Self {
        Self {
            blocks: RwLock::new(HashMap::new()),
        }
    }

    /// Number of blocks currently stored.
    pub fn len(&self) -> usize {
        self.blocks.read().expect("lock poisoned").len()
    }

    /// Whether no blocks are stored.
    pub fn is_empty(&self) -> bool {
        self.blocks.read().expect("lock poisoned").is_empty()
    }

    /// Whether a block is stored under `cid`.
    pub fn contains(&self, cid: &Cid) -> bool {
        self.blocks.read().expect("lock poisoned").contains_key(cid)
    }

    /// Remove a block. Returns `true` if it was present.
    pub fn delete(&self, cid: &Cid) -> bool {
        self.blocks
            .write()
            .expect("lock poisoned")
            .remove(cid)
            .is_some()
    }

    /// Total payload bytes across all blocks.
    pub fn total_bytes(&self) -> u64 {
        self.blocks
            .read()
            .expect("lock poisoned")
            .values()
            .map(Block::size)
            .sum()
    }

    /// Drop every stored block.
    pub fn clear(&self) {
        self.blocks.write().expect("lock poisoned").clear();
    }

    /// All identifiers, sorted.
    pub fn all_cids(&self) -> Vec<Cid> {
        let map = self.blocks.read().expect("lock poisoned");
        let mut cids: Vec<Cid> = map.keys().copied().collect();
        cids.sort();
        cids
    }
}

impl Default for InMemoryBlockstore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Blockstore for InMemoryBlockstore {
    async fn get(&self, cid: &Cid) -> StoreResult<Option<Block>> {
        let map = self.blocks.read().expect("lock poisoned");
        Ok(map.get(cid).cloned())
    }

    async fn put(&self, block: Block) -> StoreResult<()> {
        let mut map = self.blocks.write().expect("lock poisoned");
        map.entry(*block.cid()).or_insert(block);
        Ok(())
    }

    async fn get_many(&self, cids: &[Cid]) -> StoreResult<(Vec<Block>, Vec<Cid>)> {
        let map = self.blocks.read().expect("lock poisoned");
        let mut found = Vec::new();
        let mut missing = Vec::new();
        for cid in cids {
            match map.get(cid) {
                Some(block) => found.push(block.clone()),
                None => missing.push(*cid),
            }
        }
        Ok((found, missing))
    }

    async fn put_many(&self, blocks: Vec<Block>) -> StoreResult<()> {
        let mut map = self.blocks.write().expect("lock poisoned");
        for block in blocks {
            map.entry(*block.cid()).or_insert(block);
        }
        Ok(())
    }

    fn viewer(&self) -> Option<&dyn BlockViewer> {
        Some(self)
    }
}

impl BlockViewer for InMemoryBlockstore {
    fn view(&self, cid: &Cid, f: &mut dyn FnMut(&[u8]) -> StoreResult<()>) -> StoreResult<()> {
        let map = self.blocks.read().expect("lock poisoned");
        let block = map.get(cid).ok_or(StoreError::NotFound(*cid))?;
        f(block.data())
    }
}

impl std::fmt::Debug for InMemoryBlockstore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlockstore")
            .field("block_count", &self.len())
            .finish()
    }
}
