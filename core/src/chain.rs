//! Read access to confirmed blocks.
//!
//! The wallet never validates consensus; it trusts the chain view to hand it
//! blocks in ascending, gapless height order and checks only that contract.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use tenebra_block::Block;
use tenebra_privacy::{DecoySelection, RingMember, select_decoys};
use tenebra_transaction::{Transaction, TransparentOutput};

pub trait ChainView: Send + Sync {
    /// Up to `limit` consecutive blocks starting at `start`.
    fn get_blocks(&self, start: u64, limit: u64) -> Result<Vec<Block>>;

    /// Number of blocks on chain; the next block gets this height.
    fn chain_height(&self) -> Result<u64>;

    /// Number of private outputs on chain.
    fn output_count(&self) -> Result<u64>;

    /// Ring members for the given global output indices, in order.
    fn get_outputs(&self, indices: &[u64]) -> Result<Vec<RingMember>>;

    fn get_transparent_output(&self, tx_src: &[u8; 32], offset: u32)
    -> Result<Option<TransparentOutput>>;

    /// Decoy indices around a real output.
    fn get_mixins(&self, real_index: u64) -> Result<DecoySelection> {
        let max = self.output_count()?;
        Ok(select_decoys(&mut rand::thread_rng(), real_index, max)?)
    }
}

#[derive(Default)]
struct ChainInner {
    blocks: Vec<Block>,
    outputs: Vec<RingMember>,
    transparent: HashMap<([u8; 32], u32), TransparentOutput>,
}

/// In-process chain used by local runs and tests.
#[derive(Default)]
pub struct MemoryChain {
    inner: RwLock<ChainInner>,
}

impl MemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seal `transactions` into the next block and append it.
    pub fn append(
        &self,
        coinbase: Option<Transaction>,
        transactions: Vec<Transaction>,
    ) -> Result<Block> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let prev_hash = match inner.blocks.last() {
            Some(block) => block.hash()?,
            None => [0; 32],
        };
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let block = Block::new(
            inner.blocks.len() as u64,
            prev_hash,
            inner.outputs.len() as u64,
            timestamp,
            coinbase,
            transactions,
        );
        index_block(&mut inner, &block)?;
        inner.blocks.push(block.clone());
        Ok(block)
    }

    /// Append a block as-is. Its height and output index must line up.
    pub fn push_block(&self, block: Block) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let expected = inner.blocks.len() as u64;
        if block.height() != expected {
            bail!("block height {} does not extend chain at {}", block.height(), expected);
        }
        if block.header.first_output_index != inner.outputs.len() as u64 {
            bail!("block output index does not follow the chain");
        }
        index_block(&mut inner, &block)?;
        inner.blocks.push(block);
        Ok(())
    }

    pub fn block(&self, height: u64) -> Option<Block> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.blocks.get(height as usize).cloned()
    }
}

fn index_block(inner: &mut ChainInner, block: &Block) -> Result<()> {
    for indexed in block.private_outputs() {
        inner.outputs.push(RingMember {
            index: indexed.global_index,
            one_time_key: indexed.output.one_time_key,
            commitment: indexed.output.commitment,
        });
    }
    for tx in block.all_transactions() {
        for (offset, output) in tx.transparent_outputs().iter().enumerate() {
            let offset = u32::try_from(offset).context("transparent output offset overflow")?;
            inner.transparent.insert((tx.id().0, offset), *output);
        }
    }
    Ok(())
}

impl ChainView for MemoryChain {
    fn get_blocks(&self, start: u64, limit: u64) -> Result<Vec<Block>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner
            .blocks
            .iter()
            .skip(start as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    fn chain_height(&self) -> Result<u64> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.blocks.len() as u64)
    }

    fn output_count(&self) -> Result<u64> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.outputs.len() as u64)
    }

    fn get_outputs(&self, indices: &[u64]) -> Result<Vec<RingMember>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        indices
            .iter()
            .map(|&index| {
                inner
                    .outputs
                    .get(index as usize)
                    .copied()
                    .with_context(|| format!("no private output at index {index}"))
            })
            .collect()
    }

    fn get_transparent_output(
        &self,
        tx_src: &[u8; 32],
        offset: u32,
    ) -> Result<Option<TransparentOutput>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.transparent.get(&(*tx_src, offset)).copied())
    }
}
