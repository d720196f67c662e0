#![allow(dead_code)]

use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use tenebra_account::{
    Account, AccountSecrets, Address, PrivateKeys, StealthAddress, TransparentAddress,
    TransparentKeys,
};
use tenebra_block::Block;
use tenebra_core::{
    ChainView, MemoryChain, NetworkRelay, RelayConfirmations, SharedAccount, coinbase_transaction,
    scan::{AccountScanner, ScanKeys},
};
use tenebra_primitives::{Point, Primitives, RangeProof, RistrettoPrimitives};
use tenebra_privacy::RingMember;
use tenebra_transaction::{
    PrivateOutput, Transaction, TransactionPrefix, TransactionVariant, TransparentInput,
    TransparentOutput, TransparentSignature, Witness,
};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn primitives() -> Arc<RistrettoPrimitives> {
    Arc::new(RistrettoPrimitives::new())
}

/// A coinbase-shaped transaction of `count` outputs nobody owns. Only used
/// to give rings something to draw decoys from.
pub fn filler_tx(p: &dyn Primitives, count: usize) -> Transaction {
    let outputs = (0..count)
        .map(|i| PrivateOutput {
            one_time_key: p.generate_keypair().1,
            commitment: p.commit(&p.random_scalar(), i as u64),
            masked_amount: 0,
        })
        .collect();
    let prefix = TransactionPrefix {
        variant: TransactionVariant::Coinbase,
        tx_public_key: Some(p.generate_keypair().1),
        transparent_inputs: vec![],
        private_inputs: vec![],
        transparent_outputs: vec![],
        private_outputs: outputs,
        range_proof: Some(RangeProof(vec![1])),
    };
    Transaction::new(prefix, Witness::default()).unwrap()
}

/// A chain whose first block holds enough outputs for full rings.
pub fn seeded_chain(p: &dyn Primitives) -> Arc<MemoryChain> {
    let chain = Arc::new(MemoryChain::new());
    chain.append(Some(filler_tx(p, 80)), vec![]).unwrap();
    chain
}

pub fn private_keys(p: &dyn Primitives) -> (PrivateKeys, StealthAddress) {
    let keys = PrivateKeys::generate(p);
    let address = keys.address(p);
    (keys, address)
}

pub fn private_account(p: &dyn Primitives) -> (SharedAccount, StealthAddress) {
    let (keys, address) = private_keys(p);
    (account_for(p, keys), address)
}

pub fn account_for(p: &dyn Primitives, keys: PrivateKeys) -> SharedAccount {
    SharedAccount::new(Account::new(p, AccountSecrets::Private(keys)))
}

pub fn transparent_account(p: &dyn Primitives) -> (SharedAccount, TransparentAddress) {
    let keys = TransparentKeys::generate();
    let address = keys.address();
    let account = Account::new(p, AccountSecrets::Transparent(keys));
    (SharedAccount::new(account), address)
}

/// Mine a coinbase paying `address` each of `amounts`.
pub fn mine_reward(
    p: &dyn Primitives,
    chain: &MemoryChain,
    address: StealthAddress,
    amounts: &[u64],
) -> Block {
    let outputs: Vec<(StealthAddress, u64)> = amounts.iter().map(|a| (address, *a)).collect();
    let coinbase = coinbase_transaction(p, &outputs).unwrap();
    chain.append(Some(coinbase), vec![]).unwrap()
}

/// A transparent transaction spending an outpoint nobody checks. Stands in
/// for funds bridged onto the chain.
pub fn transparent_funding(address: TransparentAddress, amount: u64, seed: u8) -> Transaction {
    let prefix = TransactionPrefix {
        variant: TransactionVariant::Transparent,
        tx_public_key: None,
        transparent_inputs: vec![TransparentInput {
            tx_src: [seed; 32],
            offset: 0,
        }],
        private_inputs: vec![],
        transparent_outputs: vec![TransparentOutput { address, amount }],
        private_outputs: vec![],
        range_proof: None,
    };
    let witness = Witness {
        transparent_signatures: vec![TransparentSignature {
            public_key: [0; 32],
            signature: [0; 64],
        }],
        ..Witness::default()
    };
    Transaction::new(prefix, witness).unwrap()
}

/// Bring an account up to the chain tip in the foreground.
pub fn sync(p: &dyn Primitives, chain: &dyn ChainView, account: &SharedAccount) {
    let start = account.read().next_height();
    let tip = chain.chain_height().unwrap();
    if start >= tip {
        return;
    }
    let blocks = chain.get_blocks(start, tip - start).unwrap();

    let mut guard = account.write();
    for block in &blocks {
        let scan = {
            let keys = match (guard.address(), guard.secrets().unwrap()) {
                (Address::Stealth(_), AccountSecrets::Private(keys)) => ScanKeys::private(p, keys),
                (Address::Transparent(address), _) => ScanKeys::Transparent(address),
                _ => unreachable!(),
            };
            AccountScanner::new(p, keys, guard.utxos())
                .scan_block(block)
                .unwrap()
        };
        guard.utxos_mut().apply(&scan.delta);
        guard.set_last_height(Some(block.height()));
    }
}

/// Skips the block at `gap_at`, breaking the gapless contract.
pub struct GappyChain {
    pub inner: Arc<MemoryChain>,
    pub gap_at: u64,
}

impl ChainView for GappyChain {
    fn get_blocks(&self, start: u64, limit: u64) -> anyhow::Result<Vec<Block>> {
        let mut blocks = self.inner.get_blocks(start, limit + 1)?;
        blocks.retain(|b| b.height() != self.gap_at);
        blocks.truncate(limit as usize);
        Ok(blocks)
    }

    fn chain_height(&self) -> anyhow::Result<u64> {
        self.inner.chain_height()
    }

    fn output_count(&self) -> anyhow::Result<u64> {
        self.inner.output_count()
    }

    fn get_outputs(&self, indices: &[u64]) -> anyhow::Result<Vec<RingMember>> {
        self.inner.get_outputs(indices)
    }

    fn get_transparent_output(
        &self,
        tx_src: &[u8; 32],
        offset: u32,
    ) -> anyhow::Result<Option<TransparentOutput>> {
        self.inner.get_transparent_output(tx_src, offset)
    }
}

/// What the relay does with a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Mine the transaction into the chain and report acceptance.
    Accept,
    Reject,
    /// Report nothing.
    Silent,
    /// Fail the broadcast itself.
    Fail,
}

/// Relay backed by a [`MemoryChain`] that answers synchronously.
pub struct TestRelay {
    pub chain: Arc<MemoryChain>,
    pub verdict: Mutex<Verdict>,
    pub sent: Mutex<Vec<Transaction>>,
    pub confirmations: OnceLock<RelayConfirmations>,
}

impl TestRelay {
    pub fn new(chain: Arc<MemoryChain>, verdict: Verdict) -> Arc<Self> {
        Arc::new(Self {
            chain,
            verdict: Mutex::new(verdict),
            sent: Mutex::new(Vec::new()),
            confirmations: OnceLock::new(),
        })
    }

    pub fn connect(&self, confirmations: &RelayConfirmations) {
        let _ = self.confirmations.set(confirmations.clone());
    }

    pub fn set_verdict(&self, verdict: Verdict) {
        *self.verdict.lock().unwrap() = verdict;
    }

    pub fn sent(&self) -> Vec<Transaction> {
        self.sent.lock().unwrap().clone()
    }
}

impl NetworkRelay for TestRelay {
    fn broadcast(&self, tx: &Transaction) -> anyhow::Result<()> {
        let verdict = *self.verdict.lock().unwrap();
        if verdict == Verdict::Fail {
            anyhow::bail!("relay unreachable");
        }
        self.sent.lock().unwrap().push(tx.clone());
        let notify = |success| {
            if let Some(confirmations) = self.confirmations.get() {
                confirmations.notify(&tx.id(), success);
            }
        };
        match verdict {
            Verdict::Accept => {
                self.chain.append(None, vec![tx.clone()])?;
                notify(true);
            }
            Verdict::Reject => notify(false),
            Verdict::Silent | Verdict::Fail => {}
        }
        Ok(())
    }
}

/// Poll `check` until it holds or `timeout` passes.
pub async fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

pub fn point_sum(p: &dyn Primitives, points: &[Point]) -> Point {
    points
        .iter()
        .fold(Point::IDENTITY, |acc, pt| p.point_add(&acc, pt).unwrap())
}
