use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use std::io::{Cursor, Read, Write};
use tenebra_transaction::{PrivateOutput, Transaction};

// Block header
pub const HEADER_MAGIC: [u8; 4] = *b"TNBR";
pub const HEADER_VERSION: u16 = 1;
pub const HEADER_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockHeader {
    #[serde(with = "hex::serde")]
    pub magic: [u8; 4],
    pub hdr_version: u16,
    pub height: u64,
    #[serde(with = "hex::serde")]
    pub prev_hash: [u8; 32],
    #[serde(with = "hex::serde")]
    pub tx_root: [u8; 32],
    pub tx_count: u32,
    pub timestamp: u64,
    /// Global index of the first private output in this block.
    pub first_output_index: u64,
}

impl BlockHeader {
    pub fn to_bytes(&self) -> Result<[u8; HEADER_SIZE], std::io::Error> {
        let mut bytes = [0u8; HEADER_SIZE];
        let mut cursor = Cursor::new(&mut bytes[..]);
        cursor.write_all(&self.magic)?;
        cursor.write_u16::<BigEndian>(self.hdr_version)?;
        cursor.write_u16::<BigEndian>(0)?; // Reserved
        cursor.write_u64::<BigEndian>(self.height)?;
        cursor.write_all(&self.prev_hash)?;
        cursor.write_all(&self.tx_root)?;
        cursor.write_u32::<BigEndian>(self.tx_count)?;
        cursor.write_u64::<BigEndian>(self.timestamp)?;
        cursor.write_u64::<BigEndian>(self.first_output_index)?;

        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Result<Self, std::io::Error> {
        let mut cursor = Cursor::new(&bytes[..]);
        let mut magic = [0u8; 4];
        cursor.read_exact(&mut magic)?;
        if magic != HEADER_MAGIC {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "bad block header magic",
            ));
        }

        let hdr_version = cursor.read_u16::<BigEndian>()?;
        cursor.read_u16::<BigEndian>()?;

        let height = cursor.read_u64::<BigEndian>()?;
        let mut prev_hash = [0u8; 32];
        cursor.read_exact(&mut prev_hash)?;
        let mut tx_root = [0u8; 32];
        cursor.read_exact(&mut tx_root)?;
        let tx_count = cursor.read_u32::<BigEndian>()?;
        let timestamp = cursor.read_u64::<BigEndian>()?;
        let first_output_index = cursor.read_u64::<BigEndian>()?;
        Ok(Self {
            magic,
            hdr_version,
            height,
            prev_hash,
            tx_root,
            tx_count,
            timestamp,
            first_output_index,
        })
    }

    pub fn hash(&self) -> Result<[u8; 32], std::io::Error> {
        Ok(*blake3::hash(&self.to_bytes()?).as_bytes())
    }

    pub fn genesis() -> Self {
        Self {
            magic: HEADER_MAGIC,
            hdr_version: HEADER_VERSION,
            height: 0,
            prev_hash: [0; 32],
            tx_root: tx_root(std::iter::empty()),
            tx_count: 0,
            timestamp: 0,
            first_output_index: 0,
        }
    }
}

/// BLAKE3 over the concatenated transaction ids, coinbase first.
pub fn tx_root<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for tx in transactions {
        hasher.update(tx.id().as_bytes());
    }
    *hasher.finalize().as_bytes()
}

/// A private output together with its position on chain.
#[derive(Debug, Clone, Copy)]
pub struct IndexedOutput<'a> {
    pub global_index: u64,
    pub tx: &'a Transaction,
    /// Position within `tx.private_outputs()`.
    pub index: u32,
    pub output: &'a PrivateOutput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub coinbase: Option<Transaction>,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(
        height: u64,
        prev_hash: [u8; 32],
        first_output_index: u64,
        timestamp: u64,
        coinbase: Option<Transaction>,
        transactions: Vec<Transaction>,
    ) -> Self {
        let tx_root = tx_root(coinbase.iter().chain(&transactions));
        let tx_count = (coinbase.is_some() as usize + transactions.len()) as u32;
        Self {
            header: BlockHeader {
                magic: HEADER_MAGIC,
                hdr_version: HEADER_VERSION,
                height,
                prev_hash,
                tx_root,
                tx_count,
                timestamp,
                first_output_index,
            },
            coinbase,
            transactions,
        }
    }

    pub fn height(&self) -> u64 {
        self.header.height
    }

    pub fn hash(&self) -> Result<[u8; 32], std::io::Error> {
        self.header.hash()
    }

    /// Coinbase first, then transactions in block order.
    pub fn all_transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.coinbase.iter().chain(&self.transactions)
    }

    /// Private outputs in canonical order with their global indices.
    pub fn private_outputs(&self) -> impl Iterator<Item = IndexedOutput<'_>> {
        self.all_transactions()
            .flat_map(|tx| {
                tx.private_outputs()
                    .iter()
                    .enumerate()
                    .map(move |(index, output)| (tx, index as u32, output))
            })
            .zip(self.header.first_output_index..)
            .map(|((tx, index, output), global_index)| IndexedOutput {
                global_index,
                tx,
                index,
                output,
            })
    }

    pub fn private_output_count(&self) -> u64 {
        self.all_transactions()
            .map(|tx| tx.private_outputs().len() as u64)
            .sum()
    }

    /// Global index the next block's first private output will take.
    pub fn next_output_index(&self) -> u64 {
        self.header.first_output_index + self.private_output_count()
    }
}
