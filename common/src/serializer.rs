//! Minimal big-endian byte codec.
//!
//! Everything the proxy puts on the wire (admin call arguments,
//! constructor arguments, custom errors, event data) is a sequence of
//! fixed-width words and length-prefixed byte strings.

use primitive_types::U256;
use thiserror::Error;

use crate::{
    config::PAYLOAD_LENGTH_SIZE,
    crypto::{Address, Hash, ADDRESS_SIZE, HASH_SIZE},
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReaderError {
    #[error("Unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEnd { needed: usize, remaining: usize },

    #[error("Trailing data: {0} bytes left unread")]
    TrailingData(usize),

    #[error("Invalid UTF-8 string")]
    InvalidString,

    #[error("Invalid tag: {0}")]
    InvalidTag(u8),
}

pub struct Reader<'a> {
    bytes: &'a [u8],
    total: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, total: 0 }
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ReaderError> {
        if self.bytes.len() < n {
            return Err(ReaderError::UnexpectedEnd {
                needed: n,
                remaining: self.bytes.len(),
            });
        }

        let (head, tail) = self.bytes.split_at(n);
        self.bytes = tail;
        self.total += n;
        Ok(head)
    }

    pub fn read_u8(&mut self) -> Result<u8, ReaderError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32, ReaderError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_hash(&mut self) -> Result<Hash, ReaderError> {
        let bytes = self.read_bytes(HASH_SIZE)?;
        let mut word = [0u8; HASH_SIZE];
        word.copy_from_slice(bytes);
        Ok(Hash::new(word))
    }

    pub fn read_address(&mut self) -> Result<Address, ReaderError> {
        let bytes = self.read_bytes(ADDRESS_SIZE)?;
        let mut raw = [0u8; ADDRESS_SIZE];
        raw.copy_from_slice(bytes);
        Ok(Address::new(raw))
    }

    pub fn read_u256(&mut self) -> Result<U256, ReaderError> {
        Ok(self.read_hash()?.to_u256())
    }

    /// Length-prefixed byte string
    pub fn read_payload(&mut self) -> Result<&'a [u8], ReaderError> {
        let len = self.read_u32()? as usize;
        self.read_bytes(len)
    }

    pub fn read_string(&mut self) -> Result<String, ReaderError> {
        let bytes = self.read_payload()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ReaderError::InvalidString)
    }

    pub fn total_read(&self) -> usize {
        self.total
    }

    /// Fails if any input is left unread.
    pub fn finish(self) -> Result<(), ReaderError> {
        if self.bytes.is_empty() {
            Ok(())
        } else {
            Err(ReaderError::TrailingData(self.bytes.len()))
        }
    }
}

#[derive(Default)]
pub struct Writer {
    bytes: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_hash(&mut self, hash: &Hash) {
        self.bytes.extend_from_slice(hash.as_bytes());
    }

    pub fn write_address(&mut self, address: &Address) {
        self.bytes.extend_from_slice(address.as_bytes());
    }

    pub fn write_u256(&mut self, value: U256) {
        self.write_hash(&Hash::from_u256(value));
    }

    /// Length-prefixed byte string.
    ///
    /// Callers bound payload sizes well below `u32::MAX`.
    pub fn write_payload(&mut self, payload: &[u8]) {
        debug_assert!(payload.len() <= u32::MAX as usize);
        self.write_u32(payload.len() as u32);
        self.bytes.extend_from_slice(payload);
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_payload(value.as_bytes());
    }

    pub fn total_write(&self) -> usize {
        self.bytes.len()
    }

    pub fn bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Encoded size of a length-prefixed payload.
pub const fn payload_size(len: usize) -> usize {
    PAYLOAD_LENGTH_SIZE + len
}
