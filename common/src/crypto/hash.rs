use primitive_types::U256;
use serde::de::Error as SerdeError;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::{
    convert::TryInto,
    fmt::{Display, Error, Formatter},
    hash::Hasher,
    str::FromStr,
};

use super::CryptoError;
use crate::config::SELECTOR_SIZE;

pub const HASH_SIZE: usize = 32; // 32 bytes / 256 bits

/// Leading bytes of a call or error payload naming the target.
pub type Selector = [u8; SELECTOR_SIZE];

/// A 32-byte word.
///
/// Used for digests, storage keys and storage values alike: the
/// persistent region of a contract maps `Hash` keys to `Hash` values.
#[derive(Eq, PartialEq, PartialOrd, Ord, Clone, Copy, Debug, Default)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    pub const fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    pub const fn zero() -> Self {
        Hash::new([0; HASH_SIZE])
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; HASH_SIZE] {
        self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a hex string, with or without `0x` prefix.
    pub fn from_hex(value: &str) -> Result<Self, CryptoError> {
        let value = value.strip_prefix("0x").unwrap_or(value);
        if value.len() != HASH_SIZE * 2 {
            return Err(CryptoError::InvalidHashLength {
                len: value.len() / 2,
                expected: HASH_SIZE,
            });
        }

        let bytes = hex::decode(value).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        let bytes: [u8; HASH_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidHashLength {
                len: value.len() / 2,
                expected: HASH_SIZE,
            })?;
        Ok(Hash::new(bytes))
    }

    /// Interpret the word as a big-endian 256-bit integer.
    pub fn to_u256(&self) -> U256 {
        U256::from_big_endian(&self.0)
    }

    pub fn from_u256(value: U256) -> Self {
        Hash(value.to_big_endian())
    }

    /// Big-endian `value` in the low-order bytes.
    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; HASH_SIZE];
        bytes[HASH_SIZE - 8..].copy_from_slice(&value.to_be_bytes());
        Hash(bytes)
    }
}

impl FromStr for Hash {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hash::from_hex(s)
    }
}

/// Keccak-256 of a byte slice.
#[inline(always)]
pub fn keccak256(value: &[u8]) -> Hash {
    let result: [u8; HASH_SIZE] = Keccak256::digest(value).into();
    Hash(result)
}

/// First 4 bytes of the keccak-256 digest of a signature such as
/// `upgradeTo(address)`.
pub fn selector(signature: &str) -> Selector {
    let digest = keccak256(signature.as_bytes());
    let mut out = [0u8; SELECTOR_SIZE];
    out.copy_from_slice(&digest.as_bytes()[..SELECTOR_SIZE]);
    out
}

impl std::hash::Hash for Hash {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::hash::Hash::hash(&self.0, state);
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; HASH_SIZE]> for Hash {
    fn from(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }
}

impl Display for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", &self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'a> Deserialize<'a> for Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'a>,
    {
        let hex = String::deserialize(deserializer)?;
        Hash::from_hex(&hex).map_err(SerdeError::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak256_empty_input() {
        assert_eq!(
            keccak256(&[]).to_hex(),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_selector_known_value() {
        // transfer(address,uint256)
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn test_from_hex_accepts_prefix() {
        let hash = keccak256(b"proxy");
        let prefixed = format!("0x{}", hash.to_hex());
        assert_eq!(Hash::from_hex(&prefixed).unwrap(), hash);
        assert_eq!(hash.to_hex().parse::<Hash>().unwrap(), hash);
    }

    #[test]
    fn test_from_hex_rejects_bad_length() {
        assert!(matches!(
            Hash::from_hex("abcd"),
            Err(CryptoError::InvalidHashLength { expected: 32, .. })
        ));
    }

    #[test]
    fn test_u256_conversion_is_big_endian() {
        let hash = Hash::from_u64(0x0102);
        assert_eq!(hash.as_bytes()[30], 0x01);
        assert_eq!(hash.as_bytes()[31], 0x02);
        assert_eq!(hash.to_u256(), U256::from(0x0102u64));
        assert_eq!(Hash::from_u256(U256::from(0x0102u64)), hash);
    }

    #[test]
    fn test_serde_hex_string() {
        let hash = keccak256(b"slot");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", hash.to_hex()));
        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }
}
