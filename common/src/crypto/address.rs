use serde::de::Error as SerdeError;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error, Formatter},
    str::FromStr,
};

use super::{keccak256, CryptoError, Hash, HASH_SIZE};

pub const ADDRESS_SIZE: usize = HASH_SIZE;

/// Identity of an account or a contract.
///
/// Addresses are 32 bytes wide. The all-zero address is the null
/// identifier: it never holds code and is never a valid administrator
/// once set through `change_admin`.
#[derive(Eq, PartialEq, PartialOrd, Ord, Clone, Copy, Debug, Default, Hash)]
pub struct Address([u8; ADDRESS_SIZE]);

impl Address {
    pub const fn new(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Address(bytes)
    }

    pub const fn zero() -> Self {
        Address([0; ADDRESS_SIZE])
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; ADDRESS_SIZE] {
        self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Deterministic address derived from a human readable label.
    ///
    /// Handy for tests and scenario files where accounts are named.
    pub fn from_label(label: &str) -> Self {
        Address(keccak256(label.as_bytes()).to_bytes())
    }

    /// Read an address from the first 32 bytes of `bytes`.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; ADDRESS_SIZE] = bytes
            .get(..ADDRESS_SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| {
                CryptoError::InvalidAddress(format!(
                    "expected {} bytes, got {}",
                    ADDRESS_SIZE,
                    bytes.len()
                ))
            })?;
        Ok(Address(bytes))
    }

    /// Storage representation: addresses are stored as raw words.
    pub fn to_word(self) -> Hash {
        Hash::new(self.0)
    }

    pub fn from_word(word: Hash) -> Self {
        Address(word.to_bytes())
    }
}

impl FromStr for Address {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hash::from_hex(s)
            .map(Address::from_word)
            .map_err(|e| CryptoError::InvalidAddress(e.to_string()))
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", &self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'a> Deserialize<'a> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'a>,
    {
        let hex = String::deserialize(deserializer)?;
        hex.parse().map_err(SerdeError::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_address() {
        assert!(Address::zero().is_zero());
        assert!(!Address::from_label("alice").is_zero());
    }

    #[test]
    fn test_labels_are_distinct() {
        assert_ne!(Address::from_label("alice"), Address::from_label("bob"));
        assert_eq!(Address::from_label("alice"), Address::from_label("alice"));
    }

    #[test]
    fn test_from_slice_too_short() {
        assert!(Address::from_slice(&[1u8; 31]).is_err());
        let addr = Address::from_slice(&[7u8; 40]).unwrap();
        assert_eq!(addr, Address::new([7u8; 32]));
    }

    #[test]
    fn test_word_conversion() {
        let addr = Address::from_label("logic");
        assert_eq!(Address::from_word(addr.to_word()), addr);
    }
}
