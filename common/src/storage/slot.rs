use lazy_static::lazy_static;
use primitive_types::U256;
use std::fmt;

use crate::{
    config::{ADMIN_SLOT_LABEL, IMPLEMENTATION_SLOT_LABEL},
    contract::{CallFrame, ExecutionHost},
    crypto::{keccak256, Address, Hash},
    error::HostError,
};

lazy_static! {
    /// Slot holding the active logic address.
    pub static ref IMPLEMENTATION_SLOT: StorageSlot = StorageSlot::derive(IMPLEMENTATION_SLOT_LABEL);
    /// Slot holding the administrator address.
    pub static ref ADMIN_SLOT: StorageSlot = StorageSlot::derive(ADMIN_SLOT_LABEL);
}

/// A fixed key into a contract's persistent storage.
///
/// Two kinds of keys share one storage region:
/// - sequential keys `0, 1, 2, ...` used by logic components for their fields
/// - derived keys `keccak256(label) - 1` reserved by the proxy
///
/// A derived key has no known keccak preimage and sits far outside the range
/// any sequential layout can reach, so both kinds never collide.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct StorageSlot(Hash);

impl StorageSlot {
    pub const fn new(key: Hash) -> Self {
        Self(key)
    }

    /// `keccak256(label) - 1`, big-endian.
    pub fn derive(label: &str) -> Self {
        let digest = keccak256(label.as_bytes()).to_u256();
        // A zero digest would wrap, keccak never produces one for these labels
        let key = digest.overflowing_sub(U256::one()).0;
        Self(Hash::from_u256(key))
    }

    /// Key of the `index`-th sequentially allocated field.
    pub fn sequential(index: u64) -> Self {
        Self(Hash::from_u64(index))
    }

    pub fn key(&self) -> &Hash {
        &self.0
    }

    /// Read the slot from `owner`'s storage. Unset slots read as zero.
    ///
    /// Never writes, so it is safe from a static frame.
    pub fn get(&self, host: &dyn ExecutionHost, owner: &Address) -> Hash {
        host.storage_load(owner, &self.0)
    }

    /// Write the slot in the storage context of `frame`.
    ///
    /// # Errors
    ///
    /// Fails with [`HostError::StaticStateChange`] when `frame` is read-only.
    pub fn set(
        &self,
        host: &mut dyn ExecutionHost,
        frame: &CallFrame,
        value: Hash,
    ) -> Result<(), HostError> {
        host.storage_store(frame, &self.0, value)
    }

    pub fn get_address(&self, host: &dyn ExecutionHost, owner: &Address) -> Address {
        Address::from_word(self.get(host, owner))
    }

    pub fn set_address(
        &self,
        host: &mut dyn ExecutionHost,
        frame: &CallFrame,
        value: &Address,
    ) -> Result<(), HostError> {
        self.set(host, frame, value.to_word())
    }
}

impl fmt::Display for StorageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ADMIN_SLOT_HEX, IMPLEMENTATION_SLOT_HEX};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_sequential_never_hits_reserved(index in any::<u64>()) {
            let slot = StorageSlot::sequential(index);
            prop_assert_ne!(slot, *IMPLEMENTATION_SLOT);
            prop_assert_ne!(slot, *ADMIN_SLOT);
        }
    }

    #[test]
    fn test_derived_slots_match_known_constants() {
        assert_eq!(IMPLEMENTATION_SLOT.key().to_hex(), IMPLEMENTATION_SLOT_HEX);
        assert_eq!(ADMIN_SLOT.key().to_hex(), ADMIN_SLOT_HEX);
    }

    #[test]
    fn test_derived_slot_is_digest_minus_one() {
        let digest = keccak256(IMPLEMENTATION_SLOT_LABEL.as_bytes()).to_u256();
        assert_eq!(IMPLEMENTATION_SLOT.key().to_u256() + U256::one(), digest);
    }

    #[test]
    fn test_reserved_slots_disjoint_from_sequential_layout() {
        assert_ne!(*IMPLEMENTATION_SLOT, *ADMIN_SLOT);
        for index in 0..(1u64 << 16) {
            let slot = StorageSlot::sequential(index);
            assert_ne!(slot, *IMPLEMENTATION_SLOT);
            assert_ne!(slot, *ADMIN_SLOT);
        }
    }

    #[test]
    fn test_sequential_slot_layout() {
        assert_eq!(StorageSlot::sequential(0).key(), &Hash::zero());
        assert_eq!(StorageSlot::sequential(1).key().to_u256(), U256::one());
    }
}
