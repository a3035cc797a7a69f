use indexmap::IndexMap;
use primitive_types::U256;
use std::sync::Arc;

use crate::{
    contract::{Contract, ContractEvent},
    crypto::{Address, Hash},
    error::HostError,
};

/// Undo record for one change to the world state.
enum Change {
    // `previous` holds the slot's position and value if it was set
    Storage {
        owner: Address,
        key: Hash,
        previous: Option<(usize, Hash)>,
    },
    Balance {
        address: Address,
        previous: Option<U256>,
    },
    Code {
        address: Address,
    },
    Event,
}

/// Everything a call frame can change.
///
/// Every write is journaled. A checkpoint is the journal length, and
/// reverting to it undoes the newer entries in reverse order, so rollback
/// costs what the failed frame wrote. `IndexMap` keeps iteration in
/// insertion order so dumps and reports are deterministic; undo restores
/// removed entries at their old position.
#[derive(Default)]
pub(super) struct WorldState {
    code: IndexMap<Address, Arc<dyn Contract>>,
    storage: IndexMap<Address, IndexMap<Hash, Hash>>,
    balances: IndexMap<Address, U256>,
    events: Vec<ContractEvent>,
    journal: Vec<Change>,
}

impl WorldState {
    pub(super) fn code(&self) -> &IndexMap<Address, Arc<dyn Contract>> {
        &self.code
    }

    pub(super) fn events(&self) -> &[ContractEvent] {
        &self.events
    }

    pub(super) fn slots(&self, owner: &Address) -> Option<&IndexMap<Hash, Hash>> {
        self.storage.get(owner)
    }

    pub(super) fn load(&self, owner: &Address, key: &Hash) -> Hash {
        self.storage
            .get(owner)
            .and_then(|slots| slots.get(key))
            .copied()
            .unwrap_or_default()
    }

    // Zero values are removed: an unset slot and a zeroed slot are the same
    pub(super) fn store(&mut self, owner: Address, key: Hash, value: Hash) {
        let previous = self
            .storage
            .get(&owner)
            .and_then(|slots| slots.get_full(&key))
            .map(|(index, _, value)| (index, *value));
        if value.is_zero() {
            match self.storage.get_mut(&owner) {
                Some(slots) if previous.is_some() => {
                    slots.shift_remove(&key);
                }
                _ => return,
            }
        } else {
            self.storage.entry(owner).or_default().insert(key, value);
        }
        self.journal.push(Change::Storage {
            owner,
            key,
            previous,
        });
    }

    pub(super) fn install(&mut self, address: Address, code: Arc<dyn Contract>) {
        self.code.insert(address, code);
        self.journal.push(Change::Code { address });
    }

    pub(super) fn push_event(&mut self, event: ContractEvent) {
        self.events.push(event);
        self.journal.push(Change::Event);
    }

    pub(super) fn balance(&self, address: &Address) -> U256 {
        self.balances.get(address).copied().unwrap_or_default()
    }

    pub(super) fn credit(&mut self, address: Address, amount: U256) {
        let balance = self.balance(&address).saturating_add(amount);
        self.set_balance(address, balance);
    }

    pub(super) fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: U256,
    ) -> Result<(), HostError> {
        if amount.is_zero() {
            return Ok(());
        }

        let have = self.balance(from);
        if have < amount {
            return Err(HostError::InsufficientBalance { need: amount, have });
        }

        self.set_balance(*from, have - amount);
        self.credit(*to, amount);
        Ok(())
    }

    fn set_balance(&mut self, address: Address, balance: U256) {
        let previous = self.balances.insert(address, balance);
        self.journal.push(Change::Balance { address, previous });
    }

    /// Mark the current state so it can be restored with [`Self::revert_to`].
    pub(super) fn checkpoint(&self) -> usize {
        self.journal.len()
    }

    /// Undo every change made since `checkpoint`.
    pub(super) fn revert_to(&mut self, checkpoint: usize) {
        while self.journal.len() > checkpoint {
            let Some(change) = self.journal.pop() else {
                break;
            };
            match change {
                Change::Storage {
                    owner,
                    key,
                    previous,
                } => {
                    let slots = self.storage.entry(owner).or_default();
                    match previous {
                        Some((index, value)) => match slots.get_mut(&key) {
                            Some(slot) => *slot = value,
                            None => {
                                slots.shift_insert(index, key, value);
                            }
                        },
                        None => {
                            slots.shift_remove(&key);
                        }
                    }
                    if slots.is_empty() {
                        self.storage.shift_remove(&owner);
                    }
                }
                Change::Balance { address, previous } => match previous {
                    Some(balance) => {
                        self.balances.insert(address, balance);
                    }
                    None => {
                        self.balances.shift_remove(&address);
                    }
                },
                Change::Code { address } => {
                    self.code.shift_remove(&address);
                }
                Change::Event => {
                    self.events.pop();
                }
            }
        }
    }

    /// Drop the undo records once no checkpoint is outstanding.
    pub(super) fn commit(&mut self) {
        self.journal.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{CallFrame, ExecutionHost, Revert};

    struct Nop;

    impl Contract for Nop {
        fn execute(
            &self,
            _host: &mut dyn ExecutionHost,
            _frame: &CallFrame,
            _input: &[u8],
        ) -> Result<Vec<u8>, Revert> {
            Ok(Vec::new())
        }

        fn name(&self) -> &'static str {
            "Nop"
        }
    }

    fn dump(state: &WorldState, owner: &Address) -> Vec<(Hash, Hash)> {
        state
            .slots(owner)
            .map(|slots| slots.iter().map(|(k, v)| (*k, *v)).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_store_zero_clears_slot() {
        let owner = Address::from_label("owner");
        let key = Hash::from_u64(1);
        let mut state = WorldState::default();

        state.store(owner, key, Hash::from_u64(5));
        assert_eq!(state.load(&owner, &key), Hash::from_u64(5));

        state.store(owner, key, Hash::zero());
        assert_eq!(state.load(&owner, &key), Hash::zero());
        assert!(state.slots(&owner).map_or(true, |slots| slots.is_empty()));
    }

    #[test]
    fn test_transfer_requires_balance() {
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        let mut state = WorldState::default();
        state.credit(alice, U256::from(10u64));

        assert_eq!(
            state.transfer(&alice, &bob, U256::from(11u64)),
            Err(HostError::InsufficientBalance {
                need: U256::from(11u64),
                have: U256::from(10u64)
            })
        );
        state.transfer(&alice, &bob, U256::from(4u64)).unwrap();
        assert_eq!(state.balance(&alice), U256::from(6u64));
        assert_eq!(state.balance(&bob), U256::from(4u64));
    }

    #[test]
    fn test_revert_restores_everything_since_checkpoint() {
        let owner = Address::from_label("owner");
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        let mut state = WorldState::default();

        for n in 1..=3 {
            state.store(owner, Hash::from_u64(n), Hash::from_u64(n * 10));
        }
        state.credit(alice, U256::from(10u64));
        state.push_event(ContractEvent::new(owner, vec![], vec![]));
        state.commit();
        let before = dump(&state, &owner);

        let checkpoint = state.checkpoint();
        state.store(owner, Hash::from_u64(1), Hash::zero());
        state.store(owner, Hash::from_u64(2), Hash::from_u64(99));
        state.store(owner, Hash::from_u64(4), Hash::from_u64(40));
        state.store(bob, Hash::from_u64(1), Hash::from_u64(1));
        state.transfer(&alice, &bob, U256::from(7u64)).unwrap();
        state.install(owner, Arc::new(Nop));
        state.push_event(ContractEvent::new(owner, vec![], vec![]));

        state.revert_to(checkpoint);

        assert_eq!(dump(&state, &owner), before);
        assert!(state.slots(&bob).is_none());
        assert_eq!(state.balance(&alice), U256::from(10u64));
        assert_eq!(state.balance(&bob), U256::zero());
        assert!(state.code().is_empty());
        assert_eq!(state.events().len(), 1);
    }

    #[test]
    fn test_nested_checkpoints_revert_independently() {
        let owner = Address::from_label("owner");
        let key = Hash::from_u64(1);
        let mut state = WorldState::default();

        let outer = state.checkpoint();
        state.store(owner, key, Hash::from_u64(1));

        let inner = state.checkpoint();
        state.store(owner, key, Hash::from_u64(2));
        state.push_event(ContractEvent::new(owner, vec![], vec![]));
        state.revert_to(inner);

        assert_eq!(state.load(&owner, &key), Hash::from_u64(1));
        assert!(state.events().is_empty());

        state.revert_to(outer);
        assert_eq!(state.load(&owner, &key), Hash::zero());
        assert_eq!(state.checkpoint(), 0);
    }
}
