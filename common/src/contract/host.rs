use primitive_types::U256;

use super::{CallFrame, CallOutcome, ContractEvent};
use crate::{
    crypto::{Address, Hash},
    error::HostError,
};

/// Services an execution environment provides to running code.
///
/// The host owns every piece of world state. It guarantees that each call
/// frame is atomic: when a nested call fails, every change made inside it
/// (storage, balances, events, deployments) is rolled back before the
/// outcome is returned to the calling code.
///
/// Nested calls report failure through [`CallOutcome`] rather than an error,
/// since a failing callee is an ordinary result for the caller to inspect.
pub trait ExecutionHost {
    /// Read `key` from `owner`'s storage; unset keys read as zero.
    fn storage_load(&self, owner: &Address, key: &Hash) -> Hash;

    /// Write `key` in the storage context of `frame`.
    fn storage_store(&mut self, frame: &CallFrame, key: &Hash, value: Hash)
        -> Result<(), HostError>;

    fn has_code(&self, address: &Address) -> bool;

    fn balance(&self, address: &Address) -> U256;

    /// Run `target`'s code in `target`'s storage, transferring `value` from
    /// the frame's storage owner.
    fn call(
        &mut self,
        frame: &CallFrame,
        target: &Address,
        input: &[u8],
        value: U256,
    ) -> CallOutcome;

    /// Run `target`'s code in the storage context of `frame`, with the
    /// frame's caller and value.
    fn delegate_call(&mut self, frame: &CallFrame, target: &Address, input: &[u8]) -> CallOutcome;

    /// Run `target`'s code read-only.
    fn static_call(&mut self, frame: &CallFrame, target: &Address, input: &[u8]) -> CallOutcome;

    /// Append `event` to the log, attributed to `frame.address` whatever
    /// `event.contract` claims.
    fn emit_event(&mut self, frame: &CallFrame, event: ContractEvent) -> Result<(), HostError>;
}
