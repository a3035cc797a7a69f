use log::{debug, trace, warn};
use primitive_types::U256;
use std::sync::Arc;

use super::{state::WorldState, HostConfig};
use crate::{
    contract::{CallFrame, CallOutcome, Contract, ContractEvent, ExecutionHost, Revert},
    crypto::{keccak256, Address, Hash},
    error::HostError,
    serializer::Writer,
};

/// Single-threaded in-memory execution host
///
/// Holds accounts, code, storage and the event log, and runs contract code
/// frame by frame.
///
/// # Architecture
///
/// ```text
/// transact(caller, target, input, value)
///     ↓
/// run_frame: depth check → checkpoint → value transfer → code lookup
///     ↓
/// Contract::execute(host, frame, input)
///     ↓ (nested call / delegate_call / static_call re-enter run_frame)
/// Ok  → keep state
/// Err → revert to checkpoint, return failure data
/// ```
///
/// A checkpoint is a position in the world state's undo journal, so a
/// frame's rollback only touches what that frame wrote. The journal is
/// dropped once a top-level operation finishes.
///
/// Code is stored as `Arc<dyn Contract>`; the handle is cloned before
/// running it so the contract can borrow the host mutably and re-enter it.
pub struct MemoryHost {
    state: WorldState,
    config: HostConfig,
    // Outside of `state`: addresses of rolled back deployments are never reused
    nonce: u64,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new(HostConfig::default())
    }
}

impl MemoryHost {
    pub fn new(config: HostConfig) -> Self {
        Self {
            state: WorldState::default(),
            config,
            nonce: 0,
        }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Credit `amount` to `address` out of thin air.
    pub fn fund(&mut self, address: &Address, amount: U256) {
        self.state.credit(*address, amount);
    }

    /// Deploy `code` at a fresh address derived from the deployer and a nonce.
    ///
    /// # Errors
    ///
    /// Returns the constructor's failure data; nothing from the failed
    /// deployment remains in the world state.
    pub fn deploy(
        &mut self,
        deployer: &Address,
        code: Arc<dyn Contract>,
        input: &[u8],
        value: U256,
    ) -> Result<Address, Revert> {
        let address = self.next_address(deployer);
        self.deploy_at(address, deployer, code, input, value)?;
        Ok(address)
    }

    /// Deploy `code` at a caller-chosen address.
    ///
    /// # Arguments
    ///
    /// * `address` - Address the code is installed at, must be free
    /// * `deployer` - Account paying `value` and seen as caller by the constructor
    /// * `code` - Contract code
    /// * `input` - Constructor arguments
    /// * `value` - Value moved from `deployer` to the new contract
    ///
    /// # Errors
    ///
    /// [`HostError::ZeroAddress`] for the zero address,
    /// [`HostError::AddressInUse`] if code already lives at `address`, or the
    /// constructor's failure data.
    pub fn deploy_at(
        &mut self,
        address: Address,
        deployer: &Address,
        code: Arc<dyn Contract>,
        input: &[u8],
        value: U256,
    ) -> Result<(), Revert> {
        if address.is_zero() {
            return Err(HostError::ZeroAddress.into());
        }
        if self.state.code().contains_key(&address) {
            return Err(HostError::AddressInUse { address }.into());
        }

        let checkpoint = self.state.checkpoint();
        let frame = CallFrame::top_level(*deployer, address, value);
        debug!("Deploying {} at {} from {}", code.name(), address, deployer);

        let result = match self.state.transfer(deployer, &address, value) {
            Ok(()) => {
                self.state.install(address, Arc::clone(&code));
                code.construct(self, &frame, input)
            }
            Err(err) => Err(err.into()),
        };

        if let Err(revert) = &result {
            warn!("Deployment of {} at {} failed: {}", code.name(), address, revert);
            self.state.revert_to(checkpoint);
        }

        self.state.commit();
        result
    }

    /// Top-level call from an externally owned account.
    pub fn transact(
        &mut self,
        caller: &Address,
        target: &Address,
        input: &[u8],
        value: U256,
    ) -> CallOutcome {
        let frame = CallFrame::top_level(*caller, *target, value);
        let outcome = self.run_frame(frame, input, Some(*caller));
        self.state.commit();
        outcome
    }

    /// Top-level read-only call.
    pub fn query(&mut self, caller: &Address, target: &Address, input: &[u8]) -> CallOutcome {
        let mut frame = CallFrame::top_level(*caller, *target, U256::zero());
        frame.is_static = true;
        let outcome = self.run_frame(frame, input, None);
        self.state.commit();
        outcome
    }

    pub fn events(&self) -> &[ContractEvent] {
        self.state.events()
    }

    /// Events emitted in the storage context of `contract`.
    pub fn events_of<'a>(
        &'a self,
        contract: &'a Address,
    ) -> impl Iterator<Item = &'a ContractEvent> + 'a {
        self.state
            .events()
            .iter()
            .filter(move |event| &event.contract == contract)
    }

    /// Non-zero storage of `owner`, in first-write order.
    pub fn storage_dump(&self, owner: &Address) -> Vec<(Hash, Hash)> {
        self.state
            .slots(owner)
            .map(|slots| slots.iter().map(|(k, v)| (*k, *v)).collect())
            .unwrap_or_default()
    }

    /// Addresses holding code, in deployment order.
    pub fn contracts(&self) -> impl Iterator<Item = &Address> {
        self.state.code().keys()
    }

    fn next_address(&mut self, deployer: &Address) -> Address {
        loop {
            let mut writer = Writer::with_capacity(40);
            writer.write_address(deployer);
            writer.write_bytes(&self.nonce.to_be_bytes());
            self.nonce += 1;

            let address = Address::from_word(keccak256(&writer.bytes()));
            if !self.state.code().contains_key(&address) {
                return address;
            }
        }
    }

    /// Run one frame atomically.
    ///
    /// `payer` is debited `frame.value`; `None` for delegation, which moves
    /// no value.
    fn run_frame(&mut self, frame: CallFrame, input: &[u8], payer: Option<Address>) -> CallOutcome {
        if frame.depth >= self.config.max_call_depth {
            debug!(
                "Call depth {} reached at {}, rejecting",
                frame.depth, frame.code_address
            );
            return Self::host_failure(HostError::CallDepthExceeded {
                max: self.config.max_call_depth,
            });
        }

        let checkpoint = self.state.checkpoint();

        if let Some(payer) = payer {
            if !frame.value.is_zero() && frame.is_static {
                return Self::host_failure(HostError::StaticStateChange);
            }
            if let Err(err) = self.state.transfer(&payer, &frame.address, frame.value) {
                return Self::host_failure(err);
            }
        }

        let code = match self.state.code().get(&frame.code_address) {
            Some(code) => Arc::clone(code),
            // Plain value transfer to an account
            None if input.is_empty() && !frame.is_delegated() => {
                return CallOutcome::success(Vec::new());
            }
            None => {
                self.state.revert_to(checkpoint);
                return Self::host_failure(HostError::NoCode {
                    address: frame.code_address,
                });
            }
        };

        if log::log_enabled!(log::Level::Trace) {
            trace!(
                "Enter {} at {} (storage {}), depth {}, caller {}, value {}, {} bytes of input",
                code.name(),
                frame.code_address,
                frame.address,
                frame.depth,
                frame.caller,
                frame.value,
                input.len()
            );
        }

        match code.execute(self, &frame, input) {
            Ok(data) => {
                trace!("Exit {} with {} bytes", code.name(), data.len());
                CallOutcome::success(data)
            }
            Err(revert) => {
                debug!(
                    "{} reverted at depth {}: {}, rolling back",
                    code.name(),
                    frame.depth,
                    revert
                );
                self.state.revert_to(checkpoint);
                CallOutcome::failure(revert.into_data())
            }
        }
    }

    fn host_failure(err: HostError) -> CallOutcome {
        CallOutcome::failure(err.to_revert_data())
    }
}

impl ExecutionHost for MemoryHost {
    fn storage_load(&self, owner: &Address, key: &Hash) -> Hash {
        self.state.load(owner, key)
    }

    fn storage_store(
        &mut self,
        frame: &CallFrame,
        key: &Hash,
        value: Hash,
    ) -> Result<(), HostError> {
        if frame.is_static {
            return Err(HostError::StaticStateChange);
        }
        self.state.store(frame.address, *key, value);
        Ok(())
    }

    fn has_code(&self, address: &Address) -> bool {
        self.state.code().contains_key(address)
    }

    fn balance(&self, address: &Address) -> U256 {
        self.state.balance(address)
    }

    fn call(
        &mut self,
        frame: &CallFrame,
        target: &Address,
        input: &[u8],
        value: U256,
    ) -> CallOutcome {
        let child = frame.child_call(*target, value);
        self.run_frame(child, input, Some(frame.address))
    }

    fn delegate_call(&mut self, frame: &CallFrame, target: &Address, input: &[u8]) -> CallOutcome {
        let child = frame.child_delegate(*target);
        self.run_frame(child, input, None)
    }

    fn static_call(&mut self, frame: &CallFrame, target: &Address, input: &[u8]) -> CallOutcome {
        let child = frame.child_static(*target);
        self.run_frame(child, input, None)
    }

    fn emit_event(&mut self, frame: &CallFrame, mut event: ContractEvent) -> Result<(), HostError> {
        if frame.is_static {
            return Err(HostError::StaticStateChange);
        }
        // Events always belong to the storage context that emitted them
        if event.contract != frame.address {
            debug!(
                "Event claiming {} emitted from {}, attributing it to the emitter",
                event.contract, frame.address
            );
            event.contract = frame.address;
        }
        self.state.push_event(event);
        Ok(())
    }
}
