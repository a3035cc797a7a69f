//! Contract code trait for dependency injection
//!
//! The proxy never knows what the logic component does. Any code deployed on
//! an [`ExecutionHost`] is an implementation of this trait, the proxy included,
//! and the host decides in which storage context it runs.
//!
//! # Architecture
//!
//! ```text
//! proxy_common (proxy, slot store)
//!     | defines trait
//! Contract trait  <---  ExecutionHost::delegate_call(frame, logic, input)
//!     ^ implements
//! Logic components (testing framework mocks, user code)
//! ```
use std::fmt;

use primitive_types::U256;
use serde::Serialize;

use super::ExecutionHost;
use crate::{
    crypto::{Address, Hash},
    error::ProxyError,
};

/// Event emitted during execution
///
/// Indexed topics plus non-indexed data; `topics[0]` is the keccak-256 of the
/// event signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractEvent {
    /// Address whose storage context emitted the event
    pub contract: Address,
    /// Indexed topics (max 4)
    pub topics: Vec<Hash>,
    /// Non-indexed event data
    pub data: Vec<u8>,
}

impl ContractEvent {
    pub fn new(contract: Address, topics: Vec<Hash>, data: Vec<u8>) -> Self {
        Self {
            contract,
            topics,
            data,
        }
    }

    pub fn signature(&self) -> Option<&Hash> {
        self.topics.first()
    }
}

/// Failure data returned by a contract.
///
/// Carries raw bytes only; the proxy's own failures can be recovered with
/// [`Revert::proxy_error`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Revert(Vec<u8>);

impl Revert {
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    pub fn data(&self) -> &[u8] {
        &self.0
    }

    pub fn into_data(self) -> Vec<u8> {
        self.0
    }

    pub fn proxy_error(&self) -> Option<ProxyError> {
        ProxyError::decode(&self.0)
    }
}

impl fmt::Display for Revert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.proxy_error() {
            Some(err) => write!(f, "{}", err),
            None => write!(f, "revert 0x{}", hex::encode(&self.0)),
        }
    }
}

/// Execution context of one call frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    /// Storage context: reads, writes and events apply to this address
    pub address: Address,
    /// Address whose code is running; differs from `address` under delegation
    pub code_address: Address,
    /// Immediate caller
    pub caller: Address,
    /// Value attached to the call
    pub value: U256,
    /// Nesting level, the top-level call is 0
    pub depth: usize,
    /// Read-only frame: storage writes, events and transfers are rejected
    pub is_static: bool,
}

impl CallFrame {
    /// Frame of a call entering from an externally owned account.
    pub fn top_level(caller: Address, target: Address, value: U256) -> Self {
        Self {
            address: target,
            code_address: target,
            caller,
            value,
            depth: 0,
            is_static: false,
        }
    }

    /// Regular call: runs `target`'s code in `target`'s storage.
    pub fn child_call(&self, target: Address, value: U256) -> Self {
        Self {
            address: target,
            code_address: target,
            caller: self.address,
            value,
            depth: self.depth + 1,
            is_static: self.is_static,
        }
    }

    /// Delegation: runs `code`'s code in this frame's storage, keeping
    /// caller and value.
    pub fn child_delegate(&self, code: Address) -> Self {
        Self {
            address: self.address,
            code_address: code,
            caller: self.caller,
            value: self.value,
            depth: self.depth + 1,
            is_static: self.is_static,
        }
    }

    /// Read-only call into `target`.
    pub fn child_static(&self, target: Address) -> Self {
        Self {
            address: target,
            code_address: target,
            caller: self.address,
            value: U256::zero(),
            depth: self.depth + 1,
            is_static: true,
        }
    }

    pub fn is_delegated(&self) -> bool {
        self.address != self.code_address
    }
}

/// Outcome of a nested call as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutcome {
    pub success: bool,
    pub return_data: Vec<u8>,
}

impl CallOutcome {
    pub fn success(return_data: Vec<u8>) -> Self {
        Self {
            success: true,
            return_data,
        }
    }

    pub fn failure(return_data: Vec<u8>) -> Self {
        Self {
            success: false,
            return_data,
        }
    }

    pub fn into_result(self) -> Result<Vec<u8>, Revert> {
        if self.success {
            Ok(self.return_data)
        } else {
            Err(Revert::new(self.return_data))
        }
    }
}

impl From<Result<Vec<u8>, Revert>> for CallOutcome {
    fn from(result: Result<Vec<u8>, Revert>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(revert) => Self::failure(revert.into_data()),
        }
    }
}

/// Contract code trait
///
/// Implementations must not keep state of their own: everything persistent
/// goes through the host, in the storage context of the frame they run in.
pub trait Contract: Send + Sync {
    /// Handle a call
    ///
    /// # Arguments
    ///
    /// * `host` - Execution host, for storage, events and nested calls
    /// * `frame` - Context of this call (storage owner, caller, value)
    /// * `input` - Raw call payload
    ///
    /// # Returns
    ///
    /// Return data on success
    ///
    /// # Errors
    ///
    /// Returns [`Revert`] to fail the call; the host rolls back every state
    /// change made in this frame.
    fn execute(
        &self,
        host: &mut dyn ExecutionHost,
        frame: &CallFrame,
        input: &[u8],
    ) -> Result<Vec<u8>, Revert>;

    /// Run once at deployment, before the code becomes callable.
    ///
    /// The default accepts no constructor arguments.
    fn construct(
        &self,
        _host: &mut dyn ExecutionHost,
        _frame: &CallFrame,
        input: &[u8],
    ) -> Result<(), Revert> {
        if input.is_empty() {
            Ok(())
        } else {
            Err(ProxyError::malformed("contract takes no constructor arguments").into())
        }
    }

    /// Human-readable name, used for logging.
    fn name(&self) -> &'static str;
}
