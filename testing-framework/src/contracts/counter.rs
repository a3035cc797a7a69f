//! Counter logic, two versions sharing one storage layout.
//!
//! Layout (sequential fields, as a logic component lays out its state):
//! - field 0: count
//! - field 1: initialized flag
//!
//! Calls are a one-byte opcode followed by big-endian arguments.

use primitive_types::U256;
use proxy_common::{
    contract::{CallFrame, Contract, ExecutionHost, Revert},
    crypto::Hash,
    storage::StorageSlot,
};

const COUNT_FIELD: u64 = 0;
const INITIALIZED_FIELD: u64 = 1;

const OP_INITIALIZE: u8 = 0x01;
const OP_INCREMENT: u8 = 0x02;
const OP_GET: u8 = 0x03;
const OP_DECREMENT: u8 = 0x04;
const OP_VERSION: u8 = 0x05;

/// Calls understood by the counter logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterCall {
    /// One-shot initializer setting the count
    Initialize(u64),
    Increment,
    /// Only understood by [`CounterV2`]
    Decrement,
    Get,
    Version,
}

impl CounterCall {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Initialize(start) => {
                let mut bytes = vec![OP_INITIALIZE];
                bytes.extend_from_slice(&start.to_be_bytes());
                bytes
            }
            Self::Increment => vec![OP_INCREMENT],
            Self::Decrement => vec![OP_DECREMENT],
            Self::Get => vec![OP_GET],
            Self::Version => vec![OP_VERSION],
        }
    }

    fn decode(input: &[u8]) -> Result<Self, Revert> {
        let (op, args) = input
            .split_first()
            .ok_or_else(|| revert("counter: empty call"))?;
        let call = match (*op, args.len()) {
            (OP_INITIALIZE, 8) => {
                let mut start = [0u8; 8];
                start.copy_from_slice(args);
                Self::Initialize(u64::from_be_bytes(start))
            }
            (OP_INCREMENT, 0) => Self::Increment,
            (OP_DECREMENT, 0) => Self::Decrement,
            (OP_GET, 0) => Self::Get,
            (OP_VERSION, 0) => Self::Version,
            _ => return Err(revert("counter: unknown call")),
        };
        Ok(call)
    }
}

/// Decode the word returned by [`CounterCall::Get`].
pub fn decode_count(data: &[u8]) -> Option<U256> {
    (data.len() == 32).then(|| U256::from_big_endian(data))
}

fn revert(reason: &str) -> Revert {
    Revert::new(reason.as_bytes().to_vec())
}

fn count(host: &dyn ExecutionHost, frame: &CallFrame) -> U256 {
    StorageSlot::sequential(COUNT_FIELD)
        .get(host, &frame.address)
        .to_u256()
}

fn set_count(host: &mut dyn ExecutionHost, frame: &CallFrame, value: U256) -> Result<(), Revert> {
    StorageSlot::sequential(COUNT_FIELD).set(host, frame, Hash::from_u256(value))?;
    Ok(())
}

fn initialize(host: &mut dyn ExecutionHost, frame: &CallFrame, start: u64) -> Result<(), Revert> {
    let flag = StorageSlot::sequential(INITIALIZED_FIELD);
    if !flag.get(host, &frame.address).is_zero() {
        return Err(revert("counter: already initialized"));
    }
    flag.set(host, frame, Hash::from_u64(1))?;
    set_count(host, frame, U256::from(start))
}

/// Run the calls both versions share; `None` when `call` is version-specific.
fn execute_common(
    host: &mut dyn ExecutionHost,
    frame: &CallFrame,
    call: CounterCall,
) -> Result<Option<Vec<u8>>, Revert> {
    let output = match call {
        CounterCall::Initialize(start) => {
            initialize(host, frame, start)?;
            Vec::new()
        }
        CounterCall::Increment => {
            let next = count(host, frame)
                .checked_add(U256::one())
                .ok_or_else(|| revert("counter: overflow"))?;
            set_count(host, frame, next)?;
            Vec::new()
        }
        CounterCall::Get => Hash::from_u256(count(host, frame)).to_bytes().to_vec(),
        CounterCall::Decrement | CounterCall::Version => return Ok(None),
    };
    Ok(Some(output))
}

pub struct CounterV1;

impl Contract for CounterV1 {
    fn execute(
        &self,
        host: &mut dyn ExecutionHost,
        frame: &CallFrame,
        input: &[u8],
    ) -> Result<Vec<u8>, Revert> {
        let call = CounterCall::decode(input)?;
        match execute_common(host, frame, call)? {
            Some(output) => Ok(output),
            None if call == CounterCall::Version => Ok(vec![1]),
            None => Err(revert("counter: unknown call")),
        }
    }

    fn name(&self) -> &'static str {
        "CounterV1"
    }
}

/// Adds `decrement`.
pub struct CounterV2;

impl Contract for CounterV2 {
    fn execute(
        &self,
        host: &mut dyn ExecutionHost,
        frame: &CallFrame,
        input: &[u8],
    ) -> Result<Vec<u8>, Revert> {
        let call = CounterCall::decode(input)?;
        if let Some(output) = execute_common(host, frame, call)? {
            return Ok(output);
        }

        match call {
            CounterCall::Decrement => {
                let next = count(host, frame)
                    .checked_sub(U256::one())
                    .ok_or_else(|| revert("counter: underflow"))?;
                set_count(host, frame, next)?;
                Ok(Vec::new())
            }
            _ => Ok(vec![2]),
        }
    }

    fn name(&self) -> &'static str {
        "CounterV2"
    }
}
