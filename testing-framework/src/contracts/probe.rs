use primitive_types::U256;
use proxy_common::{
    contract::{CallFrame, Contract, ExecutionHost, Revert},
    crypto::{Address, Hash},
    serializer::{Reader, Writer},
    storage::StorageSlot,
};

/// Context seen by a running contract, as reported by [`ContextProbe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub caller: Address,
    pub value: U256,
    /// Storage context
    pub address: Address,
    pub code_address: Address,
    pub balance: U256,
}

impl ProbeReport {
    pub fn decode(data: &[u8]) -> Option<Self> {
        let mut reader = Reader::new(data);
        let report = Self {
            caller: reader.read_address().ok()?,
            value: reader.read_u256().ok()?,
            address: reader.read_address().ok()?,
            code_address: reader.read_address().ok()?,
            balance: reader.read_u256().ok()?,
        };
        reader.finish().ok()?;
        Some(report)
    }
}

/// Reports the frame it runs in: `caller ‖ value ‖ address ‖ code ‖ balance`.
pub struct ContextProbe;

impl Contract for ContextProbe {
    fn execute(
        &self,
        host: &mut dyn ExecutionHost,
        frame: &CallFrame,
        _input: &[u8],
    ) -> Result<Vec<u8>, Revert> {
        let mut writer = Writer::with_capacity(32 * 5);
        writer.write_address(&frame.caller);
        writer.write_u256(frame.value);
        writer.write_address(&frame.address);
        writer.write_address(&frame.code_address);
        writer.write_u256(host.balance(&frame.address));
        Ok(writer.bytes())
    }

    fn name(&self) -> &'static str {
        "ContextProbe"
    }
}

const OP_REENTER: u8 = 0x01;
const OP_ENTERED: u8 = 0x02;

/// Calls back into its own storage context.
///
/// - `0x01 ‖ inner`: bump field 0, call `frame.address` with `inner`, relay
///   the inner result (failure included)
/// - `0x02`: return field 0
///
/// Behind a proxy, `frame.address` is the proxy, so `inner` goes through
/// the proxy dispatch again.
pub struct Reentrant;

impl Reentrant {
    pub fn reenter(inner: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(inner.len() + 1);
        bytes.push(OP_REENTER);
        bytes.extend_from_slice(inner);
        bytes
    }

    pub fn entered() -> Vec<u8> {
        vec![OP_ENTERED]
    }
}

impl Contract for Reentrant {
    fn execute(
        &self,
        host: &mut dyn ExecutionHost,
        frame: &CallFrame,
        input: &[u8],
    ) -> Result<Vec<u8>, Revert> {
        let field = StorageSlot::sequential(0);
        match input.split_first() {
            Some((&OP_REENTER, inner)) => {
                let entered = field.get(host, &frame.address).to_u256();
                field.set(host, frame, Hash::from_u256(entered + U256::one()))?;
                host.call(frame, &frame.address, inner, U256::zero())
                    .into_result()
            }
            Some((&OP_ENTERED, [])) => Ok(field.get(host, &frame.address).to_bytes().to_vec()),
            _ => Err(Revert::new(b"reentrant: unknown call".to_vec())),
        }
    }

    fn name(&self) -> &'static str {
        "Reentrant"
    }
}
