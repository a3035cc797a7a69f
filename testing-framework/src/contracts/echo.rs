use proxy_common::contract::{CallFrame, Contract, ExecutionHost, Revert};

/// Prefix making [`Echo`] fail with the rest of the input as failure data
pub const ECHO_REVERT_PREFIX: u8 = 0xFF;

/// Returns its input unchanged.
///
/// Input starting with [`ECHO_REVERT_PREFIX`] fails instead, with the
/// remaining bytes as failure data.
pub struct Echo;

impl Contract for Echo {
    fn execute(
        &self,
        _host: &mut dyn ExecutionHost,
        _frame: &CallFrame,
        input: &[u8],
    ) -> Result<Vec<u8>, Revert> {
        match input.split_first() {
            Some((&ECHO_REVERT_PREFIX, rest)) => Err(Revert::new(rest.to_vec())),
            _ => Ok(input.to_vec()),
        }
    }

    fn name(&self) -> &'static str {
        "Echo"
    }
}

pub const REVERTER_MESSAGE: &[u8] = b"reverter: always fails";

/// Fails every call, including the setup call made right after an upgrade.
pub struct Reverter;

impl Contract for Reverter {
    fn execute(
        &self,
        _host: &mut dyn ExecutionHost,
        _frame: &CallFrame,
        _input: &[u8],
    ) -> Result<Vec<u8>, Revert> {
        Err(Revert::new(REVERTER_MESSAGE.to_vec()))
    }

    fn name(&self) -> &'static str {
        "Reverter"
    }
}
