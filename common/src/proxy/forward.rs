use log::trace;

use super::UpgradeableProxy;
use crate::{
    contract::{CallFrame, ExecutionHost},
    error::ProxyError,
};

/// Relay a call to the active logic, running it against the proxy's storage.
///
/// Caller and value of `frame` are preserved by the delegation, so the logic
/// sees exactly what a direct call would have seen. The full return data is
/// relayed; a logic failure becomes [`ProxyError::LogicReverted`], which
/// encodes back to the logic's failure bytes unchanged.
pub(super) fn forward(
    host: &mut dyn ExecutionHost,
    frame: &CallFrame,
    payload: &[u8],
) -> Result<Vec<u8>, ProxyError> {
    let logic = UpgradeableProxy::implementation(host, &frame.address);
    if logic.is_zero() {
        return Err(ProxyError::NoImplementation);
    }

    trace!(
        "Forwarding {} bytes from {} to {} (value {})",
        payload.len(),
        frame.caller,
        logic,
        frame.value
    );

    let outcome = host.delegate_call(frame, &logic, payload);
    if outcome.success {
        Ok(outcome.return_data)
    } else {
        trace!("Logic {} failed, relaying {} bytes", logic, outcome.return_data.len());
        Err(ProxyError::LogicReverted(outcome.return_data))
    }
}
