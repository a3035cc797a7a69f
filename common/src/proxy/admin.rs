use log::{info, warn};

use super::{events::ProxyEvent, UpgradeableProxy};
use crate::{
    contract::{CallFrame, ExecutionHost},
    crypto::Address,
    error::ProxyError,
    storage::{ADMIN_SLOT, IMPLEMENTATION_SLOT},
};

/// Fail with [`ProxyError::Unauthorized`] unless the frame's caller is the
/// stored administrator.
pub(super) fn require_admin(host: &dyn ExecutionHost, frame: &CallFrame) -> Result<(), ProxyError> {
    let admin = UpgradeableProxy::admin(host, &frame.address);
    if frame.caller != admin {
        warn!(
            "Rejected admin call on proxy {} from {} (admin is {})",
            frame.address, frame.caller, admin
        );
        return Err(ProxyError::Unauthorized {
            caller: frame.caller,
        });
    }
    Ok(())
}

/// Install `logic` after checking it holds code, and record the change.
///
/// The zero address is refused whatever the host reports for it.
pub(super) fn set_implementation(
    host: &mut dyn ExecutionHost,
    frame: &CallFrame,
    logic: &Address,
) -> Result<(), ProxyError> {
    if logic.is_zero() || !host.has_code(logic) {
        warn!("Refusing to install {} as logic: no code", logic);
        return Err(ProxyError::NotAContract { address: *logic });
    }

    IMPLEMENTATION_SLOT.set_address(host, frame, logic)?;
    host.emit_event(
        frame,
        ProxyEvent::Upgraded {
            implementation: *logic,
        }
        .into_event(frame.address),
    )?;
    Ok(())
}

/// Install `admin` without validation and record the change.
pub(super) fn set_admin(
    host: &mut dyn ExecutionHost,
    frame: &CallFrame,
    admin: &Address,
) -> Result<(), ProxyError> {
    let previous = UpgradeableProxy::admin(host, &frame.address);
    ADMIN_SLOT.set_address(host, frame, admin)?;
    host.emit_event(
        frame,
        ProxyEvent::AdminChanged {
            previous,
            new: *admin,
        }
        .into_event(frame.address),
    )?;
    Ok(())
}

pub(super) fn upgrade_to(
    host: &mut dyn ExecutionHost,
    frame: &CallFrame,
    logic: &Address,
) -> Result<(), ProxyError> {
    require_admin(host, frame)?;
    set_implementation(host, frame, logic)?;
    info!("Proxy {} upgraded to {}", frame.address, logic);
    Ok(())
}

/// Upgrade, then run one setup call on the new logic with the value attached
/// to this call.
///
/// The slot is written before the setup call runs, so a re-entrant call from
/// the new logic already sees it installed.
pub(super) fn upgrade_to_and_call(
    host: &mut dyn ExecutionHost,
    frame: &CallFrame,
    logic: &Address,
    payload: &[u8],
) -> Result<(), ProxyError> {
    require_admin(host, frame)?;
    set_implementation(host, frame, logic)?;
    info!("Proxy {} upgraded to {}", frame.address, logic);

    if !payload.is_empty() {
        let outcome = host.delegate_call(frame, logic, payload);
        if !outcome.success {
            warn!(
                "Setup call on {} for proxy {} failed",
                logic, frame.address
            );
            return Err(ProxyError::SetupCallFailed {
                reason: outcome.return_data,
            });
        }
    }
    Ok(())
}

pub(super) fn change_admin(
    host: &mut dyn ExecutionHost,
    frame: &CallFrame,
    admin: &Address,
) -> Result<(), ProxyError> {
    require_admin(host, frame)?;
    if admin.is_zero() {
        warn!("Refusing zero admin for proxy {}", frame.address);
        return Err(ProxyError::ZeroAdmin);
    }

    set_admin(host, frame, admin)?;
    info!(
        "Proxy {} admin changed from {} to {}",
        frame.address, frame.caller, admin
    );
    Ok(())
}
