//! Upgradeable proxy
//!
//! A stable front whose storage is shared with a swappable logic component.
//! The proxy keeps exactly two values of its own, the logic address and the
//! admin address, in derived slots (see [`crate::storage`]). Every call whose
//! selector is not one of the three admin operations is delegated to the
//! logic, so the logic's code runs against the proxy's storage.
//!
//! ```text
//! execute(input)
//!   ├─ upgradeTo(address)               → admin::upgrade_to
//!   ├─ upgradeToAndCall(address,bytes)  → admin::upgrade_to_and_call
//!   ├─ changeAdmin(address)             → admin::change_admin
//!   └─ anything else                    → forward::forward (delegate_call)
//! ```

mod abi;
mod admin;
mod events;
mod forward;

pub use abi::*;
pub use events::*;

use log::{debug, info, warn};

use crate::{
    config::MAX_SETUP_PAYLOAD_SIZE,
    contract::{CallFrame, Contract, ExecutionHost, Revert},
    crypto::Address,
    error::ProxyError,
    runtime::HostConfig,
    storage::{ADMIN_SLOT, IMPLEMENTATION_SLOT},
};

/// Proxy code, deployed once per proxy instance.
///
/// Holds no state: the only per-instance data lives in the host storage of
/// the address it is deployed at.
#[derive(Debug, Clone)]
pub struct UpgradeableProxy {
    max_setup_payload_size: usize,
}

impl Default for UpgradeableProxy {
    fn default() -> Self {
        Self {
            max_setup_payload_size: MAX_SETUP_PAYLOAD_SIZE,
        }
    }
}

impl UpgradeableProxy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &HostConfig) -> Self {
        Self {
            max_setup_payload_size: config.max_setup_payload_size,
        }
    }

    /// Active logic of `proxy`; zero when none is installed.
    ///
    /// This is the lookup the forwarder uses.
    pub fn implementation(host: &dyn ExecutionHost, proxy: &Address) -> Address {
        IMPLEMENTATION_SLOT.get_address(host, proxy)
    }

    pub fn admin(host: &dyn ExecutionHost, proxy: &Address) -> Address {
        ADMIN_SLOT.get_address(host, proxy)
    }

    /// One-time setup
    ///
    /// Installs logic and admin, then runs the optional setup payload on the
    /// logic. The admin is taken as given, a zero admin leaves the proxy
    /// without anyone able to upgrade it.
    ///
    /// # Errors
    ///
    /// - [`ProxyError::SetupPayloadTooLarge`] if the payload exceeds the bound
    /// - [`ProxyError::NotAContract`] if `init.logic` has no code
    /// - [`ProxyError::Initialization`] if the setup call fails
    pub fn initialize(
        &self,
        host: &mut dyn ExecutionHost,
        frame: &CallFrame,
        init: &ProxyInit,
    ) -> Result<(), ProxyError> {
        if init.payload.len() > self.max_setup_payload_size {
            return Err(ProxyError::SetupPayloadTooLarge {
                size: init.payload.len(),
                max: self.max_setup_payload_size,
            });
        }

        admin::set_implementation(host, frame, &init.logic)?;
        if init.admin.is_zero() {
            warn!("Proxy {} created with zero admin, it cannot be upgraded", frame.address);
        }
        admin::set_admin(host, frame, &init.admin)?;

        if !init.payload.is_empty() {
            debug!(
                "Running {} bytes of setup on {} for proxy {}",
                init.payload.len(),
                init.logic,
                frame.address
            );
            let outcome = host.delegate_call(frame, &init.logic, &init.payload);
            if !outcome.success {
                return Err(ProxyError::Initialization {
                    reason: outcome.return_data,
                });
            }
        }

        info!(
            "Proxy {} initialized with logic {} and admin {}",
            frame.address, init.logic, init.admin
        );
        Ok(())
    }

    /// Single dispatch point for every call to the proxy.
    pub fn dispatch(
        &self,
        host: &mut dyn ExecutionHost,
        frame: &CallFrame,
        input: &[u8],
    ) -> Result<Vec<u8>, ProxyError> {
        let call = match ProxyCall::decode(input)? {
            Some(call) => call,
            None => return forward::forward(host, frame, input),
        };

        debug!("Proxy {} handling {} from {}", frame.address, call.name(), frame.caller);
        match &call {
            ProxyCall::UpgradeTo { logic } => admin::upgrade_to(host, frame, logic)?,
            ProxyCall::UpgradeToAndCall { logic, payload } => {
                admin::upgrade_to_and_call(host, frame, logic, payload)?
            }
            ProxyCall::ChangeAdmin { admin } => admin::change_admin(host, frame, admin)?,
        }
        Ok(Vec::new())
    }
}

impl Contract for UpgradeableProxy {
    fn execute(
        &self,
        host: &mut dyn ExecutionHost,
        frame: &CallFrame,
        input: &[u8],
    ) -> Result<Vec<u8>, Revert> {
        self.dispatch(host, frame, input).map_err(|err| {
            debug!(
                "Call on proxy {} from {} failed ({}): {}",
                frame.address,
                frame.caller,
                err.category(),
                err
            );
            Revert::from(err)
        })
    }

    fn construct(
        &self,
        host: &mut dyn ExecutionHost,
        frame: &CallFrame,
        input: &[u8],
    ) -> Result<(), Revert> {
        let init = ProxyInit::decode(input)?;
        self.initialize(host, frame, &init)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "UpgradeableProxy"
    }
}
