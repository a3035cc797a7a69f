//! Typed access to a deployed proxy
//!
//! Encodes the admin calls, submits them as top-level transactions on a
//! [`MemoryHost`] and turns failure data back into [`ProxyError`].

use primitive_types::U256;
use std::sync::Arc;

use proxy_common::{
    crypto::Address,
    error::ProxyError,
    proxy::{ProxyCall, ProxyEvent, ProxyInit, UpgradeableProxy},
    runtime::MemoryHost,
};

/// Handle on one proxy instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyClient {
    address: Address,
}

/// Map failure data to the proxy error it carries.
///
/// Data that is not one of the proxy's own errors is a relayed logic failure.
pub fn decode_failure(data: Vec<u8>) -> ProxyError {
    ProxyError::decode(&data).unwrap_or(ProxyError::LogicReverted(data))
}

impl ProxyClient {
    pub fn at(address: Address) -> Self {
        Self { address }
    }

    /// Deploy a new proxy with the host's configuration.
    pub fn deploy(
        host: &mut MemoryHost,
        deployer: &Address,
        init: &ProxyInit,
        value: U256,
    ) -> Result<Self, ProxyError> {
        let code = Arc::new(UpgradeableProxy::with_config(host.config()));
        host.deploy(deployer, code, &init.encode(), value)
            .map(Self::at)
            .map_err(|revert| decode_failure(revert.into_data()))
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn implementation(&self, host: &MemoryHost) -> Address {
        UpgradeableProxy::implementation(host, &self.address)
    }

    pub fn admin(&self, host: &MemoryHost) -> Address {
        UpgradeableProxy::admin(host, &self.address)
    }

    /// Proxy events, oldest first.
    pub fn events(&self, host: &MemoryHost) -> Vec<ProxyEvent> {
        host.events_of(&self.address)
            .filter_map(ProxyEvent::decode)
            .collect()
    }

    /// Call through the fallback path.
    pub fn call(
        &self,
        host: &mut MemoryHost,
        caller: &Address,
        payload: &[u8],
        value: U256,
    ) -> Result<Vec<u8>, ProxyError> {
        host.transact(caller, &self.address, payload, value)
            .into_result()
            .map_err(|revert| decode_failure(revert.into_data()))
    }

    pub fn upgrade_to(
        &self,
        host: &mut MemoryHost,
        caller: &Address,
        logic: &Address,
    ) -> Result<(), ProxyError> {
        let call = ProxyCall::UpgradeTo { logic: *logic };
        self.call(host, caller, &call.encode(), U256::zero())
            .map(|_| ())
    }

    pub fn upgrade_to_and_call(
        &self,
        host: &mut MemoryHost,
        caller: &Address,
        logic: &Address,
        payload: &[u8],
        value: U256,
    ) -> Result<(), ProxyError> {
        let call = ProxyCall::UpgradeToAndCall {
            logic: *logic,
            payload: payload.to_vec(),
        };
        self.call(host, caller, &call.encode(), value).map(|_| ())
    }

    pub fn change_admin(
        &self,
        host: &mut MemoryHost,
        caller: &Address,
        admin: &Address,
    ) -> Result<(), ProxyError> {
        let call = ProxyCall::ChangeAdmin { admin: *admin };
        self.call(host, caller, &call.encode(), U256::zero())
            .map(|_| ())
    }
}
