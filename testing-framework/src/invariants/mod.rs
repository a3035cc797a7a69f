//! Proxy invariant checkers
//!
//! Run after scenarios and property tests:
//! - Implementation liveness (logic slot non-zero, logic has code)
//! - Event trail consistency (slots equal the last values announced by events)

use anyhow::{ensure, Result};

use proxy_common::{contract::ExecutionHost, proxy::ProxyEvent, runtime::MemoryHost};

use crate::client::ProxyClient;

/// Names accepted in a scenario's `invariants:` list
pub const IMPLEMENTATION_HAS_CODE: &str = "implementation_has_code";
pub const EVENT_TRAIL_CONSISTENCY: &str = "event_trail_consistency";

/// Check the logic slot of an initialized proxy points at code
pub fn check_implementation_has_code(host: &MemoryHost, proxy: &ProxyClient) -> Result<()> {
    let logic = proxy.implementation(host);
    ensure!(
        !logic.is_zero(),
        "Proxy {} has no implementation",
        proxy.address()
    );
    ensure!(
        host.has_code(&logic),
        "Implementation {} of proxy {} has no code",
        logic,
        proxy.address()
    );
    Ok(())
}

/// Check both slots equal the values carried by the last matching event
///
/// Every write to the reserved slots goes with an event, so a mismatch means
/// a slot changed without a trail (e.g. logic code writing into it).
pub fn check_event_trail(host: &MemoryHost, proxy: &ProxyClient) -> Result<()> {
    let events = proxy.events(host);

    let last_logic = events.iter().rev().find_map(|event| match event {
        ProxyEvent::Upgraded { implementation } => Some(*implementation),
        _ => None,
    });
    let last_admin = events.iter().rev().find_map(|event| match event {
        ProxyEvent::AdminChanged { new, .. } => Some(*new),
        _ => None,
    });

    ensure!(
        last_logic == Some(proxy.implementation(host)),
        "Proxy {} implementation {} does not match last Upgraded event {:?}",
        proxy.address(),
        proxy.implementation(host),
        last_logic
    );
    ensure!(
        last_admin == Some(proxy.admin(host)),
        "Proxy {} admin {} does not match last AdminChanged event {:?}",
        proxy.address(),
        proxy.admin(host),
        last_admin
    );

    // Each AdminChanged must chain from the previous admin
    let mut previous_admin = None;
    for event in &events {
        if let ProxyEvent::AdminChanged { previous, new } = event {
            if let Some(expected) = previous_admin {
                ensure!(
                    *previous == expected,
                    "Proxy {} admin trail broken: {} announced as previous, expected {}",
                    proxy.address(),
                    previous,
                    expected
                );
            }
            previous_admin = Some(*new);
        }
    }
    Ok(())
}

/// Check a named invariant
pub fn check_invariant(name: &str, host: &MemoryHost, proxy: &ProxyClient) -> Result<()> {
    match name {
        IMPLEMENTATION_HAS_CODE => check_implementation_has_code(host, proxy),
        EVENT_TRAIL_CONSISTENCY => check_event_trail(host, proxy),
        other => anyhow::bail!("Unknown invariant: {}", other),
    }
}

/// Check every invariant on every proxy
pub fn check_all(host: &MemoryHost, proxies: &[ProxyClient]) -> Result<()> {
    for proxy in proxies {
        check_implementation_has_code(host, proxy)?;
        check_event_trail(host, proxy)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::contracts::CounterV1;
    use primitive_types::U256;
    use proxy_common::{crypto::Address, proxy::ProxyInit};
    use std::sync::Arc;

    #[test]
    fn test_fresh_proxy_satisfies_invariants() {
        let mut host = MemoryHost::default();
        let admin = Address::from_label("admin");
        let logic = host
            .deploy(&admin, Arc::new(CounterV1), &[], U256::zero())
            .unwrap();
        let proxy = ProxyClient::deploy(
            &mut host,
            &admin,
            &ProxyInit::new(logic, admin, vec![]),
            U256::zero(),
        )
        .unwrap();

        check_all(&host, &[proxy]).unwrap();
        assert!(check_invariant("no_such_check", &host, &proxy).is_err());
    }

    #[test]
    fn test_missing_proxy_fails_liveness() {
        let host = MemoryHost::default();
        let proxy = ProxyClient::at(Address::from_label("nothing"));
        assert!(check_implementation_has_code(&host, &proxy).is_err());
        assert!(check_event_trail(&host, &proxy).is_err());
    }
}
