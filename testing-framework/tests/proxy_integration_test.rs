#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//! End-to-end proxy behaviour on the in-memory host
//!
//! Covers construction, forwarding, the admin surface, atomic rollback,
//! storage isolation and re-entrancy.

use proxy_testing_framework::prelude::*;

struct World {
    host: MemoryHost,
    admin: Address,
    alice: Address,
    logic_a: Address,
    logic_b: Address,
}

fn world() -> World {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut host = MemoryHost::default();
    let admin = Address::from_label("admin");
    let alice = Address::from_label("alice");
    let logic_a = host
        .deploy(&admin, Arc::new(CounterV1), &[], U256::zero())
        .unwrap();
    let logic_b = host
        .deploy(&admin, Arc::new(CounterV2), &[], U256::zero())
        .unwrap();
    World {
        host,
        admin,
        alice,
        logic_a,
        logic_b,
    }
}

fn deploy(w: &mut World, logic: Address, payload: Vec<u8>) -> Result<ProxyClient, ProxyError> {
    let admin = w.admin;
    ProxyClient::deploy(
        &mut w.host,
        &admin,
        &ProxyInit::new(logic, admin, payload),
        U256::zero(),
    )
}

fn count(w: &mut World, proxy: &ProxyClient) -> U256 {
    let alice = w.alice;
    let out = proxy
        .call(&mut w.host, &alice, &CounterCall::Get.encode(), U256::zero())
        .unwrap();
    decode_count(&out).unwrap()
}

#[test]
fn test_upgrade_scenario() {
    let mut w = world();
    let logic_c = w
        .host
        .deploy(&w.admin, Arc::new(Echo), &[], U256::zero())
        .unwrap();
    let logic = w.logic_a;
    let proxy = deploy(&mut w, logic, vec![]).unwrap();

    let (admin, alice) = (w.admin, w.alice);
    proxy
        .call(&mut w.host, &alice, &CounterCall::Increment.encode(), U256::zero())
        .unwrap();
    let version = proxy
        .call(&mut w.host, &alice, &CounterCall::Version.encode(), U256::zero())
        .unwrap();
    assert_eq!(version, vec![1]);

    proxy.upgrade_to(&mut w.host, &admin, &w.logic_b).unwrap();
    let upgraded_to_b = proxy
        .events(&w.host)
        .into_iter()
        .filter(|e| {
            *e == ProxyEvent::Upgraded {
                implementation: w.logic_b,
            }
        })
        .count();
    assert_eq!(upgraded_to_b, 1);

    let version = proxy
        .call(&mut w.host, &alice, &CounterCall::Version.encode(), U256::zero())
        .unwrap();
    assert_eq!(version, vec![2]);
    assert_eq!(count(&mut w, &proxy), U256::one());

    let mallory = Address::from_label("mallory");
    assert_eq!(
        proxy.upgrade_to(&mut w.host, &mallory, &logic_c),
        Err(ProxyError::Unauthorized { caller: mallory })
    );
    assert_eq!(proxy.implementation(&w.host), w.logic_b);
    check_all(&w.host, &[proxy]).unwrap();
}

#[test]
fn test_failed_initialization_is_atomic() {
    let mut w = world();
    let contracts_before = w.host.contracts().count();

    let logic = w.logic_a;
    let err = deploy(&mut w, logic, vec![0xee]).unwrap_err();
    assert_eq!(
        err,
        ProxyError::Initialization {
            reason: b"counter: unknown call".to_vec()
        }
    );
    assert_eq!(w.host.contracts().count(), contracts_before);
    assert!(w.host.events().is_empty());
}

#[test]
fn test_initialization_runs_once_through_constructor() {
    let mut w = world();
    let logic = w.logic_a;
    let proxy = deploy(&mut w, logic, CounterCall::Initialize(9).encode()).unwrap();
    assert_eq!(count(&mut w, &proxy), U256::from(9u64));

    // The logic's own initializer is one-shot; the proxy has no re-init path
    let alice = w.alice;
    let err = proxy
        .call(&mut w.host, &alice, &CounterCall::Initialize(0).encode(), U256::zero())
        .unwrap_err();
    assert_eq!(
        err,
        ProxyError::LogicReverted(b"counter: already initialized".to_vec())
    );
    assert_eq!(count(&mut w, &proxy), U256::from(9u64));
}

#[test]
fn test_forwarding_before_implementation_fails() {
    // A proxy whose logic slot was never written, reached through a raw frame
    let mut host = MemoryHost::default();
    let user = Address::from_label("user");
    let proxy_address = Address::from_label("bare-proxy");
    let frame = CallFrame::top_level(user, proxy_address, U256::zero());

    let err = UpgradeableProxy::new()
        .dispatch(&mut host, &frame, b"anything")
        .unwrap_err();
    assert_eq!(err, ProxyError::NoImplementation);
}

#[test]
fn test_logic_fields_never_touch_reserved_slots() {
    let mut w = world();
    let logic = w.logic_a;
    let proxy = deploy(&mut w, logic, CounterCall::Initialize(1).encode()).unwrap();
    let alice = w.alice;
    for _ in 0..5 {
        proxy
            .call(&mut w.host, &alice, &CounterCall::Increment.encode(), U256::zero())
            .unwrap();
    }

    assert_eq!(proxy.implementation(&w.host), w.logic_a);
    assert_eq!(proxy.admin(&w.host), w.admin);

    let dump = w.host.storage_dump(proxy.address());
    let keys: Vec<Hash> = dump.iter().map(|(key, _)| *key).collect();
    assert!(keys.contains(IMPLEMENTATION_SLOT.key()));
    assert!(keys.contains(ADMIN_SLOT.key()));
    assert!(keys.contains(StorageSlot::sequential(0).key()));
    assert!(keys.contains(StorageSlot::sequential(1).key()));
    assert_eq!(keys.len(), 4);

    // Logic contract's own storage stays empty
    assert!(w.host.storage_dump(&w.logic_a).is_empty());
}

#[test]
fn test_upgrade_to_and_call_with_value() {
    let mut w = world();
    let probe = w
        .host
        .deploy(&w.admin, Arc::new(ContextProbe), &[], U256::zero())
        .unwrap();
    let logic = w.logic_a;
    let proxy = deploy(&mut w, logic, vec![]).unwrap();
    let admin = w.admin;
    w.host.fund(&admin, U256::from(100u64));

    proxy
        .upgrade_to_and_call(&mut w.host, &admin, &probe, b"probe", U256::from(30u64))
        .unwrap();
    assert_eq!(w.host.balance(proxy.address()), U256::from(30u64));
    assert_eq!(proxy.implementation(&w.host), probe);

    let out = proxy
        .call(&mut w.host, &admin, &[], U256::from(5u64))
        .unwrap();
    let report = ProbeReport::decode(&out).unwrap();
    assert_eq!(report.caller, admin);
    assert_eq!(report.value, U256::from(5u64));
    assert_eq!(report.address, *proxy.address());
    assert_eq!(report.code_address, probe);
    assert_eq!(report.balance, U256::from(35u64));
}

#[test]
fn test_failed_setup_call_rolls_back_upgrade() {
    let mut w = world();
    let broken = w
        .host
        .deploy(&w.admin, Arc::new(Reverter), &[], U256::zero())
        .unwrap();
    let logic = w.logic_a;
    let proxy = deploy(&mut w, logic, vec![]).unwrap();
    let events_before = proxy.events(&w.host).len();

    let admin = w.admin;
    let err = proxy
        .upgrade_to_and_call(&mut w.host, &admin, &broken, b"go", U256::zero())
        .unwrap_err();
    assert_eq!(
        err,
        ProxyError::SetupCallFailed {
            reason: REVERTER_MESSAGE.to_vec()
        }
    );
    assert_eq!(proxy.implementation(&w.host), w.logic_a);
    assert_eq!(proxy.events(&w.host).len(), events_before);

    // Empty payload: no setup call, the reverter is installed
    proxy
        .upgrade_to_and_call(&mut w.host, &admin, &broken, &[], U256::zero())
        .unwrap();
    assert_eq!(proxy.implementation(&w.host), broken);
}

#[test]
fn test_change_admin_rules() {
    let mut w = world();
    let logic = w.logic_a;
    let proxy = deploy(&mut w, logic, vec![]).unwrap();
    let (admin, alice) = (w.admin, w.alice);

    assert_eq!(
        proxy.change_admin(&mut w.host, &admin, &Address::zero()),
        Err(ProxyError::ZeroAdmin)
    );
    assert_eq!(proxy.admin(&w.host), admin);

    proxy.change_admin(&mut w.host, &admin, &alice).unwrap();
    assert_eq!(proxy.admin(&w.host), alice);
    assert_eq!(
        proxy.events(&w.host).last(),
        Some(&ProxyEvent::AdminChanged {
            previous: admin,
            new: alice
        })
    );
    assert_eq!(
        proxy.upgrade_to(&mut w.host, &admin, &w.logic_b),
        Err(ProxyError::Unauthorized { caller: admin })
    );
    proxy.upgrade_to(&mut w.host, &alice, &w.logic_b).unwrap();
    check_all(&w.host, &[proxy]).unwrap();
}

#[test]
fn test_zero_admin_at_construction_freezes_proxy() {
    let mut w = world();
    let admin = w.admin;
    let proxy = ProxyClient::deploy(
        &mut w.host,
        &admin,
        &ProxyInit::new(w.logic_a, Address::zero(), vec![]),
        U256::zero(),
    )
    .unwrap();

    assert!(proxy.admin(&w.host).is_zero());
    assert_eq!(
        proxy.upgrade_to(&mut w.host, &admin, &w.logic_b),
        Err(ProxyError::Unauthorized { caller: admin })
    );
}

#[test]
fn test_upgrade_to_contract_without_code() {
    let mut w = world();
    let logic = w.logic_a;
    let proxy = deploy(&mut w, logic, vec![]).unwrap();
    let admin = w.admin;
    let alice = w.alice;
    assert_eq!(
        proxy.upgrade_to(&mut w.host, &admin, &alice),
        Err(ProxyError::NotAContract { address: alice })
    );
    assert_eq!(proxy.implementation(&w.host), w.logic_a);
}

#[test]
fn test_reentrant_logic_is_forwarded_again() {
    let mut w = world();
    let reentrant = w
        .host
        .deploy(&w.admin, Arc::new(Reentrant), &[], U256::zero())
        .unwrap();
    let proxy = deploy(&mut w, reentrant, vec![]).unwrap();
    let alice = w.alice;

    let nested = Reentrant::reenter(&Reentrant::reenter(&Reentrant::entered()));
    let out = proxy.call(&mut w.host, &alice, &nested, U256::zero()).unwrap();
    assert_eq!(out, Hash::from_u64(2).to_bytes().to_vec());

    // A re-entrant admin call comes from the proxy itself, not the admin.
    // The inner failure data is relayed verbatim up to the transaction.
    let upgrade = ProxyCall::UpgradeTo { logic: w.logic_b }.encode();
    let err = proxy
        .call(&mut w.host, &alice, &Reentrant::reenter(&upgrade), U256::zero())
        .unwrap_err();
    assert_eq!(
        err,
        ProxyError::Unauthorized {
            caller: *proxy.address()
        }
    );
    assert_eq!(proxy.implementation(&w.host), reentrant);

    // The bumps from the failed call are rolled back
    let out = proxy
        .call(&mut w.host, &alice, &Reentrant::entered(), U256::zero())
        .unwrap();
    assert_eq!(out, Hash::from_u64(2).to_bytes().to_vec());
}

#[test]
fn test_setup_call_reenters_new_logic() {
    let mut w = world();
    let logic = w.logic_a;
    let proxy = deploy(&mut w, logic, vec![]).unwrap();
    let reentrant = w
        .host
        .deploy(&w.admin, Arc::new(Reentrant), &[], U256::zero())
        .unwrap();
    let admin = w.admin;

    // The setup call bumps field 0 and calls back into the proxy. That inner
    // call must already be forwarded to the new logic: had it reached the
    // old counter, it would have bumped field 0 a second time.
    proxy
        .upgrade_to_and_call(
            &mut w.host,
            &admin,
            &reentrant,
            &Reentrant::reenter(&Reentrant::entered()),
            U256::zero(),
        )
        .unwrap();

    assert_eq!(proxy.implementation(&w.host), reentrant);
    let alice = w.alice;
    let out = proxy
        .call(&mut w.host, &alice, &Reentrant::entered(), U256::zero())
        .unwrap();
    assert_eq!(out, Hash::from_u64(1).to_bytes().to_vec());
    assert!(check_all(&w.host, &[proxy]).is_ok());
}

#[test]
fn test_static_query_cannot_write_through_proxy() {
    let mut w = world();
    let logic = w.logic_a;
    let proxy = deploy(&mut w, logic, vec![]).unwrap();
    let alice = w.alice;

    let outcome = w
        .host
        .query(&alice, proxy.address(), &CounterCall::Increment.encode());
    assert!(!outcome.success);
    assert_eq!(
        decode_failure(outcome.return_data),
        ProxyError::Host(HostError::StaticStateChange)
    );

    let outcome = w.host.query(&alice, proxy.address(), &CounterCall::Get.encode());
    assert!(outcome.success);
    assert_eq!(decode_count(&outcome.return_data), Some(U256::zero()));
}

#[test]
fn test_counter_behaves_the_same_direct_and_proxied() {
    let mut w = world();
    let direct = w
        .host
        .deploy(&w.admin, Arc::new(CounterV2), &[], U256::zero())
        .unwrap();
    let logic = w.logic_b;
    let proxy = deploy(&mut w, logic, vec![]).unwrap();
    let alice = w.alice;

    let calls = [
        CounterCall::Initialize(3),
        CounterCall::Increment,
        CounterCall::Decrement,
        CounterCall::Decrement,
        CounterCall::Decrement,
        CounterCall::Decrement,
        CounterCall::Initialize(1),
        CounterCall::Get,
        CounterCall::Version,
    ];
    for call in calls {
        let input = call.encode();
        let a = w.host.transact(&alice, &direct, &input, U256::zero());
        let b = w.host.transact(&alice, proxy.address(), &input, U256::zero());
        assert_eq!(a, b, "{:?} diverged", call);
    }

    // Same fields, in each one's own storage
    assert_eq!(
        w.host.storage_dump(&direct),
        w.host
            .storage_dump(proxy.address())
            .into_iter()
            .filter(|(key, _)| key != IMPLEMENTATION_SLOT.key() && key != ADMIN_SLOT.key())
            .collect::<Vec<_>>()
    );
}
