//! # Proxy Testing Framework
//!
//! Tooling to exercise upgradeable proxies on the in-memory host:
//!
//! - **contracts**: mock logic components (counters, echo, context probe,
//!   re-entrant caller, reverter)
//! - **client**: typed [`ProxyClient`] encoding admin calls and decoding failures
//! - **invariants**: checks run after scenarios and property tests
//! - **scenarios**: YAML DSL parser and executor, also driven by the
//!   `proxy-scenario` binary
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use proxy_testing_framework::prelude::*;
//!
//! let mut host = MemoryHost::default();
//! let admin = Address::from_label("admin");
//! let logic = host.deploy(&admin, Arc::new(CounterV1), &[], U256::zero())?;
//! let proxy = ProxyClient::deploy(&mut host, &admin, &ProxyInit::new(logic, admin, vec![]), U256::zero())?;
//! proxy.call(&mut host, &admin, &CounterCall::Increment.encode(), U256::zero())?;
//! ```

#![warn(clippy::all)]

pub mod client;

/// Mock logic components
pub mod contracts;

// Proxy invariant checkers (liveness, event trail)
pub mod invariants;

// DSL scenario parser and executor
pub mod scenarios;

// Convenient re-exports for common usage
pub mod prelude;

pub use client::ProxyClient;
