//! Common imports for tests
//!
//! ```rust,ignore
//! use proxy_testing_framework::prelude::*;
//! ```

pub use std::sync::Arc;

pub use primitive_types::U256;
pub use proxy_common::{
    contract::{CallFrame, CallOutcome, Contract, ExecutionHost, Revert},
    crypto::{Address, Hash},
    error::{HostError, ProxyError},
    proxy::{ProxyCall, ProxyEvent, ProxyInit, UpgradeableProxy},
    runtime::{HostConfig, MemoryHost},
    storage::{StorageSlot, ADMIN_SLOT, IMPLEMENTATION_SLOT},
};

pub use crate::client::{decode_failure, ProxyClient};
pub use crate::contracts::*;
pub use crate::invariants::check_all;
pub use crate::scenarios::{parse_scenario, ScenarioExecutor};
