//! DSL scenario parser and executor
//!
//! Scenarios name accounts, logic contracts and proxies, then drive the
//! proxies through admin calls and forwarded calls, asserting outcomes.
//! The reserved name `zero` resolves to the zero address.
//!
//! ## Example Scenario
//!
//! ```yaml
//! name: "Unauthorized upgrade"
//! accounts:
//!   - name: "admin"
//!   - name: "mallory"
//! contracts:
//!   - name: "v1"
//!     kind: "counter_v1"
//!   - name: "v2"
//!     kind: "counter_v2"
//! steps:
//!   - action: "deploy_proxy"
//!     name: "counter"
//!     logic: "v1"
//!     admin: "admin"
//!   - action: "upgrade_to"
//!     proxy: "counter"
//!     from: "mallory"
//!     logic: "v2"
//!     expect:
//!       error: "unauthorized"
//!   - action: "assert_implementation"
//!     proxy: "counter"
//!     eq: "v1"
//! invariants:
//!   - "implementation_has_code"
//!   - "event_trail_consistency"
//! ```

pub mod executor;
pub mod parser;

pub use executor::{ExecutionReport, ScenarioExecutor};
pub use parser::{parse_scenario, TestScenario};
