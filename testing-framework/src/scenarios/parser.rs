//! YAML scenario parser
//!
//! Numbers that may exceed `u64` (balances, attached values) accept either a
//! YAML number or a decimal string.
//!
//! ## Example Scenario
//!
//! ```yaml
//! name: "Upgrade counter"
//! accounts:
//!   - name: "admin"
//!   - name: "alice"
//!     balance: "1000"
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
//!     setup: { op: "initialize", start: 5 }
//!   - action: "upgrade_to"
//!     proxy: "counter"
//!     from: "admin"
//!     logic: "v2"
//!   - action: "call"
//!     proxy: "counter"
//!     from: "alice"
//!     call: { op: "get" }
//!     expect:
//!       returns_u64: 5
//! invariants:
//!   - "event_trail_consistency"
//! ```

use anyhow::{Context, Result};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt};

use proxy_common::{error::ProxyError, runtime::HostConfig};

use crate::contracts::{CounterCall, MockKind, Reentrant, ECHO_REVERT_PREFIX};

/// Name resolving to the zero address
pub const ZERO_ADDRESS_NAME: &str = "zero";

/// Complete test scenario loaded from YAML
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TestScenario {
    /// Scenario name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Host overrides
    #[serde(default)]
    pub host: HostConfig,

    /// Externally owned accounts
    #[serde(default)]
    pub accounts: Vec<AccountSpec>,

    /// Logic contracts deployed before the first step
    #[serde(default)]
    pub contracts: Vec<ContractSpec>,

    /// Execution steps
    pub steps: Vec<Step>,

    /// Invariants checked on every proxy after execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invariants: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AccountSpec {
    pub name: String,

    /// Initial balance
    #[serde(default, deserialize_with = "deserialize_u256_from_string_or_number")]
    pub balance: U256,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ContractSpec {
    pub name: String,
    pub kind: MockKind,
}

/// Test execution step
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Deploy a proxy; on expected failure the name stays unbound
    DeployProxy {
        name: String,
        logic: String,
        admin: String,
        /// Deployer, defaults to `admin`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        setup: Option<CallSpec>,
        #[serde(default, deserialize_with = "deserialize_u256_from_string_or_number")]
        value: U256,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expect: Option<Expect>,
    },

    UpgradeTo {
        proxy: String,
        from: String,
        logic: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expect: Option<Expect>,
    },

    UpgradeToAndCall {
        proxy: String,
        from: String,
        logic: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        call: Option<CallSpec>,
        #[serde(default, deserialize_with = "deserialize_u256_from_string_or_number")]
        value: U256,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expect: Option<Expect>,
    },

    ChangeAdmin {
        proxy: String,
        from: String,
        new_admin: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expect: Option<Expect>,
    },

    /// Fallback call through the proxy
    Call {
        proxy: String,
        from: String,
        call: CallSpec,
        #[serde(default, deserialize_with = "deserialize_u256_from_string_or_number")]
        value: U256,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expect: Option<Expect>,
    },

    AssertImplementation {
        proxy: String,
        eq: String,
    },

    AssertAdmin {
        proxy: String,
        eq: String,
    },

    /// Count proxy events of one kind
    AssertEvents {
        proxy: String,
        #[serde(flatten)]
        event: EventMatch,
        count: usize,
    },

    AssertBalance {
        account: String,
        #[serde(deserialize_with = "deserialize_u256_from_string_or_number")]
        eq: U256,
    },
}

/// Payload of a forwarded call
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CallSpec {
    Initialize { start: u64 },
    Increment,
    Decrement,
    Get,
    Version,
    /// Reentrant: call back into the proxy with `inner`
    Reenter { inner: Box<CallSpec> },
    /// Reentrant: number of reentries recorded
    Entered,
    /// Echo: fail with `hex` as failure data
    EchoRevert { hex: String },
    /// Arbitrary bytes
    Raw { hex: String },
}

impl CallSpec {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let bytes = match self {
            Self::Initialize { start } => CounterCall::Initialize(*start).encode(),
            Self::Increment => CounterCall::Increment.encode(),
            Self::Decrement => CounterCall::Decrement.encode(),
            Self::Get => CounterCall::Get.encode(),
            Self::Version => CounterCall::Version.encode(),
            Self::Reenter { inner } => Reentrant::reenter(&inner.encode()?),
            Self::Entered => Reentrant::entered(),
            Self::EchoRevert { hex } => {
                let mut bytes = vec![ECHO_REVERT_PREFIX];
                bytes.extend(decode_hex(hex)?);
                bytes
            }
            Self::Raw { hex } => decode_hex(hex)?,
        };
        Ok(bytes)
    }
}

pub(crate) fn decode_hex(value: &str) -> Result<Vec<u8>> {
    let value = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(value).with_context(|| format!("Invalid hex: {}", value))
}

/// Expected step outcome
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Expect {
    #[serde(default)]
    pub status: Status,

    /// Expected error kind, implies `status: failure`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,

    /// Return data as a single big-endian word
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns_u64: Option<u64>,

    /// Exact return (or failure) data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns_hex: Option<String>,
}

impl Expect {
    pub fn expects_failure(&self) -> bool {
        self.status == Status::Failure || self.error.is_some()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Success,
    Failure,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    NotAContract,
    ZeroAdmin,
    NoImplementation,
    Initialization,
    SetupCallFailed,
    LogicReverted,
    MalformedCall,
    SetupPayloadTooLarge,
    Host,
}

impl ErrorKind {
    pub fn matches(&self, err: &ProxyError) -> bool {
        matches!(
            (self, err),
            (Self::Unauthorized, ProxyError::Unauthorized { .. })
                | (Self::NotAContract, ProxyError::NotAContract { .. })
                | (Self::ZeroAdmin, ProxyError::ZeroAdmin)
                | (Self::NoImplementation, ProxyError::NoImplementation)
                | (Self::Initialization, ProxyError::Initialization { .. })
                | (Self::SetupCallFailed, ProxyError::SetupCallFailed { .. })
                | (Self::LogicReverted, ProxyError::LogicReverted(_))
                | (Self::MalformedCall, ProxyError::MalformedCall { .. })
                | (Self::SetupPayloadTooLarge, ProxyError::SetupPayloadTooLarge { .. })
                | (Self::Host, ProxyError::Host(_))
        )
    }
}

/// Event selector for `assert_events`
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventMatch {
    /// `Upgraded`, optionally to a given logic
    Upgraded {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        implementation: Option<String>,
    },
    /// `AdminChanged`, optionally to a given admin
    AdminChanged {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_admin: Option<String>,
    },
}

/// Custom deserializer: accepts U256 as decimal string or number
fn deserialize_u256_from_string_or_number<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct U256Visitor;

    impl<'de> Visitor<'de> for U256Visitor {
        type Value = U256;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an unsigned integer as number or decimal string")
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(U256::from(value))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if value < 0 {
                return Err(de::Error::custom(format!(
                    "negative value not allowed: {}",
                    value
                )));
            }
            Ok(U256::from(value as u64))
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            U256::from_dec_str(value).map_err(|e| de::Error::custom(format!("{:?}", e)))
        }
    }

    deserializer.deserialize_any(U256Visitor)
}

/// Parse YAML scenario file
pub fn parse_scenario(yaml: &str) -> Result<TestScenario> {
    let scenario: TestScenario = serde_yaml::from_str(yaml)
        .map_err(|e| anyhow::anyhow!("Failed to parse YAML scenario: {}", e))?;

    validate_scenario(&scenario)?;

    Ok(scenario)
}

/// Validate scenario structure
fn validate_scenario(scenario: &TestScenario) -> Result<()> {
    anyhow::ensure!(!scenario.name.is_empty(), "Scenario name cannot be empty");
    anyhow::ensure!(
        !scenario.steps.is_empty(),
        "Scenario must have at least one step"
    );

    // Accounts, contracts and proxies share one namespace
    let mut names = HashSet::new();
    let declared = scenario
        .accounts
        .iter()
        .map(|a| &a.name)
        .chain(scenario.contracts.iter().map(|c| &c.name));
    for name in declared {
        anyhow::ensure!(!name.is_empty(), "Name cannot be empty");
        anyhow::ensure!(
            name != ZERO_ADDRESS_NAME,
            "'{}' is reserved for the zero address",
            ZERO_ADDRESS_NAME
        );
        anyhow::ensure!(names.insert(name.clone()), "Duplicate name: {}", name);
    }

    for step in &scenario.steps {
        if let Step::DeployProxy { name, .. } = step {
            anyhow::ensure!(
                name != ZERO_ADDRESS_NAME && !names.contains(name),
                "Proxy name '{}' clashes with a declared name",
                name
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_parse_minimal_scenario() {
        let yaml = r#"
name: "Minimal"
accounts:
  - name: "admin"
  - name: "alice"
    balance: "1000"
contracts:
  - name: "v1"
    kind: "counter_v1"
steps:
  - action: "deploy_proxy"
    name: "counter"
    logic: "v1"
    admin: "admin"
    setup: { op: "initialize", start: 5 }
  - action: "call"
    proxy: "counter"
    from: "alice"
    call: { op: "get" }
    expect:
      returns_u64: 5
"#;

        let scenario = parse_scenario(yaml).expect("Failed to parse");
        assert_eq!(scenario.accounts[1].balance, U256::from(1000u64));
        assert_eq!(scenario.accounts[0].balance, U256::zero());
        assert_eq!(scenario.contracts[0].kind, MockKind::CounterV1);
        assert_eq!(scenario.host, HostConfig::default());
        assert!(matches!(
            &scenario.steps[0],
            Step::DeployProxy {
                setup: Some(CallSpec::Initialize { start: 5 }),
                ..
            }
        ));
    }

    #[test]
    fn test_parse_expectations_and_events() {
        let yaml = r#"
name: "Expect"
host:
  max_call_depth: 16
steps:
  - action: "change_admin"
    proxy: "p"
    from: "mallory"
    new_admin: "zero"
    expect:
      error: "unauthorized"
  - action: "assert_events"
    proxy: "p"
    event: "upgraded"
    implementation: "v2"
    count: 1
"#;

        let scenario = parse_scenario(yaml).expect("Failed to parse");
        assert_eq!(scenario.host.max_call_depth, 16);
        match &scenario.steps[0] {
            Step::ChangeAdmin {
                expect: Some(expect),
                ..
            } => {
                assert!(expect.expects_failure());
                assert_eq!(expect.error, Some(ErrorKind::Unauthorized));
            }
            other => panic!("Unexpected step {:?}", other),
        }
        match &scenario.steps[1] {
            Step::AssertEvents {
                event: EventMatch::Upgraded { implementation },
                count,
                ..
            } => {
                assert_eq!(implementation.as_deref(), Some("v2"));
                assert_eq!(*count, 1);
            }
            other => panic!("Unexpected step {:?}", other),
        }
    }

    #[test]
    fn test_validation_errors() {
        let duplicate = r#"
name: "Bad"
accounts:
  - name: "alice"
contracts:
  - name: "alice"
    kind: "echo"
steps:
  - action: "assert_balance"
    account: "alice"
    eq: 0
"#;
        assert!(parse_scenario(duplicate).is_err());

        let reserved = r#"
name: "Bad"
accounts:
  - name: "zero"
steps:
  - action: "assert_balance"
    account: "zero"
    eq: 0
"#;
        assert!(parse_scenario(reserved).is_err());

        let no_steps = r#"
name: "Bad"
steps: []
"#;
        assert!(parse_scenario(no_steps).is_err());
    }

    #[test]
    fn test_call_spec_encoding() {
        let reenter = CallSpec::Reenter {
            inner: Box::new(CallSpec::Entered),
        };
        assert_eq!(reenter.encode().unwrap(), vec![0x01, 0x02]);
        let raw = CallSpec::Raw {
            hex: "0xdead".to_string(),
        };
        assert_eq!(raw.encode().unwrap(), vec![0xde, 0xad]);
        let bad = CallSpec::Raw {
            hex: "zz".to_string(),
        };
        assert!(bad.encode().is_err());
    }

    #[test]
    fn test_error_kind_matching() {
        assert!(ErrorKind::ZeroAdmin.matches(&ProxyError::ZeroAdmin));
        assert!(!ErrorKind::ZeroAdmin.matches(&ProxyError::NoImplementation));
        assert!(ErrorKind::LogicReverted.matches(&ProxyError::LogicReverted(vec![])));
    }
}
