//! YAML scenario execution engine
//!
//! Runs parsed scenarios against a fresh [`MemoryHost`].
//!
//! # Example
//!
//! ```rust,ignore
//! use proxy_testing_framework::scenarios::{parse_scenario, ScenarioExecutor};
//!
//! let scenario = parse_scenario(include_str!("../../scenarios/upgrade_flow.yaml"))?;
//! let mut executor = ScenarioExecutor::new();
//! let report = executor.execute(&scenario)?;
//!
//! assert!(report.success);
//! ```

use anyhow::{bail, ensure, Context, Result};
use log::{debug, info};
use primitive_types::U256;
use serde::Serialize;
use std::collections::HashMap;

use proxy_common::{
    contract::ExecutionHost,
    crypto::{Address, Hash},
    error::ProxyError,
    proxy::{ProxyEvent, ProxyInit},
    runtime::MemoryHost,
};

use super::parser::{decode_hex, EventMatch, Expect, Step, TestScenario, ZERO_ADDRESS_NAME};
use crate::{client::ProxyClient, invariants};

/// Account deploying the scenario's logic contracts
const CONTRACT_DEPLOYER_LABEL: &str = "scenario-deployer";

/// Scenario executor that runs parsed YAML scenarios
pub struct ScenarioExecutor {
    host: MemoryHost,

    /// Named addresses: accounts, logic contracts and proxies
    names: HashMap<String, Address>,

    /// Proxies deployed so far, in deployment order
    proxies: Vec<ProxyClient>,

    /// Execution log
    log: Vec<String>,

    /// Current step number (1-indexed)
    current_step: usize,
}

/// Summary of a scenario run
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub scenario_name: String,
    pub steps_executed: usize,
    pub success: bool,
    pub log: Vec<String>,
}

impl Default for ScenarioExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioExecutor {
    pub fn new() -> Self {
        Self {
            host: MemoryHost::default(),
            names: HashMap::new(),
            proxies: Vec::new(),
            log: Vec::new(),
            current_step: 0,
        }
    }

    /// Host state after the last run
    pub fn host(&self) -> &MemoryHost {
        &self.host
    }

    /// Address bound to `name` in the last run
    pub fn address_of(&self, name: &str) -> Option<&Address> {
        self.names.get(name)
    }

    /// Execute a complete scenario on a fresh host
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Setup fails (contract deployment)
    /// - Any step does not have its expected outcome
    /// - Any invariant does not hold
    pub fn execute(&mut self, scenario: &TestScenario) -> Result<ExecutionReport> {
        self.host = MemoryHost::new(scenario.host.clone());
        self.names.clear();
        self.proxies.clear();
        self.log.clear();
        self.current_step = 0;

        info!("Starting scenario: {}", scenario.name);
        self.log(format!("Starting scenario: {}", scenario.name));
        if let Some(desc) = &scenario.description {
            self.log(format!("Description: {}", desc));
        }

        self.setup(scenario)?;

        for (idx, step) in scenario.steps.iter().enumerate() {
            self.current_step = idx + 1;
            self.log(format!("--- Step {}: {:?} ---", self.current_step, step));

            self.execute_step(step)
                .with_context(|| format!("Failed at step {} ({:?})", self.current_step, step))?;
        }

        if let Some(names) = &scenario.invariants {
            self.log("--- Checking Invariants ---".to_string());
            for name in names {
                for proxy in &self.proxies {
                    invariants::check_invariant(name, &self.host, proxy)
                        .with_context(|| format!("Invariant '{}' violated", name))?;
                }
                self.log(format!("  {} holds", name));
            }
        }

        self.log("=== Scenario completed successfully ===".to_string());

        Ok(ExecutionReport {
            scenario_name: scenario.name.clone(),
            steps_executed: self.current_step,
            success: true,
            log: self.log.clone(),
        })
    }

    fn setup(&mut self, scenario: &TestScenario) -> Result<()> {
        for account in &scenario.accounts {
            let address = Address::from_label(&account.name);
            self.host.fund(&address, account.balance);
            self.names.insert(account.name.clone(), address);
            self.log(format!(
                "  Account '{}': balance={} ({})",
                account.name, account.balance, address
            ));
        }

        let deployer = Address::from_label(CONTRACT_DEPLOYER_LABEL);
        for contract in &scenario.contracts {
            let address = self
                .host
                .deploy(&deployer, contract.kind.build(), &[], U256::zero())
                .map_err(|revert| anyhow::anyhow!("{}", revert))
                .with_context(|| format!("Failed to deploy contract '{}'", contract.name))?;
            self.names.insert(contract.name.clone(), address);
            self.log(format!(
                "  Contract '{}': {:?} ({})",
                contract.name, contract.kind, address
            ));
        }
        Ok(())
    }

    fn execute_step(&mut self, step: &Step) -> Result<()> {
        match step {
            Step::DeployProxy {
                name,
                logic,
                admin,
                from,
                setup,
                value,
                expect,
            } => {
                let logic = self.resolve(logic)?;
                let admin_address = self.resolve(admin)?;
                let deployer = self.resolve(from.as_deref().unwrap_or(admin.as_str()))?;
                let payload = match setup {
                    Some(call) => call.encode()?,
                    None => Vec::new(),
                };

                let contracts_before = self.host.contracts().count();
                let events_before = self.host.events().len();
                let init = ProxyInit::new(logic, admin_address, payload);
                let result = ProxyClient::deploy(&mut self.host, &deployer, &init, *value);

                let proxy = result.as_ref().ok().copied();
                self.check_outcome(result.map(|_| Vec::new()), expect.as_ref())?;

                match proxy {
                    Some(proxy) => {
                        self.log(format!("  Proxy '{}' deployed at {}", name, proxy.address()));
                        self.names.insert(name.clone(), *proxy.address());
                        self.proxies.push(proxy);
                    }
                    None => {
                        // A failed construction leaves nothing observable
                        ensure!(
                            self.host.contracts().count() == contracts_before,
                            "Failed deployment of '{}' left code behind",
                            name
                        );
                        ensure!(
                            self.host.events().len() == events_before,
                            "Failed deployment of '{}' left events behind",
                            name
                        );
                    }
                }
                Ok(())
            }

            Step::UpgradeTo {
                proxy,
                from,
                logic,
                expect,
            } => {
                let client = self.proxy(proxy)?;
                let caller = self.resolve(from)?;
                let logic = self.resolve(logic)?;
                let result = client
                    .upgrade_to(&mut self.host, &caller, &logic)
                    .map(|()| Vec::new());
                self.check_outcome(result, expect.as_ref())
            }

            Step::UpgradeToAndCall {
                proxy,
                from,
                logic,
                call,
                value,
                expect,
            } => {
                let client = self.proxy(proxy)?;
                let caller = self.resolve(from)?;
                let logic = self.resolve(logic)?;
                let payload = match call {
                    Some(call) => call.encode()?,
                    None => Vec::new(),
                };
                let result = client
                    .upgrade_to_and_call(&mut self.host, &caller, &logic, &payload, *value)
                    .map(|()| Vec::new());
                self.check_outcome(result, expect.as_ref())
            }

            Step::ChangeAdmin {
                proxy,
                from,
                new_admin,
                expect,
            } => {
                let client = self.proxy(proxy)?;
                let caller = self.resolve(from)?;
                let new_admin = self.resolve(new_admin)?;
                let result = client
                    .change_admin(&mut self.host, &caller, &new_admin)
                    .map(|()| Vec::new());
                self.check_outcome(result, expect.as_ref())
            }

            Step::Call {
                proxy,
                from,
                call,
                value,
                expect,
            } => {
                let client = self.proxy(proxy)?;
                let caller = self.resolve(from)?;
                let payload = call.encode()?;
                let result = client.call(&mut self.host, &caller, &payload, *value);
                self.check_outcome(result, expect.as_ref())
            }

            Step::AssertImplementation { proxy, eq } => {
                let client = self.proxy(proxy)?;
                let expected = self.resolve(eq)?;
                let actual = client.implementation(&self.host);
                ensure!(
                    actual == expected,
                    "Implementation of '{}' is {}, expected '{}' ({})",
                    proxy,
                    actual,
                    eq,
                    expected
                );
                self.log(format!("  ✓ '{}' implementation is '{}'", proxy, eq));
                Ok(())
            }

            Step::AssertAdmin { proxy, eq } => {
                let client = self.proxy(proxy)?;
                let expected = self.resolve(eq)?;
                let actual = client.admin(&self.host);
                ensure!(
                    actual == expected,
                    "Admin of '{}' is {}, expected '{}' ({})",
                    proxy,
                    actual,
                    eq,
                    expected
                );
                self.log(format!("  ✓ '{}' admin is '{}'", proxy, eq));
                Ok(())
            }

            Step::AssertEvents {
                proxy,
                event,
                count,
            } => {
                let client = self.proxy(proxy)?;
                let filter = match event {
                    EventMatch::Upgraded { implementation } => {
                        (true, implementation.as_deref().map(|n| self.resolve(n)).transpose()?)
                    }
                    EventMatch::AdminChanged { new_admin } => {
                        (false, new_admin.as_deref().map(|n| self.resolve(n)).transpose()?)
                    }
                };

                let found = client
                    .events(&self.host)
                    .into_iter()
                    .filter(|e| match (e, filter) {
                        (ProxyEvent::Upgraded { implementation }, (true, target)) => {
                            target.map_or(true, |t| t == *implementation)
                        }
                        (ProxyEvent::AdminChanged { new, .. }, (false, target)) => {
                            target.map_or(true, |t| t == *new)
                        }
                        _ => false,
                    })
                    .count();
                ensure!(
                    found == *count,
                    "Expected {} matching {:?} events on '{}', found {}",
                    count,
                    event,
                    proxy,
                    found
                );
                self.log(format!("  ✓ {} {:?} events on '{}'", count, event, proxy));
                Ok(())
            }

            Step::AssertBalance { account, eq } => {
                let address = self.resolve(account)?;
                let actual = self.host.balance(&address);
                ensure!(
                    actual == *eq,
                    "Balance of '{}' is {}, expected {}",
                    account,
                    actual,
                    eq
                );
                self.log(format!("  ✓ '{}' balance is {}", account, eq));
                Ok(())
            }
        }
    }

    /// Compare an outcome with its expectation; no expectation means success
    fn check_outcome(
        &mut self,
        result: Result<Vec<u8>, ProxyError>,
        expect: Option<&Expect>,
    ) -> Result<()> {
        let default = Expect::default();
        let expect = expect.unwrap_or(&default);

        match (&result, expect.expects_failure()) {
            (Ok(data), false) => {
                if let Some(word) = expect.returns_u64 {
                    let expected = Hash::from_u64(word);
                    ensure!(
                        data.as_slice() == expected.as_bytes(),
                        "Returned 0x{}, expected word {}",
                        hex::encode(data),
                        word
                    );
                }
                if let Some(hex) = &expect.returns_hex {
                    let expected = decode_hex(hex)?;
                    ensure!(
                        *data == expected,
                        "Returned 0x{}, expected 0x{}",
                        hex::encode(data),
                        hex::encode(&expected)
                    );
                }
                self.log(format!("  ✓ success ({} bytes)", data.len()));
            }
            (Err(err), true) => {
                if let Some(kind) = expect.error {
                    ensure!(kind.matches(err), "Failed with {}, expected {:?}", err, kind);
                }
                if let Some(hex) = &expect.returns_hex {
                    let expected = decode_hex(hex)?;
                    ensure!(
                        err.encode() == expected,
                        "Failure data 0x{}, expected 0x{}",
                        hex::encode(err.encode()),
                        hex::encode(&expected)
                    );
                }
                self.log(format!("  ✓ failed as expected: {}", err));
            }
            (Ok(_), true) => bail!("Expected failure, but the call succeeded"),
            (Err(err), false) => bail!("Unexpected failure: {}", err),
        }
        Ok(())
    }

    fn resolve(&self, name: &str) -> Result<Address> {
        if name == ZERO_ADDRESS_NAME {
            return Ok(Address::zero());
        }
        self.names
            .get(name)
            .copied()
            .with_context(|| format!("Unknown name: {}", name))
    }

    fn proxy(&self, name: &str) -> Result<ProxyClient> {
        let address = self.resolve(name)?;
        self.proxies
            .iter()
            .find(|proxy| proxy.address() == &address)
            .copied()
            .with_context(|| format!("'{}' is not a proxy", name))
    }

    fn log(&mut self, message: String) {
        debug!("{}", message);
        self.log.push(message);
    }
}
