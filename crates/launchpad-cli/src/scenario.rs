//! Scripted calls against a simulated host
//!
//! A scenario is a TOML file with an optional `start_time` and a list of
//! `[[step]]` tables, each tagged with an `op`. Actors are named either by
//! base58 pubkey, by one of the configured roles (`authority`, `treasury`,
//! `agent_provider`), or by any short alias, which is turned into a stable
//! derived address.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use launchpad_core::sim::SimulatedHost;
use launchpad_core::{
    CapabilitySet, CreateLaunch, LaunchFactory, LaunchId, LaunchStatus, LaunchpadError,
    LaunchpadEvent, LaunchpadResult, ProtocolConfig,
};
use serde::Deserialize;
use solana_program::pubkey::Pubkey;
use solana_program::system_program;
use tracing::{debug, info, warn};

/// Capability mask as written in a script: raw bits or kind names
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum MaskSpec {
    Bits(u64),
    Names(String),
}

impl Default for MaskSpec {
    fn default() -> Self {
        MaskSpec::Bits(0)
    }
}

impl MaskSpec {
    /// Raw bits handed to the engine. Numeric masks are passed through
    /// unchecked so out-of-range values reach the engine's validation.
    pub fn bits(&self) -> Result<u64> {
        match self {
            MaskSpec::Bits(bits) => Ok(*bits),
            MaskSpec::Names(names) => {
                let set = CapabilitySet::from_str(names)
                    .with_context(|| format!("Invalid capability list {:?}", names))?;
                Ok(set.bits() as u64)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Fund {
        account: String,
        lamports: u64,
    },
    CreateLaunch {
        creator: String,
        name: String,
        symbol: String,
        total_supply: u64,
        #[serde(default)]
        capabilities: MaskSpec,
        payment: u64,
    },
    UpdateCapabilities {
        caller: String,
        launch: u64,
        capabilities: MaskSpec,
        #[serde(default)]
        payment: u64,
    },
    UpdateStatus {
        caller: String,
        launch: u64,
        status: LaunchStatus,
    },
    AdvanceTime {
        seconds: i64,
    },
    RejectTransfers {
        account: String,
    },
    AcceptTransfers {
        account: String,
    },
    SetPaused {
        caller: String,
        paused: bool,
    },
    SetFees {
        caller: String,
        platform_fee: u64,
        agent_fee: u64,
    },
    SetMaxSupply {
        caller: String,
        max_supply: u64,
    },
    SetBeneficiaries {
        caller: String,
        treasury: String,
        agent_provider: String,
    },
    AuthorizeAgent {
        caller: String,
        agent: String,
    },
    RevokeAgent {
        caller: String,
        agent: String,
    },
    InitiateAuthorityTransfer {
        caller: String,
        new_authority: String,
    },
    CancelAuthorityTransfer {
        caller: String,
    },
    AcceptAuthorityTransfer {
        caller: String,
    },
}

impl Step {
    pub fn op(&self) -> &'static str {
        match self {
            Step::Fund { .. } => "fund",
            Step::CreateLaunch { .. } => "create_launch",
            Step::UpdateCapabilities { .. } => "update_capabilities",
            Step::UpdateStatus { .. } => "update_status",
            Step::AdvanceTime { .. } => "advance_time",
            Step::RejectTransfers { .. } => "reject_transfers",
            Step::AcceptTransfers { .. } => "accept_transfers",
            Step::SetPaused { .. } => "set_paused",
            Step::SetFees { .. } => "set_fees",
            Step::SetMaxSupply { .. } => "set_max_supply",
            Step::SetBeneficiaries { .. } => "set_beneficiaries",
            Step::AuthorizeAgent { .. } => "authorize_agent",
            Step::RevokeAgent { .. } => "revoke_agent",
            Step::InitiateAuthorityTransfer { .. } => "initiate_authority_transfer",
            Step::CancelAuthorityTransfer { .. } => "cancel_authority_transfer",
            Step::AcceptAuthorityTransfer { .. } => "accept_authority_transfer",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Scenario {
    /// Unix time the simulated clock starts at
    pub start_time: Option<i64>,

    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse scenario {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// What one step produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: usize,
    pub op: &'static str,
    pub outcome: Result<Vec<LaunchpadEvent>, LaunchpadError>,
}

impl StepReport {
    /// One JSON document per emitted event, or a single `call_failed`
    /// document when the engine rejected the call
    pub fn json_lines(&self) -> Result<Vec<String>> {
        match &self.outcome {
            Ok(events) => events
                .iter()
                .map(|event| serde_json::to_string(event).map_err(Into::into))
                .collect(),
            Err(err) => {
                let line = serde_json::json!({
                    "event": "call_failed",
                    "step": self.step,
                    "op": self.op,
                    "error": err.to_string(),
                });
                Ok(vec![line.to_string()])
            }
        }
    }
}

/// A factory on a simulated host plus the actor aliases seen so far
pub struct Simulation {
    factory: LaunchFactory<SimulatedHost>,
    seed_base: Pubkey,
    aliases: BTreeMap<String, Pubkey>,
}

impl Simulation {
    pub fn new(config: ProtocolConfig, start_time: i64) -> Self {
        let seed_base = config.authority();
        Self {
            factory: LaunchFactory::new(config, SimulatedHost::new(start_time)),
            seed_base,
            aliases: BTreeMap::new(),
        }
    }

    pub fn factory(&self) -> &LaunchFactory<SimulatedHost> {
        &self.factory
    }

    /// Resolve an actor name to its pubkey
    pub fn resolve(&mut self, name: &str) -> Result<Pubkey> {
        let config = self.factory.config();
        match name {
            "authority" => return Ok(config.authority()),
            "treasury" => return Ok(config.beneficiaries().treasury),
            "agent_provider" => return Ok(config.beneficiaries().agent_provider),
            _ => {}
        }
        if let Ok(pubkey) = Pubkey::from_str(name) {
            return Ok(pubkey);
        }
        if let Some(pubkey) = self.aliases.get(name) {
            return Ok(*pubkey);
        }

        let pubkey = Pubkey::create_with_seed(&self.seed_base, name, &system_program::ID)
            .with_context(|| format!("Invalid actor alias {:?}", name))?;
        debug!(alias = name, %pubkey, "Derived actor address");
        self.aliases.insert(name.to_string(), pubkey);
        Ok(pubkey)
    }

    pub fn aliases(&self) -> &BTreeMap<String, Pubkey> {
        &self.aliases
    }

    /// Run every step in order. Engine rejections are reported and the run
    /// continues; malformed steps abort it.
    pub fn run(&mut self, scenario: &Scenario) -> Result<Vec<StepReport>> {
        let mut reports = Vec::with_capacity(scenario.steps.len());
        for (index, step) in scenario.steps.iter().enumerate() {
            let step_number = index + 1;
            let result = self
                .apply(step)
                .with_context(|| format!("Step {} ({}) is malformed", step_number, step.op()))?;

            let outcome = match result {
                Ok(()) => Ok(self.factory.drain_events()),
                Err(err) => {
                    warn!(
                        step = step_number,
                        op = step.op(),
                        validation = err.is_validation(),
                        %err,
                        "Step rejected"
                    );
                    Err(err)
                }
            };
            reports.push(StepReport {
                step: step_number,
                op: step.op(),
                outcome,
            });
        }

        let totals = self.factory.fee_totals();
        info!(
            steps = reports.len(),
            launches = self.factory.total_launches(),
            collected = totals.total_collected(),
            refunded = totals.refunded,
            "Scenario finished"
        );
        Ok(reports)
    }

    fn apply(&mut self, step: &Step) -> Result<LaunchpadResult<()>> {
        let result = match step {
            Step::Fund { account, lamports } => {
                let account = self.resolve(account)?;
                self.factory
                    .host_mut()
                    .airdrop(&account, *lamports)
                    .map_err(LaunchpadError::from)
            }
            Step::CreateLaunch {
                creator,
                name,
                symbol,
                total_supply,
                capabilities,
                payment,
            } => {
                let creator = self.resolve(creator)?;
                let request = CreateLaunch {
                    name: name.clone(),
                    symbol: symbol.clone(),
                    total_supply: *total_supply,
                    capabilities: capabilities.bits()?,
                };
                self.factory
                    .create_launch(creator, request, *payment)
                    .map(|_| ())
            }
            Step::UpdateCapabilities {
                caller,
                launch,
                capabilities,
                payment,
            } => {
                let caller = self.resolve(caller)?;
                self.factory.update_capabilities(
                    caller,
                    LaunchId(*launch),
                    capabilities.bits()?,
                    *payment,
                )
            }
            Step::UpdateStatus {
                caller,
                launch,
                status,
            } => {
                let caller = self.resolve(caller)?;
                self.factory.update_status(caller, LaunchId(*launch), *status)
            }
            Step::AdvanceTime { seconds } => {
                self.factory.host_mut().advance(*seconds);
                Ok(())
            }
            Step::RejectTransfers { account } => {
                let account = self.resolve(account)?;
                self.factory.host_mut().reject_transfers_to(account);
                Ok(())
            }
            Step::AcceptTransfers { account } => {
                let account = self.resolve(account)?;
                self.factory.host_mut().accept_transfers_to(&account);
                Ok(())
            }
            Step::SetPaused { caller, paused } => {
                let caller = self.resolve(caller)?;
                self.factory.set_paused(caller, *paused)
            }
            Step::SetFees {
                caller,
                platform_fee,
                agent_fee,
            } => {
                let caller = self.resolve(caller)?;
                self.factory.set_fees(caller, *platform_fee, *agent_fee)
            }
            Step::SetMaxSupply { caller, max_supply } => {
                let caller = self.resolve(caller)?;
                self.factory.set_max_supply(caller, *max_supply)
            }
            Step::SetBeneficiaries {
                caller,
                treasury,
                agent_provider,
            } => {
                let caller = self.resolve(caller)?;
                let treasury = self.resolve(treasury)?;
                let agent_provider = self.resolve(agent_provider)?;
                self.factory
                    .set_beneficiaries(caller, treasury, agent_provider)
            }
            Step::AuthorizeAgent { caller, agent } => {
                let caller = self.resolve(caller)?;
                let agent = self.resolve(agent)?;
                self.factory.add_authorized_agent(caller, agent)
            }
            Step::RevokeAgent { caller, agent } => {
                let caller = self.resolve(caller)?;
                let agent = self.resolve(agent)?;
                self.factory.remove_authorized_agent(caller, agent)
            }
            Step::InitiateAuthorityTransfer {
                caller,
                new_authority,
            } => {
                let caller = self.resolve(caller)?;
                let new_authority = self.resolve(new_authority)?;
                self.factory.initiate_authority_transfer(caller, new_authority)
            }
            Step::CancelAuthorityTransfer { caller } => {
                let caller = self.resolve(caller)?;
                self.factory.cancel_authority_transfer(caller)
            }
            Step::AcceptAuthorityTransfer { caller } => {
                let caller = self.resolve(caller)?;
                self.factory.accept_authority_transfer(caller)
            }
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use launchpad_core::ProtocolParams;

    const SCRIPT: &str = r#"
start_time = 1700000000

[[step]]
op = "fund"
account = "alice"
lamports = 1000000000

[[step]]
op = "create_launch"
creator = "alice"
name = "Test"
symbol = "TEST"
total_supply = 1000000
capabilities = "marketing,community"
payment = 25000000

[[step]]
op = "create_launch"
creator = "alice"
name = "Bad"
symbol = "BAD"
total_supply = 1000000
capabilities = 16
payment = 25000000

[[step]]
op = "update_status"
caller = "mallory"
launch = 1
status = "active"

[[step]]
op = "advance_time"
seconds = 60
"#;

    fn simulation() -> Simulation {
        let params = ProtocolParams::new(
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        );
        Simulation::new(ProtocolConfig::new(params).unwrap(), 0)
    }

    #[test]
    fn test_parse_scenario() {
        let scenario = Scenario::parse(SCRIPT).unwrap();
        assert_eq!(scenario.start_time, Some(1_700_000_000));
        assert_eq!(scenario.steps.len(), 5);
        assert_eq!(
            scenario.steps[1],
            Step::CreateLaunch {
                creator: "alice".to_string(),
                name: "Test".to_string(),
                symbol: "TEST".to_string(),
                total_supply: 1_000_000,
                capabilities: MaskSpec::Names("marketing,community".to_string()),
                payment: 25_000_000,
            }
        );
        assert!(matches!(
            scenario.steps[2],
            Step::CreateLaunch { capabilities: MaskSpec::Bits(16), .. }
        ));
        assert!(matches!(
            scenario.steps[3],
            Step::UpdateStatus { status: LaunchStatus::Active, .. }
        ));
    }

    #[test]
    fn test_unknown_op_is_rejected() {
        assert!(Scenario::parse("[[step]]\nop = \"explode\"\n").is_err());
    }

    #[test]
    fn test_mask_spec() {
        assert_eq!(MaskSpec::Bits(16).bits().unwrap(), 16);
        assert_eq!(MaskSpec::Names("analytics|marketing".into()).bits().unwrap(), 0b0101);
        assert_eq!(MaskSpec::Names("none".into()).bits().unwrap(), 0);
        assert!(MaskSpec::Names("telepathy".into()).bits().is_err());
    }

    #[test]
    fn test_aliases_are_stable() {
        let mut sim = simulation();
        let alice = sim.resolve("alice").unwrap();
        assert_eq!(sim.resolve("alice").unwrap(), alice);
        assert_ne!(sim.resolve("bob").unwrap(), alice);
        assert_eq!(
            sim.resolve("treasury").unwrap(),
            sim.factory().config().beneficiaries().treasury
        );

        let explicit = Pubkey::new_unique();
        assert_eq!(sim.resolve(&explicit.to_string()).unwrap(), explicit);
        assert!(sim.resolve(&"x".repeat(40)).is_err());
        assert_eq!(sim.aliases().len(), 2);
    }

    #[test]
    fn test_run_reports_events_and_rejections() {
        let scenario = Scenario::parse(SCRIPT).unwrap();
        let mut sim = simulation();

        let reports = sim.run(&scenario).unwrap();
        assert_eq!(reports.len(), 5);

        let created = reports[1].outcome.as_ref().unwrap();
        assert_eq!(created.len(), 3);
        assert!(matches!(created[1], LaunchpadEvent::ExcessRefunded(_)));
        assert!(matches!(created[2], LaunchpadEvent::LaunchCreated(_)));

        assert_eq!(
            reports[2].outcome,
            Err(LaunchpadError::InvalidCapabilities(16))
        );
        assert_eq!(reports[3].outcome, Err(LaunchpadError::Unauthorized));
        assert_eq!(sim.factory().total_launches(), 1);

        let alice = sim.resolve("alice").unwrap();
        assert_eq!(sim.factory().host().balance(&alice), 1_000_000_000 - 20_000_000);
    }

    #[test]
    fn test_json_lines() {
        let scenario = Scenario::parse(SCRIPT).unwrap();
        let reports = simulation().run(&scenario).unwrap();

        let lines = reports[1].json_lines().unwrap();
        assert_eq!(lines.len(), 3);
        let created: serde_json::Value = serde_json::from_str(&lines[2]).unwrap();
        assert_eq!(created["event"], "launch_created");
        assert_eq!(created["symbol"], "TEST");

        let failed: serde_json::Value =
            serde_json::from_str(&reports[2].json_lines().unwrap()[0]).unwrap();
        assert_eq!(failed["event"], "call_failed");
        assert_eq!(failed["step"], 3);
        assert_eq!(failed["op"], "create_launch");
    }

    #[test]
    fn test_malformed_alias_aborts_run() {
        let scenario = Scenario::parse(&format!(
            "[[step]]\nop = \"fund\"\naccount = \"{}\"\nlamports = 1\n",
            "y".repeat(40)
        ))
        .unwrap();
        assert!(simulation().run(&scenario).is_err());
    }
}
