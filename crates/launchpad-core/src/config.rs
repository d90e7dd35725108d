//! # Protocol Configuration
//!
//! Operator-mutable parameters: fee constants, beneficiaries, the supply
//! ceiling, the set of agents allowed to move launch status, and the pause
//! switch. Every change is immediate, never touches fees already collected,
//! and is appended to an audit log.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;
use tracing::info;

use crate::constants::{
    AUTHORITY_TRANSFER_DELAY, DEFAULT_AGENT_FEE, DEFAULT_MAX_SUPPLY, DEFAULT_PLATFORM_FEE,
};
use crate::errors::{LaunchpadError, LaunchpadResult};
use crate::fees::{Beneficiaries, FeeSchedule};
use crate::pubkey_serde;

/// Initial values for a [`ProtocolConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolParams {
    pub authority: Pubkey,
    pub treasury: Pubkey,
    pub agent_provider: Pubkey,
    pub platform_fee: u64,
    pub agent_fee: u64,
    pub max_supply: u64,
    pub authorized_agents: Vec<Pubkey>,
}

impl ProtocolParams {
    /// Default fees and supply ceiling with the given operator and beneficiaries
    pub fn new(authority: Pubkey, treasury: Pubkey, agent_provider: Pubkey) -> Self {
        Self {
            authority,
            treasury,
            agent_provider,
            platform_fee: DEFAULT_PLATFORM_FEE,
            agent_fee: DEFAULT_AGENT_FEE,
            max_supply: DEFAULT_MAX_SUPPLY,
            authorized_agents: Vec::new(),
        }
    }
}

/// One audited configuration change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigChange {
    BeneficiariesUpdated {
        #[serde(with = "pubkey_serde")]
        treasury: Pubkey,
        #[serde(with = "pubkey_serde")]
        agent_provider: Pubkey,
    },
    FeesUpdated {
        platform_fee: u64,
        agent_fee: u64,
    },
    MaxSupplyUpdated {
        max_supply: u64,
    },
    AgentAuthorized {
        #[serde(with = "pubkey_serde")]
        agent: Pubkey,
    },
    AgentRevoked {
        #[serde(with = "pubkey_serde")]
        agent: Pubkey,
    },
    PausedUpdated {
        paused: bool,
    },
    AuthorityTransferInitiated {
        #[serde(with = "pubkey_serde")]
        new_authority: Pubkey,
        can_be_accepted_at: i64,
    },
    AuthorityTransferCancelled {
        #[serde(with = "pubkey_serde")]
        cancelled_authority: Pubkey,
    },
    AuthorityTransferAccepted {
        #[serde(with = "pubkey_serde")]
        old_authority: Pubkey,
        #[serde(with = "pubkey_serde")]
        new_authority: Pubkey,
    },
}

/// Audit log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigAudit {
    #[serde(with = "pubkey_serde")]
    pub actor: Pubkey,
    pub timestamp: i64,
    pub change: ConfigChange,
}

#[derive(Debug, Clone)]
pub struct ProtocolConfig {
    authority: Pubkey,
    pending_authority: Option<Pubkey>,
    authority_transfer_initiated_at: Option<i64>,
    treasury: Pubkey,
    agent_provider: Pubkey,
    platform_fee: u64,
    agent_fee: u64,
    max_supply: u64,
    paused: bool,
    authorized_agents: BTreeSet<Pubkey>,
    audit_log: Vec<ConfigAudit>,
}

impl ProtocolConfig {
    pub fn new(params: ProtocolParams) -> LaunchpadResult<Self> {
        if params.max_supply == 0 {
            return Err(LaunchpadError::InvalidParameter("max_supply must be positive"));
        }
        require_distinct_beneficiaries(&params.treasury, &params.agent_provider)?;
        Ok(Self {
            authority: params.authority,
            pending_authority: None,
            authority_transfer_initiated_at: None,
            treasury: params.treasury,
            agent_provider: params.agent_provider,
            platform_fee: params.platform_fee,
            agent_fee: params.agent_fee,
            max_supply: params.max_supply,
            paused: false,
            authorized_agents: params.authorized_agents.into_iter().collect(),
            audit_log: Vec::new(),
        })
    }

    pub fn authority(&self) -> Pubkey {
        self.authority
    }

    pub fn pending_authority(&self) -> Option<Pubkey> {
        self.pending_authority
    }

    pub fn fee_schedule(&self) -> FeeSchedule {
        FeeSchedule {
            platform_fee: self.platform_fee,
            agent_fee: self.agent_fee,
        }
    }

    pub fn beneficiaries(&self) -> Beneficiaries {
        Beneficiaries {
            treasury: self.treasury,
            agent_provider: self.agent_provider,
        }
    }

    pub fn max_supply(&self) -> u64 {
        self.max_supply
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn authorized_agents(&self) -> &BTreeSet<Pubkey> {
        &self.authorized_agents
    }

    pub fn is_authorized_agent(&self, agent: &Pubkey) -> bool {
        self.authorized_agents.contains(agent)
    }

    pub fn audit_log(&self) -> &[ConfigAudit] {
        &self.audit_log
    }

    fn require_authority(&self, caller: &Pubkey) -> LaunchpadResult<()> {
        if *caller != self.authority {
            return Err(LaunchpadError::Unauthorized);
        }
        Ok(())
    }

    fn audit(&mut self, actor: Pubkey, timestamp: i64, change: ConfigChange) -> ConfigChange {
        info!(%actor, ?change, "Protocol configuration changed");
        self.audit_log.push(ConfigAudit {
            actor,
            timestamp,
            change: change.clone(),
        });
        change
    }

    pub fn set_beneficiaries(
        &mut self,
        caller: &Pubkey,
        treasury: Pubkey,
        agent_provider: Pubkey,
        now: i64,
    ) -> LaunchpadResult<ConfigChange> {
        self.require_authority(caller)?;
        require_distinct_beneficiaries(&treasury, &agent_provider)?;
        self.treasury = treasury;
        self.agent_provider = agent_provider;
        Ok(self.audit(
            *caller,
            now,
            ConfigChange::BeneficiariesUpdated {
                treasury,
                agent_provider,
            },
        ))
    }

    pub fn set_fees(
        &mut self,
        caller: &Pubkey,
        platform_fee: u64,
        agent_fee: u64,
        now: i64,
    ) -> LaunchpadResult<ConfigChange> {
        self.require_authority(caller)?;
        self.platform_fee = platform_fee;
        self.agent_fee = agent_fee;
        Ok(self.audit(
            *caller,
            now,
            ConfigChange::FeesUpdated {
                platform_fee,
                agent_fee,
            },
        ))
    }

    pub fn set_max_supply(
        &mut self,
        caller: &Pubkey,
        max_supply: u64,
        now: i64,
    ) -> LaunchpadResult<ConfigChange> {
        self.require_authority(caller)?;
        if max_supply == 0 {
            return Err(LaunchpadError::InvalidParameter("max_supply must be positive"));
        }
        self.max_supply = max_supply;
        Ok(self.audit(*caller, now, ConfigChange::MaxSupplyUpdated { max_supply }))
    }

    pub fn add_authorized_agent(
        &mut self,
        caller: &Pubkey,
        agent: Pubkey,
        now: i64,
    ) -> LaunchpadResult<ConfigChange> {
        self.require_authority(caller)?;
        self.authorized_agents.insert(agent);
        Ok(self.audit(*caller, now, ConfigChange::AgentAuthorized { agent }))
    }

    pub fn remove_authorized_agent(
        &mut self,
        caller: &Pubkey,
        agent: Pubkey,
        now: i64,
    ) -> LaunchpadResult<ConfigChange> {
        self.require_authority(caller)?;
        self.authorized_agents.remove(&agent);
        Ok(self.audit(*caller, now, ConfigChange::AgentRevoked { agent }))
    }

    pub fn set_paused(
        &mut self,
        caller: &Pubkey,
        paused: bool,
        now: i64,
    ) -> LaunchpadResult<ConfigChange> {
        self.require_authority(caller)?;
        self.paused = paused;
        Ok(self.audit(*caller, now, ConfigChange::PausedUpdated { paused }))
    }

    pub fn initiate_authority_transfer(
        &mut self,
        caller: &Pubkey,
        new_authority: Pubkey,
        now: i64,
    ) -> LaunchpadResult<ConfigChange> {
        self.require_authority(caller)?;
        if self.pending_authority.is_some() {
            return Err(LaunchpadError::PendingAuthorityTransferExists);
        }
        let can_be_accepted_at = now
            .checked_add(AUTHORITY_TRANSFER_DELAY)
            .ok_or(LaunchpadError::MathOverflow)?;
        self.pending_authority = Some(new_authority);
        self.authority_transfer_initiated_at = Some(now);
        Ok(self.audit(
            *caller,
            now,
            ConfigChange::AuthorityTransferInitiated {
                new_authority,
                can_be_accepted_at,
            },
        ))
    }

    pub fn cancel_authority_transfer(
        &mut self,
        caller: &Pubkey,
        now: i64,
    ) -> LaunchpadResult<ConfigChange> {
        self.require_authority(caller)?;
        let cancelled_authority = self
            .pending_authority
            .ok_or(LaunchpadError::NoPendingAuthorityTransfer)?;
        self.pending_authority = None;
        self.authority_transfer_initiated_at = None;
        Ok(self.audit(
            *caller,
            now,
            ConfigChange::AuthorityTransferCancelled {
                cancelled_authority,
            },
        ))
    }

    /// Complete a handover; only the pending authority can accept, and only
    /// once [`AUTHORITY_TRANSFER_DELAY`] has elapsed.
    pub fn accept_authority_transfer(
        &mut self,
        caller: &Pubkey,
        now: i64,
    ) -> LaunchpadResult<ConfigChange> {
        let pending_authority = self
            .pending_authority
            .ok_or(LaunchpadError::NoPendingAuthorityTransfer)?;
        if pending_authority != *caller {
            return Err(LaunchpadError::NotPendingAuthority);
        }
        let initiated_at = self
            .authority_transfer_initiated_at
            .ok_or(LaunchpadError::NoPendingAuthorityTransfer)?;
        let accept_at = initiated_at.saturating_add(AUTHORITY_TRANSFER_DELAY);
        if now < accept_at {
            return Err(LaunchpadError::AuthorityTransferDelayNotMet { accept_at, now });
        }

        let old_authority = self.authority;
        self.authority = pending_authority;
        self.pending_authority = None;
        self.authority_transfer_initiated_at = None;
        Ok(self.audit(
            *caller,
            now,
            ConfigChange::AuthorityTransferAccepted {
                old_authority,
                new_authority: pending_authority,
            },
        ))
    }
}

fn require_distinct_beneficiaries(
    treasury: &Pubkey,
    agent_provider: &Pubkey,
) -> LaunchpadResult<()> {
    if treasury == agent_provider {
        return Err(LaunchpadError::InvalidParameter(
            "treasury and agent_provider must be distinct accounts",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> (ProtocolConfig, Pubkey) {
        let authority = Pubkey::new_unique();
        let params = ProtocolParams::new(authority, Pubkey::new_unique(), Pubkey::new_unique());
        (ProtocolConfig::new(params).unwrap(), authority)
    }

    #[test]
    fn test_defaults() {
        let (config, authority) = config();
        assert_eq!(config.authority(), authority);
        assert_eq!(config.fee_schedule().platform_fee, DEFAULT_PLATFORM_FEE);
        assert_eq!(config.fee_schedule().agent_fee, DEFAULT_AGENT_FEE);
        assert_eq!(config.max_supply(), DEFAULT_MAX_SUPPLY);
        assert!(!config.is_paused());
        assert!(config.authorized_agents().is_empty());
        assert!(config.audit_log().is_empty());
    }

    #[test]
    fn test_zero_max_supply_rejected() {
        let mut params = ProtocolParams::new(
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        );
        params.max_supply = 0;
        assert!(ProtocolConfig::new(params).is_err());

        let (mut config, authority) = config();
        assert!(config.set_max_supply(&authority, 0, 1).is_err());
        assert_eq!(config.max_supply(), DEFAULT_MAX_SUPPLY);
    }

    #[test]
    fn test_beneficiaries_must_be_distinct() {
        let shared = Pubkey::new_unique();
        let params = ProtocolParams::new(Pubkey::new_unique(), shared, shared);
        assert!(matches!(
            ProtocolConfig::new(params),
            Err(LaunchpadError::InvalidParameter(_))
        ));

        let (mut config, authority) = config();
        let before = config.beneficiaries();
        assert!(matches!(
            config.set_beneficiaries(&authority, shared, shared, 1),
            Err(LaunchpadError::InvalidParameter(_))
        ));
        assert_eq!(config.beneficiaries(), before);
        assert!(config.audit_log().is_empty());
    }

    #[test]
    fn test_operator_only() {
        let (mut config, _) = config();
        let intruder = Pubkey::new_unique();

        assert_eq!(config.set_fees(&intruder, 0, 0, 1), Err(LaunchpadError::Unauthorized));
        assert_eq!(
            config.add_authorized_agent(&intruder, intruder, 1),
            Err(LaunchpadError::Unauthorized)
        );
        assert_eq!(config.set_paused(&intruder, true, 1), Err(LaunchpadError::Unauthorized));
        assert_eq!(
            config.set_beneficiaries(&intruder, intruder, intruder, 1),
            Err(LaunchpadError::Unauthorized)
        );
        assert_eq!(
            config.initiate_authority_transfer(&intruder, intruder, 1),
            Err(LaunchpadError::Unauthorized)
        );
        assert!(config.audit_log().is_empty());
        assert_eq!(config.fee_schedule().platform_fee, DEFAULT_PLATFORM_FEE);
    }

    #[test]
    fn test_changes_are_audited() {
        let (mut config, authority) = config();
        let agent = Pubkey::new_unique();

        config.set_fees(&authority, 1, 2, 10).unwrap();
        config.add_authorized_agent(&authority, agent, 11).unwrap();
        config.remove_authorized_agent(&authority, agent, 12).unwrap();
        config.set_paused(&authority, true, 13).unwrap();

        let log = config.audit_log();
        assert_eq!(log.len(), 4);
        assert_eq!(
            log[0].change,
            ConfigChange::FeesUpdated {
                platform_fee: 1,
                agent_fee: 2
            }
        );
        assert_eq!(log[1].change, ConfigChange::AgentAuthorized { agent });
        assert_eq!(log[2].change, ConfigChange::AgentRevoked { agent });
        assert_eq!(log[3].timestamp, 13);
        assert!(log.iter().all(|entry| entry.actor == authority));
        assert!(!config.is_authorized_agent(&agent));
        assert!(config.is_paused());
    }

    #[test]
    fn test_authority_transfer_flow() {
        let (mut config, authority) = config();
        let successor = Pubkey::new_unique();

        assert_eq!(
            config.accept_authority_transfer(&successor, 0),
            Err(LaunchpadError::NoPendingAuthorityTransfer)
        );

        config
            .initiate_authority_transfer(&authority, successor, 1_000)
            .unwrap();
        assert_eq!(
            config.initiate_authority_transfer(&authority, successor, 1_001),
            Err(LaunchpadError::PendingAuthorityTransferExists)
        );
        assert_eq!(
            config.accept_authority_transfer(&Pubkey::new_unique(), 1_000 + AUTHORITY_TRANSFER_DELAY),
            Err(LaunchpadError::NotPendingAuthority)
        );
        assert_eq!(
            config.accept_authority_transfer(&successor, 1_500),
            Err(LaunchpadError::AuthorityTransferDelayNotMet {
                accept_at: 1_000 + AUTHORITY_TRANSFER_DELAY,
                now: 1_500
            })
        );

        config
            .accept_authority_transfer(&successor, 1_000 + AUTHORITY_TRANSFER_DELAY)
            .unwrap();
        assert_eq!(config.authority(), successor);
        assert_eq!(config.pending_authority(), None);
        assert_eq!(config.set_paused(&authority, true, 0), Err(LaunchpadError::Unauthorized));
        assert!(config.set_paused(&successor, true, 0).is_ok());
    }

    #[test]
    fn test_cancel_authority_transfer() {
        let (mut config, authority) = config();
        let successor = Pubkey::new_unique();

        assert_eq!(
            config.cancel_authority_transfer(&authority, 0),
            Err(LaunchpadError::NoPendingAuthorityTransfer)
        );
        config.initiate_authority_transfer(&authority, successor, 0).unwrap();
        config.cancel_authority_transfer(&authority, 1).unwrap();
        assert_eq!(
            config.accept_authority_transfer(&successor, AUTHORITY_TRANSFER_DELAY),
            Err(LaunchpadError::NoPendingAuthorityTransfer)
        );
        assert_eq!(config.authority(), authority);
    }
}
