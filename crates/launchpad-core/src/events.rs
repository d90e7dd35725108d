use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;

use crate::capability::CapabilitySet;
use crate::config::ConfigChange;
use crate::pubkey_serde;
use crate::registry::{LaunchId, LaunchStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchCreated {
    pub id: LaunchId,
    #[serde(with = "pubkey_serde")]
    pub token: Pubkey,
    #[serde(with = "pubkey_serde")]
    pub creator: Pubkey,
    pub name: String,
    pub symbol: String,
    pub total_supply: u64,
    pub capabilities_enabled: bool,
    pub capabilities: CapabilitySet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub id: LaunchId,
    pub old: LaunchStatus,
    pub new: LaunchStatus,
    #[serde(with = "pubkey_serde")]
    pub actor: Pubkey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitiesUpdated {
    pub id: LaunchId,
    pub previous: CapabilitySet,
    pub current: CapabilitySet,
    /// Newly purchased capabilities, the only ones charged for
    pub added: CapabilitySet,
    pub removed: CapabilitySet,
    pub agent_fee: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeCollected {
    pub id: LaunchId,
    #[serde(with = "pubkey_serde")]
    pub payer: Pubkey,
    pub platform_fee: u64,
    pub agent_fee: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcessRefunded {
    pub id: LaunchId,
    #[serde(with = "pubkey_serde")]
    pub payer: Pubkey,
    pub amount: u64,
}

/// Everything the engine emits, in commit order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LaunchpadEvent {
    LaunchCreated(LaunchCreated),
    StatusChanged(StatusChanged),
    CapabilitiesUpdated(CapabilitiesUpdated),
    FeeCollected(FeeCollected),
    ExcessRefunded(ExcessRefunded),
    ConfigUpdated(ConfigChange),
}
