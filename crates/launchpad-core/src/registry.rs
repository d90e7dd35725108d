//! # Launch Registry
//!
//! Owns every [`Launch`] record, issues launch ids and keeps the
//! per-creator index. Launches are never removed.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;

use crate::capability::{AgentKind, CapabilitySet};
use crate::constants::{FIRST_LAUNCH_ID, MAX_PAGE_SIZE};
use crate::errors::{LaunchpadError, LaunchpadResult};
use crate::pubkey_serde;

/// Identifier of a launch, unique and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LaunchId(pub u64);

impl fmt::Display for LaunchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a launch
///
/// Any status may follow any other. `Created` is only ever the initial one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchStatus {
    #[default]
    Created,
    Active,
    Completed,
    Paused,
}

impl fmt::Display for LaunchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LaunchStatus::Created => "created",
            LaunchStatus::Active => "active",
            LaunchStatus::Completed => "completed",
            LaunchStatus::Paused => "paused",
        };
        f.write_str(name)
    }
}

impl FromStr for LaunchStatus {
    type Err = LaunchpadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created" => Ok(LaunchStatus::Created),
            "active" => Ok(LaunchStatus::Active),
            "completed" => Ok(LaunchStatus::Completed),
            "paused" => Ok(LaunchStatus::Paused),
            _ => Err(LaunchpadError::UnknownName {
                kind: "launch status",
                value: s.trim().to_string(),
            }),
        }
    }
}

/// One token-creation event and its capability, fee and status state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Launch {
    pub id: LaunchId,
    #[serde(with = "pubkey_serde")]
    pub token: Pubkey,
    #[serde(with = "pubkey_serde")]
    pub creator: Pubkey,
    pub name: String,
    pub symbol: String,
    pub total_supply: u64,
    /// Capabilities currently enabled
    pub capabilities: CapabilitySet,
    /// Every capability ever paid for on this launch
    pub purchased: CapabilitySet,
    pub created_at: i64,
    pub updated_at: i64,
    pub platform_fee_paid: u64,
    pub agent_fee_paid: u64,
    pub status: LaunchStatus,
}

impl Launch {
    pub fn total_fee_paid(&self) -> u64 {
        self.platform_fee_paid.saturating_add(self.agent_fee_paid)
    }

    pub fn is_capability_enabled(&self, kind: AgentKind) -> bool {
        self.capabilities.contains(kind)
    }
}

/// Storage for launches plus the per-creator index
#[derive(Debug, Clone)]
pub struct LaunchRegistry {
    next_id: u64,
    launches: BTreeMap<LaunchId, Launch>,
    by_creator: HashMap<Pubkey, Vec<LaunchId>>,
}

impl Default for LaunchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LaunchRegistry {
    pub fn new() -> Self {
        Self {
            next_id: FIRST_LAUNCH_ID,
            launches: BTreeMap::new(),
            by_creator: HashMap::new(),
        }
    }

    /// Id the next inserted launch receives
    pub fn next_id(&self) -> LaunchId {
        LaunchId(self.next_id)
    }

    /// Store a launch under the next id and index it by creator
    pub fn insert(&mut self, launch: Launch) -> LaunchpadResult<LaunchId> {
        let id = self.next_id();
        if launch.id != id {
            return Err(LaunchpadError::InvalidParameter("launch id is not the next id"));
        }
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or(LaunchpadError::MathOverflow)?;
        self.by_creator.entry(launch.creator).or_default().push(id);
        self.launches.insert(id, launch);
        Ok(id)
    }

    pub fn get(&self, id: LaunchId) -> LaunchpadResult<&Launch> {
        self.launches.get(&id).ok_or(LaunchpadError::NotFound(id))
    }

    fn get_mut(&mut self, id: LaunchId) -> LaunchpadResult<&mut Launch> {
        self.launches.get_mut(&id).ok_or(LaunchpadError::NotFound(id))
    }

    /// Change the status of a launch on behalf of an authorized agent.
    /// Returns the previous status.
    pub fn transition(
        &mut self,
        id: LaunchId,
        actor: &Pubkey,
        new_status: LaunchStatus,
        authorized: &BTreeSet<Pubkey>,
        at: i64,
    ) -> LaunchpadResult<LaunchStatus> {
        let launch = self.get_mut(id)?;
        if !authorized.contains(actor) {
            return Err(LaunchpadError::Unauthorized);
        }
        let old = launch.status;
        launch.status = new_status;
        launch.updated_at = at;
        Ok(old)
    }

    /// Replace the enabled capabilities on behalf of the creator and credit
    /// the agent fee paid for newly purchased ones.
    pub fn set_capabilities(
        &mut self,
        id: LaunchId,
        actor: &Pubkey,
        capabilities: CapabilitySet,
        agent_fee: u64,
        at: i64,
    ) -> LaunchpadResult<()> {
        let launch = self.get_mut(id)?;
        if launch.creator != *actor {
            return Err(LaunchpadError::Unauthorized);
        }
        launch.agent_fee_paid = launch
            .agent_fee_paid
            .checked_add(agent_fee)
            .ok_or(LaunchpadError::MathOverflow)?;
        launch.purchased = launch.purchased.union(capabilities);
        launch.capabilities = capabilities;
        launch.updated_at = at;
        Ok(())
    }

    /// Launch ids created by `creator`, oldest first
    pub fn by_creator(&self, creator: &Pubkey) -> &[LaunchId] {
        self.by_creator
            .get(creator)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self) -> u64 {
        self.launches.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.launches.is_empty()
    }

    /// Launches in id order, skipping `offset` and returning at most
    /// `limit` (capped at [`MAX_PAGE_SIZE`])
    pub fn page(&self, offset: usize, limit: usize) -> Vec<&Launch> {
        self.launches
            .values()
            .skip(offset)
            .take(limit.min(MAX_PAGE_SIZE))
            .collect()
    }

    /// Launches an agent service of the given kind currently serves
    pub fn with_capability(&self, kind: AgentKind) -> impl Iterator<Item = &Launch> {
        self.launches
            .values()
            .filter(move |launch| launch.capabilities.contains(kind))
    }

    pub fn with_status(&self, status: LaunchStatus) -> impl Iterator<Item = &Launch> {
        self.launches
            .values()
            .filter(move |launch| launch.status == status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launch(registry: &LaunchRegistry, creator: Pubkey, capabilities: CapabilitySet) -> Launch {
        Launch {
            id: registry.next_id(),
            token: Pubkey::new_unique(),
            creator,
            name: "Test".to_string(),
            symbol: "TEST".to_string(),
            total_supply: 1_000_000,
            capabilities,
            purchased: capabilities,
            created_at: 100,
            updated_at: 100,
            platform_fee_paid: 10,
            agent_fee_paid: 0,
            status: LaunchStatus::Created,
        }
    }

    #[test]
    fn test_status_text_forms() {
        assert_eq!(" Active ".parse::<LaunchStatus>(), Ok(LaunchStatus::Active));
        assert_eq!("paused".parse::<LaunchStatus>(), Ok(LaunchStatus::Paused));
        assert_eq!(
            "archived".parse::<LaunchStatus>(),
            Err(LaunchpadError::UnknownName {
                kind: "launch status",
                value: "archived".to_string(),
            })
        );
    }

    #[test]
    fn test_ids_are_sequential_and_indexed() {
        let mut registry = LaunchRegistry::new();
        let alice = Pubkey::new_unique();
        let bob = Pubkey::new_unique();

        let first = registry.insert(launch(&registry, alice, CapabilitySet::EMPTY)).unwrap();
        let second = registry.insert(launch(&registry, bob, CapabilitySet::EMPTY)).unwrap();
        let third = registry.insert(launch(&registry, alice, CapabilitySet::ALL)).unwrap();

        assert_eq!(first, LaunchId(FIRST_LAUNCH_ID));
        assert_eq!(second, LaunchId(FIRST_LAUNCH_ID + 1));
        assert_eq!(third, LaunchId(FIRST_LAUNCH_ID + 2));
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.by_creator(&alice), &[first, third]);
        assert_eq!(registry.by_creator(&bob), &[second]);
        assert!(registry.by_creator(&Pubkey::new_unique()).is_empty());
    }

    #[test]
    fn test_insert_rejects_out_of_order_id() {
        let mut registry = LaunchRegistry::new();
        let mut record = launch(&registry, Pubkey::new_unique(), CapabilitySet::EMPTY);
        record.id = LaunchId(42);
        assert!(registry.insert(record).is_err());
        assert!(registry.is_empty());
        assert_eq!(registry.next_id(), LaunchId(FIRST_LAUNCH_ID));
    }

    #[test]
    fn test_get_unissued_id() {
        let registry = LaunchRegistry::new();
        assert_eq!(
            registry.get(LaunchId(0)).unwrap_err(),
            LaunchpadError::NotFound(LaunchId(0))
        );
    }

    #[test]
    fn test_transition_requires_authorization() {
        let mut registry = LaunchRegistry::new();
        let agent = Pubkey::new_unique();
        let creator = Pubkey::new_unique();
        let id = registry.insert(launch(&registry, creator, CapabilitySet::EMPTY)).unwrap();
        let authorized: BTreeSet<Pubkey> = [agent].into_iter().collect();

        assert_eq!(
            registry.transition(id, &creator, LaunchStatus::Active, &authorized, 200),
            Err(LaunchpadError::Unauthorized)
        );
        assert_eq!(registry.get(id).unwrap().status, LaunchStatus::Created);

        assert_eq!(
            registry.transition(LaunchId(99), &agent, LaunchStatus::Active, &authorized, 200),
            Err(LaunchpadError::NotFound(LaunchId(99)))
        );
    }

    #[test]
    fn test_status_graph_is_fully_connected() {
        let mut registry = LaunchRegistry::new();
        let agent = Pubkey::new_unique();
        let id = registry
            .insert(launch(&registry, Pubkey::new_unique(), CapabilitySet::EMPTY))
            .unwrap();
        let authorized: BTreeSet<Pubkey> = [agent].into_iter().collect();

        let path = [
            LaunchStatus::Completed,
            LaunchStatus::Active,
            LaunchStatus::Paused,
            LaunchStatus::Completed,
            LaunchStatus::Completed,
            LaunchStatus::Created,
        ];
        let mut previous = LaunchStatus::Created;
        for (step, status) in path.into_iter().enumerate() {
            let old = registry
                .transition(id, &agent, status, &authorized, step as i64)
                .unwrap();
            assert_eq!(old, previous);
            previous = status;
        }
        assert_eq!(registry.get(id).unwrap().status, LaunchStatus::Created);
    }

    #[test]
    fn test_set_capabilities_only_by_creator() {
        let mut registry = LaunchRegistry::new();
        let creator = Pubkey::new_unique();
        let id = registry
            .insert(launch(&registry, creator, AgentKind::Marketing.into()))
            .unwrap();

        assert_eq!(
            registry.set_capabilities(id, &Pubkey::new_unique(), CapabilitySet::ALL, 5, 300),
            Err(LaunchpadError::Unauthorized)
        );

        registry
            .set_capabilities(id, &creator, AgentKind::Analytics.into(), 5, 300)
            .unwrap();
        let stored = registry.get(id).unwrap();
        assert_eq!(stored.capabilities, CapabilitySet::from(AgentKind::Analytics));
        assert!(stored.purchased.contains(AgentKind::Marketing));
        assert!(stored.purchased.contains(AgentKind::Analytics));
        assert_eq!(stored.agent_fee_paid, 5);
        assert_eq!(stored.updated_at, 300);
    }

    #[test]
    fn test_queries() {
        let mut registry = LaunchRegistry::new();
        let creator = Pubkey::new_unique();
        for bits in 0..=CapabilitySet::ALL.bits() {
            let set = CapabilitySet::from_bits(bits as u64).unwrap();
            registry.insert(launch(&registry, creator, set)).unwrap();
        }

        assert_eq!(registry.with_capability(AgentKind::Marketing).count(), 8);
        assert_eq!(registry.with_status(LaunchStatus::Created).count(), 16);
        assert_eq!(registry.with_status(LaunchStatus::Active).count(), 0);

        let page = registry.page(10, 4);
        assert_eq!(
            page.iter().map(|l| l.id.0).collect::<Vec<_>>(),
            vec![11, 12, 13, 14]
        );
        assert_eq!(registry.page(14, 10).len(), 2);
        assert!(registry.page(100, 10).is_empty());
    }
}
