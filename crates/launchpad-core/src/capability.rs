//! # Agent Capabilities
//!
//! A launch enables any subset of a fixed set of agent services. The set is
//! stored as a bitmask, one bit per [`AgentKind`], but only masks within
//! [`CapabilitySet::ALL`] can ever be constructed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{LaunchpadError, LaunchpadResult};

/// An independently chargeable automated service
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum AgentKind {
    Marketing = 1,
    Community = 2,
    Analytics = 4,
    LaunchCoordination = 8,
}

impl AgentKind {
    pub const VARIANTS: [AgentKind; 4] = [
        AgentKind::Marketing,
        AgentKind::Community,
        AgentKind::Analytics,
        AgentKind::LaunchCoordination,
    ];

    pub const fn bit(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            AgentKind::Marketing => "marketing",
            AgentKind::Community => "community",
            AgentKind::Analytics => "analytics",
            AgentKind::LaunchCoordination => "launch_coordination",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AgentKind {
    type Err = LaunchpadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "marketing" => Ok(AgentKind::Marketing),
            "community" => Ok(AgentKind::Community),
            "analytics" => Ok(AgentKind::Analytics),
            "launch" | "launch_coordination" => Ok(AgentKind::LaunchCoordination),
            _ => Err(LaunchpadError::UnknownName {
                kind: "agent kind",
                value: s.trim().to_string(),
            }),
        }
    }
}

/// Set of enabled agent kinds
///
/// Serialized as its raw bits so that wire formats keep the integer mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    pub const EMPTY: CapabilitySet = CapabilitySet(0);

    /// Union of every defined agent kind (`2^k - 1` for `k` kinds)
    pub const ALL: CapabilitySet = CapabilitySet(((1u16 << AgentKind::VARIANTS.len()) - 1) as u8);

    /// Validate a raw mask. Any bit outside [`Self::ALL`] is rejected.
    pub fn from_bits(bits: u64) -> LaunchpadResult<Self> {
        if bits > Self::ALL.0 as u64 {
            return Err(LaunchpadError::InvalidCapabilities(bits));
        }
        Ok(CapabilitySet(bits as u8))
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, kind: AgentKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn insert(&mut self, kind: AgentKind) {
        self.0 |= kind.bit();
    }

    pub const fn union(self, other: CapabilitySet) -> CapabilitySet {
        CapabilitySet(self.0 | other.0)
    }

    /// Kinds present in `new` but not in `old`
    pub const fn added(old: CapabilitySet, new: CapabilitySet) -> CapabilitySet {
        CapabilitySet(new.0 & !old.0)
    }

    /// Kinds present in `old` but not in `new`
    pub const fn removed(old: CapabilitySet, new: CapabilitySet) -> CapabilitySet {
        CapabilitySet(old.0 & !new.0)
    }

    /// Number of enabled kinds, used to multiply the per-agent fee
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    pub fn iter(self) -> impl Iterator<Item = AgentKind> {
        AgentKind::VARIANTS
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }
}

impl From<AgentKind> for CapabilitySet {
    fn from(kind: AgentKind) -> Self {
        CapabilitySet(kind.bit())
    }
}

impl FromIterator<AgentKind> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = AgentKind>>(iter: I) -> Self {
        let mut set = CapabilitySet::EMPTY;
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl TryFrom<u8> for CapabilitySet {
    type Error = LaunchpadError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        CapabilitySet::from_bits(bits as u64)
    }
}

impl From<CapabilitySet> for u8 {
    fn from(set: CapabilitySet) -> Self {
        set.0
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for kind in self.iter() {
            if !first {
                f.write_str("|")?;
            }
            f.write_str(kind.name())?;
            first = false;
        }
        Ok(())
    }
}

/// Parses `none`, a raw integer mask, or kind names separated by `,` or `|`.
impl FromStr for CapabilitySet {
    type Err = LaunchpadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("none") {
            return Ok(CapabilitySet::EMPTY);
        }
        if let Ok(bits) = s.parse::<u64>() {
            return CapabilitySet::from_bits(bits);
        }
        s.split([',', '|'])
            .filter(|part| !part.trim().is_empty())
            .map(AgentKind::from_str)
            .collect()
    }
}
