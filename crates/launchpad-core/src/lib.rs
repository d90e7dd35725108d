//! # Launchpad Core - Launch Registry and Fee Engine
//!
//! Lets a creator mint a token in one call while paying a platform fee plus
//! a per-agent fee for optional automated services (marketing, community,
//! analytics, launch coordination). It provides:
//!
//! - Capability sets and fee quoting
//! - A fee ledger that splits collections between treasury and agent provider
//! - The launch registry with per-creator indexing and status lifecycle
//! - Operator configuration with an audit trail
//! - The [`LaunchFactory`] orchestrating all of the above over a [`Host`]
//!
//! ## Hosts
//!
//! Token minting, lamport movement and time come from a [`Host`]. The
//! [`sim::SimulatedHost`] is a deterministic in-memory implementation used
//! by tests and the operator CLI.

pub mod capability;
pub mod config;
pub mod constants;
pub mod errors;
pub mod events;
pub mod factory;
pub mod fees;
pub mod host;
pub mod pubkey_serde;
pub mod registry;
pub mod sim;
pub mod token_validate;

// Re-export commonly used items
pub use capability::{AgentKind, CapabilitySet};
pub use config::{ConfigAudit, ConfigChange, ProtocolConfig, ProtocolParams};
pub use constants::*;
pub use errors::{LaunchpadError, LaunchpadResult};
pub use events::LaunchpadEvent;
pub use factory::{CreateLaunch, LaunchFactory};
pub use fees::{FeeQuote, FeeRecord, FeeSchedule, FeeTotals, QuoteMode};
pub use host::{Clock, Host, SystemClock, TokenMinter, ValueTransfer};
pub use registry::{Launch, LaunchId, LaunchStatus};
