use std::fs;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use launchpad_core::pubkey_serde;
use launchpad_core::{
    FeeSchedule, ProtocolConfig, ProtocolParams, DEFAULT_AGENT_FEE, DEFAULT_MAX_SUPPLY,
    DEFAULT_PLATFORM_FEE,
};
use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;

/// Initial protocol parameters loaded from a TOML file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LaunchpadConfig {
    /// Operator allowed to change configuration
    #[serde(with = "pubkey_serde")]
    pub authority: Pubkey,

    /// Receives the platform portion of every fee
    #[serde(with = "pubkey_serde")]
    pub treasury: Pubkey,

    /// Receives the agent portion of every fee
    #[serde(with = "pubkey_serde")]
    pub agent_provider: Pubkey,

    /// Largest total supply a launch may request
    #[serde(default = "default_max_supply")]
    pub max_supply: u64,

    /// Identities allowed to change launch status
    #[serde(with = "pubkey_serde::vec", default)]
    pub authorized_agents: Vec<Pubkey>,

    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Fee constants
    #[serde(default)]
    pub fees: FeeConfig,
}

/// Fee constants in lamports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeeConfig {
    /// Charged once per launch
    pub platform_fee_lamports: u64,

    /// Charged per enabled agent capability
    pub agent_fee_lamports: u64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            platform_fee_lamports: DEFAULT_PLATFORM_FEE,
            agent_fee_lamports: DEFAULT_AGENT_FEE,
        }
    }
}

impl FeeConfig {
    pub fn schedule(&self) -> FeeSchedule {
        FeeSchedule {
            platform_fee: self.platform_fee_lamports,
            agent_fee: self.agent_fee_lamports,
        }
    }
}

fn default_max_supply() -> u64 {
    DEFAULT_MAX_SUPPLY
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LaunchpadConfig {
    /// Load configuration from TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: LaunchpadConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        ProtocolConfig::new(self.protocol_params()).context("Invalid protocol parameters")?;
        ensure!(
            self.fees
                .agent_fee_lamports
                .checked_mul(launchpad_core::AgentKind::VARIANTS.len() as u64)
                .and_then(|agents| agents.checked_add(self.fees.platform_fee_lamports))
                .is_some(),
            "fee constants overflow the largest possible quote"
        );
        ensure!(
            matches!(
                self.log_level.as_str(),
                "trace" | "debug" | "info" | "warn" | "error"
            ),
            "log_level must be one of trace, debug, info, warn, error (got {})",
            self.log_level
        );
        Ok(())
    }

    /// Parameters for constructing the engine's protocol configuration
    pub fn protocol_params(&self) -> ProtocolParams {
        ProtocolParams {
            authority: self.authority,
            treasury: self.treasury,
            agent_provider: self.agent_provider,
            platform_fee: self.fees.platform_fee_lamports,
            agent_fee: self.fees.agent_fee_lamports,
            max_supply: self.max_supply,
            authorized_agents: self.authorized_agents.clone(),
        }
    }
}

/// Create example configuration file
pub fn create_example_config(path: impl AsRef<Path>) -> Result<()> {
    let example_config = LaunchpadConfig {
        authority: Pubkey::new_from_array([1; 32]),
        treasury: Pubkey::new_from_array([2; 32]),
        agent_provider: Pubkey::new_from_array([3; 32]),
        max_supply: DEFAULT_MAX_SUPPLY,
        authorized_agents: vec![Pubkey::new_from_array([4; 32])],
        log_level: default_log_level(),
        fees: FeeConfig::default(),
    };

    example_config.save(path)?;
    Ok(())
}
