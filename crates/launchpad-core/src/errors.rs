//! # Error Types
//!
//! Every failure an entry point can surface. Nothing here is retried by
//! the engine; the caller decides whether to resubmit.

use solana_program::pubkey::Pubkey;
use thiserror::Error;

use crate::registry::LaunchId;

/// Errors returned by the launch-and-fee engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LaunchpadError {
    // ========================================================================
    // Validation Errors
    // ========================================================================
    #[error("Total supply must be in 1..={max}, got {supply}")]
    InvalidSupply { supply: u64, max: u64 },

    #[error("Invalid capability mask {0:#06b}")]
    InvalidCapabilities(u64),

    #[error("Invalid token name: {0}")]
    InvalidName(&'static str),

    #[error("Invalid token symbol: {0}")]
    InvalidSymbol(&'static str),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("Unknown {kind}: {value:?}")]
    UnknownName { kind: &'static str, value: String },

    // ========================================================================
    // Payment Errors
    // ========================================================================
    #[error("Insufficient payment: required {required} lamports, paid {paid}")]
    InsufficientPayment { required: u64, paid: u64 },

    #[error("Transfer of {amount} lamports involving {account} failed: {reason}")]
    TransferFailed {
        account: Pubkey,
        amount: u64,
        reason: String,
    },

    #[error("Math overflow")]
    MathOverflow,

    // ========================================================================
    // Account and Authorization Errors
    // ========================================================================
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Launch {0} not found")]
    NotFound(LaunchId),

    #[error("Launch creation and capability changes are paused")]
    ProtocolPaused,

    #[error("An authority transfer is already pending")]
    PendingAuthorityTransferExists,

    #[error("No authority transfer is pending")]
    NoPendingAuthorityTransfer,

    #[error("Signer is not the pending authority")]
    NotPendingAuthority,

    #[error("Authority transfer can be accepted at {accept_at}, now is {now}")]
    AuthorityTransferDelayNotMet { accept_at: i64, now: i64 },
}

/// Result type for engine operations
pub type LaunchpadResult<T> = Result<T, LaunchpadError>;

impl LaunchpadError {
    /// True for failures caused by the caller's input rather than by state
    /// or collaborators. Callers use it to decide whether resubmitting the
    /// same call can ever succeed.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidSupply { .. }
                | Self::InvalidCapabilities(_)
                | Self::InvalidName(_)
                | Self::InvalidSymbol(_)
                | Self::InvalidParameter(_)
                | Self::UnknownName { .. }
                | Self::InsufficientPayment { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = LaunchpadError::InsufficientPayment {
            required: 20_000_000,
            paid: 10_000_000,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient payment: required 20000000 lamports, paid 10000000"
        );
        assert_eq!(
            LaunchpadError::InvalidCapabilities(16).to_string(),
            "Invalid capability mask 0b10000"
        );
        assert_eq!(LaunchpadError::NotFound(LaunchId(7)).to_string(), "Launch 7 not found");
        assert_eq!(
            LaunchpadError::UnknownName {
                kind: "agent kind",
                value: "telepathy".to_string(),
            }
            .to_string(),
            "Unknown agent kind: \"telepathy\""
        );
    }

    #[test]
    fn test_validation_classification() {
        assert!(LaunchpadError::InvalidCapabilities(16).is_validation());
        assert!(LaunchpadError::InvalidSupply { supply: 0, max: 1 }.is_validation());
        assert!(!LaunchpadError::Unauthorized.is_validation());
        assert!(!LaunchpadError::ProtocolPaused.is_validation());
    }
}
