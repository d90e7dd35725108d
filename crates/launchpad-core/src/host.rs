//! # Host Collaborators
//!
//! The engine runs inside an execution environment that mints tokens,
//! moves value and tells time. These traits are the seams to that
//! environment. A [`Host`] also brackets each entry point in a transaction
//! so that a failed call leaves no collaborator side effects behind.

use solana_program::pubkey::Pubkey;
use thiserror::Error;

use crate::errors::LaunchpadError;

/// Parameters handed to the token minter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub name: String,
    pub symbol: String,
    pub total_supply: u64,
    pub owner: Pubkey,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MintError {
    #[error("invalid name: {0}")]
    InvalidName(&'static str),
    #[error("invalid symbol: {0}")]
    InvalidSymbol(&'static str),
}

impl From<MintError> for LaunchpadError {
    fn from(err: MintError) -> Self {
        match err {
            MintError::InvalidName(reason) => LaunchpadError::InvalidName(reason),
            MintError::InvalidSymbol(reason) => LaunchpadError::InvalidSymbol(reason),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("transfer of {amount} lamports involving {account} failed: {reason}")]
pub struct TransferError {
    pub account: Pubkey,
    pub amount: u64,
    pub reason: String,
}

impl From<TransferError> for LaunchpadError {
    fn from(err: TransferError) -> Self {
        LaunchpadError::TransferFailed {
            account: err.account,
            amount: err.amount,
            reason: err.reason,
        }
    }
}

/// Creates the fungible token backing a launch
pub trait TokenMinter {
    /// Mint `total_supply` to `owner` and return the token handle
    fn create_token(&mut self, request: &TokenRequest) -> Result<Pubkey, MintError>;
}

/// Moves lamports in and out of program custody
pub trait ValueTransfer {
    /// Take the payment attached to a call from `from` into custody
    fn escrow(&mut self, from: &Pubkey, amount: u64) -> Result<(), TransferError>;

    /// Pay `amount` out of custody to `to`
    fn transfer(&mut self, to: &Pubkey, amount: u64) -> Result<(), TransferError>;
}

pub trait Clock {
    fn unix_timestamp(&self) -> i64;
}

/// Wall clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_timestamp(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// The execution environment of the engine
///
/// Calls between `begin` and `commit` either all take effect or, after
/// `rollback`, none of them do.
pub trait Host: TokenMinter + ValueTransfer + Clock {
    fn begin(&mut self);
    fn commit(&mut self);
    fn rollback(&mut self);
}
