//! # Simulated Host
//!
//! Deterministic in-memory execution environment: lamport balances, a
//! program custody account, minted tokens and a settable clock. Used by
//! the test suites and by the CLI's scenario runner. Transfers to accounts
//! marked as rejecting fail, which lets callers exercise rollback paths.

use std::collections::{BTreeSet, HashMap};

use solana_program::pubkey::Pubkey;
use tracing::trace;

use crate::host::{Clock, Host, MintError, TokenMinter, TokenRequest, TransferError, ValueTransfer};
use crate::token_validate::validate_token;

/// A token minted through the simulated host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintedToken {
    pub mint: Pubkey,
    pub name: String,
    pub symbol: String,
    pub total_supply: u64,
    pub owner: Pubkey,
}

#[derive(Debug, Clone, Default)]
struct Ledger {
    balances: HashMap<Pubkey, u64>,
    custody: u64,
    tokens: Vec<MintedToken>,
}

#[derive(Debug, Clone)]
pub struct SimulatedHost {
    state: Ledger,
    checkpoint: Option<Ledger>,
    rejecting: BTreeSet<Pubkey>,
    now: i64,
}

impl SimulatedHost {
    pub fn new(now: i64) -> Self {
        Self {
            state: Ledger::default(),
            checkpoint: None,
            rejecting: BTreeSet::new(),
            now,
        }
    }

    /// Credit `lamports` to `account` outside of any call
    pub fn airdrop(&mut self, account: &Pubkey, lamports: u64) -> Result<(), TransferError> {
        credit(&mut self.state.balances, account, lamports)
    }

    pub fn balance(&self, account: &Pubkey) -> u64 {
        self.state.balances.get(account).copied().unwrap_or_default()
    }

    /// Lamports currently held by the program
    pub fn custody(&self) -> u64 {
        self.state.custody
    }

    pub fn tokens(&self) -> &[MintedToken] {
        &self.state.tokens
    }

    pub fn token(&self, mint: &Pubkey) -> Option<&MintedToken> {
        self.state.tokens.iter().find(|token| token.mint == *mint)
    }

    /// Make every transfer to `account` fail
    pub fn reject_transfers_to(&mut self, account: Pubkey) {
        self.rejecting.insert(account);
    }

    pub fn accept_transfers_to(&mut self, account: &Pubkey) {
        self.rejecting.remove(account);
    }

    pub fn set_time(&mut self, now: i64) {
        self.now = now;
    }

    pub fn advance(&mut self, seconds: i64) {
        self.now = self.now.saturating_add(seconds);
    }
}

impl TokenMinter for SimulatedHost {
    fn create_token(&mut self, request: &TokenRequest) -> Result<Pubkey, MintError> {
        validate_token(&request.name, &request.symbol)?;
        let mint = Pubkey::new_unique();
        self.state.tokens.push(MintedToken {
            mint,
            name: request.name.clone(),
            symbol: request.symbol.clone(),
            total_supply: request.total_supply,
            owner: request.owner,
        });
        trace!(%mint, symbol = %request.symbol, "Minted token");
        Ok(mint)
    }
}

impl ValueTransfer for SimulatedHost {
    fn escrow(&mut self, from: &Pubkey, amount: u64) -> Result<(), TransferError> {
        let balance = self.state.balances.entry(*from).or_default();
        if *balance < amount {
            return Err(TransferError {
                account: *from,
                amount,
                reason: format!("insufficient lamports: balance {}", balance),
            });
        }
        let custody = self
            .state
            .custody
            .checked_add(amount)
            .ok_or_else(|| TransferError {
                account: *from,
                amount,
                reason: "custody would overflow".to_string(),
            })?;
        *balance -= amount;
        self.state.custody = custody;
        Ok(())
    }

    fn transfer(&mut self, to: &Pubkey, amount: u64) -> Result<(), TransferError> {
        if self.rejecting.contains(to) {
            return Err(TransferError {
                account: *to,
                amount,
                reason: "recipient rejected transfer".to_string(),
            });
        }
        if self.state.custody < amount {
            return Err(TransferError {
                account: *to,
                amount,
                reason: format!("custody holds only {} lamports", self.state.custody),
            });
        }
        credit(&mut self.state.balances, to, amount)?;
        self.state.custody -= amount;
        Ok(())
    }
}

fn credit(
    balances: &mut HashMap<Pubkey, u64>,
    account: &Pubkey,
    amount: u64,
) -> Result<(), TransferError> {
    let balance = balances.entry(*account).or_default();
    let updated = balance.checked_add(amount).ok_or_else(|| TransferError {
        account: *account,
        amount,
        reason: format!("balance {} would overflow", balance),
    })?;
    *balance = updated;
    Ok(())
}

impl Clock for SimulatedHost {
    fn unix_timestamp(&self) -> i64 {
        self.now
    }
}

impl Host for SimulatedHost {
    fn begin(&mut self) {
        self.checkpoint = Some(self.state.clone());
    }

    fn commit(&mut self) {
        self.checkpoint = None;
    }

    fn rollback(&mut self) {
        if let Some(state) = self.checkpoint.take() {
            self.state = state;
        }
    }
}
