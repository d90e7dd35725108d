//! # Fee Ledger
//!
//! Quotes the fee owed for a capability set, collects exactly that amount,
//! forwards the platform portion to the treasury and the agent portion to
//! the agent-service provider, and keeps cumulative accounting.
//!
//! Collection writes the ledger entry before paying beneficiaries. When a
//! payout fails the entry is taken back out, so recorded totals only ever
//! reflect fees that reached their beneficiaries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;
use tracing::debug;

use crate::capability::CapabilitySet;
use crate::errors::{LaunchpadError, LaunchpadResult};
use crate::host::ValueTransfer;
use crate::pubkey_serde;
use crate::registry::LaunchId;

/// Fee constants in lamports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub platform_fee: u64,
    pub agent_fee: u64,
}

/// Whether the base platform fee is part of a quote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteMode {
    /// Creating a launch: platform fee plus every selected agent
    Initial,
    /// Adding capabilities to an existing launch: new agents only
    Incremental,
}

/// Fee owed, split by beneficiary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuote {
    pub platform: u64,
    pub agent: u64,
}

impl FeeQuote {
    pub fn total(&self) -> LaunchpadResult<u64> {
        self.platform
            .checked_add(self.agent)
            .ok_or(LaunchpadError::MathOverflow)
    }
}

/// Recipients of collected fees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Beneficiaries {
    pub treasury: Pubkey,
    pub agent_provider: Pubkey,
}

/// One accepted fee collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRecord {
    pub launch_id: LaunchId,
    #[serde(with = "pubkey_serde")]
    pub payer: Pubkey,
    pub platform_fee: u64,
    pub agent_fee: u64,
    pub timestamp: i64,
}

/// Cumulative accounting across all launches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeTotals {
    pub platform_collected: u64,
    pub agent_collected: u64,
    pub refunded: u64,
    pub collections: u64,
}

impl FeeTotals {
    pub fn total_collected(&self) -> u64 {
        self.platform_collected.saturating_add(self.agent_collected)
    }
}

/// Compute the fee owed for `capabilities`
pub fn quote(
    schedule: &FeeSchedule,
    capabilities: CapabilitySet,
    mode: QuoteMode,
) -> LaunchpadResult<FeeQuote> {
    let agent = schedule
        .agent_fee
        .checked_mul(capabilities.count() as u64)
        .ok_or(LaunchpadError::MathOverflow)?;
    let platform = match mode {
        QuoteMode::Initial => schedule.platform_fee,
        QuoteMode::Incremental => 0,
    };
    let quote = FeeQuote { platform, agent };
    debug!(%capabilities, ?mode, platform, agent, "Quoted fee");
    Ok(quote)
}

/// Append-only history of fee collections plus running totals
#[derive(Debug, Clone, Default)]
pub struct FeeLedger {
    records: BTreeMap<LaunchId, Vec<FeeRecord>>,
    totals: FeeTotals,
}

impl FeeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect exactly `quote.total()` for `launch_id` and distribute it.
    ///
    /// `paid` must match the quote exactly; callers refund any surplus
    /// separately through [`FeeLedger::refund_excess`].
    #[allow(clippy::too_many_arguments)]
    pub fn collect<T: ValueTransfer + ?Sized>(
        &mut self,
        transfers: &mut T,
        launch_id: LaunchId,
        payer: Pubkey,
        quote: FeeQuote,
        paid: u64,
        beneficiaries: &Beneficiaries,
        timestamp: i64,
    ) -> LaunchpadResult<FeeRecord> {
        let required = quote.total()?;
        if paid != required {
            return Err(LaunchpadError::InsufficientPayment { required, paid });
        }

        let record = FeeRecord {
            launch_id,
            payer,
            platform_fee: quote.platform,
            agent_fee: quote.agent,
            timestamp,
        };
        self.record(&record)?;

        if let Err(err) = Self::distribute(transfers, &quote, beneficiaries) {
            self.reverse(&record);
            return Err(err);
        }

        debug!(
            %launch_id,
            %payer,
            platform_fee = quote.platform,
            agent_fee = quote.agent,
            "Fee collected"
        );
        Ok(record)
    }

    /// Return an overpayment to the payer
    pub fn refund_excess<T: ValueTransfer + ?Sized>(
        &mut self,
        transfers: &mut T,
        payer: &Pubkey,
        excess: u64,
    ) -> LaunchpadResult<()> {
        if excess == 0 {
            return Ok(());
        }
        let refunded = self
            .totals
            .refunded
            .checked_add(excess)
            .ok_or(LaunchpadError::MathOverflow)?;
        transfers.transfer(payer, excess)?;
        self.totals.refunded = refunded;
        debug!(%payer, excess, "Refunded excess payment");
        Ok(())
    }

    /// Undo a collection that succeeded earlier in a call that is now
    /// being aborted. Only the most recent record of a launch can be undone.
    pub fn reverse(&mut self, record: &FeeRecord) {
        let Some(history) = self.records.get_mut(&record.launch_id) else {
            return;
        };
        if history.last() != Some(record) {
            return;
        }
        history.pop();
        if history.is_empty() {
            self.records.remove(&record.launch_id);
        }
        self.totals.platform_collected -= record.platform_fee;
        self.totals.agent_collected -= record.agent_fee;
        self.totals.collections -= 1;
    }

    /// Undo a refund that succeeded earlier in a call that is now being aborted
    pub fn reverse_refund(&mut self, excess: u64) {
        self.totals.refunded = self.totals.refunded.saturating_sub(excess);
    }

    pub fn latest(&self, launch_id: LaunchId) -> Option<&FeeRecord> {
        self.records.get(&launch_id).and_then(|history| history.last())
    }

    pub fn history(&self, launch_id: LaunchId) -> &[FeeRecord] {
        self.records
            .get(&launch_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn totals(&self) -> FeeTotals {
        self.totals
    }

    fn record(&mut self, record: &FeeRecord) -> LaunchpadResult<()> {
        let totals = FeeTotals {
            platform_collected: self
                .totals
                .platform_collected
                .checked_add(record.platform_fee)
                .ok_or(LaunchpadError::MathOverflow)?,
            agent_collected: self
                .totals
                .agent_collected
                .checked_add(record.agent_fee)
                .ok_or(LaunchpadError::MathOverflow)?,
            refunded: self.totals.refunded,
            collections: self.totals.collections + 1,
        };
        self.totals = totals;
        self.records
            .entry(record.launch_id)
            .or_default()
            .push(record.clone());
        Ok(())
    }

    fn distribute<T: ValueTransfer + ?Sized>(
        transfers: &mut T,
        quote: &FeeQuote,
        beneficiaries: &Beneficiaries,
    ) -> LaunchpadResult<()> {
        if quote.platform > 0 {
            transfers.transfer(&beneficiaries.treasury, quote.platform)?;
        }
        if quote.agent > 0 {
            transfers.transfer(&beneficiaries.agent_provider, quote.agent)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::AgentKind;
    use crate::host::TransferError;

    const SCHEDULE: FeeSchedule = FeeSchedule {
        platform_fee: 10_000_000,
        agent_fee: 5_000_000,
    };

    /// Records payouts and fails for one chosen recipient
    #[derive(Default)]
    struct RecordingTransfers {
        paid: Vec<(Pubkey, u64)>,
        reject: Option<Pubkey>,
    }

    impl ValueTransfer for RecordingTransfers {
        fn escrow(&mut self, _from: &Pubkey, _amount: u64) -> Result<(), TransferError> {
            Ok(())
        }

        fn transfer(&mut self, to: &Pubkey, amount: u64) -> Result<(), TransferError> {
            if self.reject == Some(*to) {
                return Err(TransferError {
                    account: *to,
                    amount,
                    reason: "rejected".to_string(),
                });
            }
            self.paid.push((*to, amount));
            Ok(())
        }
    }

    fn beneficiaries() -> Beneficiaries {
        Beneficiaries {
            treasury: Pubkey::new_unique(),
            agent_provider: Pubkey::new_unique(),
        }
    }

    #[test]
    fn test_quote_modes() {
        let set: CapabilitySet = [AgentKind::Marketing, AgentKind::Community]
            .into_iter()
            .collect();

        let initial = quote(&SCHEDULE, set, QuoteMode::Initial).unwrap();
        assert_eq!(initial, FeeQuote { platform: 10_000_000, agent: 10_000_000 });
        assert_eq!(initial.total().unwrap(), 20_000_000);

        let incremental = quote(&SCHEDULE, set, QuoteMode::Incremental).unwrap();
        assert_eq!(incremental, FeeQuote { platform: 0, agent: 10_000_000 });

        let empty = quote(&SCHEDULE, CapabilitySet::EMPTY, QuoteMode::Initial).unwrap();
        assert_eq!(empty, FeeQuote { platform: 10_000_000, agent: 0 });
    }

    #[test]
    fn test_quote_overflow() {
        let schedule = FeeSchedule { platform_fee: u64::MAX, agent_fee: u64::MAX };
        assert_eq!(
            quote(&schedule, CapabilitySet::ALL, QuoteMode::Initial),
            Err(LaunchpadError::MathOverflow)
        );
        let q = quote(&schedule, AgentKind::Analytics.into(), QuoteMode::Initial).unwrap();
        assert_eq!(q.total(), Err(LaunchpadError::MathOverflow));
    }

    #[test]
    fn test_collect_requires_exact_amount() {
        let mut ledger = FeeLedger::new();
        let mut transfers = RecordingTransfers::default();
        let to = beneficiaries();
        let q = FeeQuote { platform: 10, agent: 5 };

        for paid in [0, 14, 16] {
            assert_eq!(
                ledger.collect(&mut transfers, LaunchId(1), Pubkey::new_unique(), q, paid, &to, 0),
                Err(LaunchpadError::InsufficientPayment { required: 15, paid })
            );
        }
        assert!(transfers.paid.is_empty());
        assert_eq!(ledger.totals(), FeeTotals::default());
    }

    #[test]
    fn test_collect_splits_between_beneficiaries() {
        let mut ledger = FeeLedger::new();
        let mut transfers = RecordingTransfers::default();
        let to = beneficiaries();
        let payer = Pubkey::new_unique();
        let q = FeeQuote { platform: 10, agent: 5 };

        let record = ledger
            .collect(&mut transfers, LaunchId(1), payer, q, 15, &to, 77)
            .unwrap();

        assert_eq!(transfers.paid, vec![(to.treasury, 10), (to.agent_provider, 5)]);
        assert_eq!(ledger.latest(LaunchId(1)), Some(&record));
        assert_eq!(record.timestamp, 77);
        assert_eq!(ledger.totals().total_collected(), 15);
        assert_eq!(ledger.totals().collections, 1);
    }

    #[test]
    fn test_zero_portions_are_not_transferred() {
        let mut ledger = FeeLedger::new();
        let mut transfers = RecordingTransfers::default();
        let to = beneficiaries();
        let q = FeeQuote { platform: 0, agent: 5 };

        ledger
            .collect(&mut transfers, LaunchId(1), Pubkey::new_unique(), q, 5, &to, 0)
            .unwrap();
        assert_eq!(transfers.paid, vec![(to.agent_provider, 5)]);
    }

    #[test]
    fn test_failed_payout_leaves_no_record() {
        let mut ledger = FeeLedger::new();
        let to = beneficiaries();
        let mut transfers = RecordingTransfers {
            reject: Some(to.agent_provider),
            ..Default::default()
        };
        let q = FeeQuote { platform: 10, agent: 5 };

        let err = ledger
            .collect(&mut transfers, LaunchId(1), Pubkey::new_unique(), q, 15, &to, 0)
            .unwrap_err();
        assert!(matches!(err, LaunchpadError::TransferFailed { amount: 5, .. }));
        assert_eq!(ledger.latest(LaunchId(1)), None);
        assert_eq!(ledger.totals(), FeeTotals::default());
    }

    #[test]
    fn test_history_is_append_only() {
        let mut ledger = FeeLedger::new();
        let mut transfers = RecordingTransfers::default();
        let to = beneficiaries();
        let payer = Pubkey::new_unique();

        ledger
            .collect(&mut transfers, LaunchId(3), payer, FeeQuote { platform: 10, agent: 5 }, 15, &to, 1)
            .unwrap();
        let second = ledger
            .collect(&mut transfers, LaunchId(3), payer, FeeQuote { platform: 0, agent: 5 }, 5, &to, 2)
            .unwrap();

        assert_eq!(ledger.history(LaunchId(3)).len(), 2);
        assert_eq!(ledger.latest(LaunchId(3)), Some(&second));
        assert!(ledger.history(LaunchId(4)).is_empty());

        ledger.reverse(&second);
        assert_eq!(ledger.history(LaunchId(3)).len(), 1);
        assert_eq!(ledger.totals().agent_collected, 5);
    }

    #[test]
    fn test_refund_excess() {
        let mut ledger = FeeLedger::new();
        let mut transfers = RecordingTransfers::default();
        let payer = Pubkey::new_unique();

        ledger.refund_excess(&mut transfers, &payer, 0).unwrap();
        assert!(transfers.paid.is_empty());

        ledger.refund_excess(&mut transfers, &payer, 42).unwrap();
        assert_eq!(transfers.paid, vec![(payer, 42)]);
        assert_eq!(ledger.totals().refunded, 42);

        transfers.reject = Some(payer);
        assert!(ledger.refund_excess(&mut transfers, &payer, 1).is_err());
        assert_eq!(ledger.totals().refunded, 42);
    }
}
