//! # Launch Factory
//!
//! Entry point for every state-changing call. Each call validates its
//! inputs before touching anything, runs collaborator side effects inside a
//! host transaction, and writes engine state only once those side effects
//! have succeeded. A failed call leaves no trace.
//!
//! Entry points take `&mut self`, so a collaborator can never re-enter the
//! factory while a call is in flight.

use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;
use tracing::{info, warn};

use crate::capability::{AgentKind, CapabilitySet};
use crate::config::{ConfigChange, ProtocolConfig};
use crate::errors::{LaunchpadError, LaunchpadResult};
use crate::events::{
    CapabilitiesUpdated, ExcessRefunded, FeeCollected, LaunchCreated, LaunchpadEvent,
    StatusChanged,
};
use crate::fees::{self, FeeLedger, FeeQuote, FeeRecord, FeeTotals, QuoteMode};
use crate::host::{Host, TokenRequest};
use crate::registry::{Launch, LaunchId, LaunchRegistry, LaunchStatus};

/// Arguments of [`LaunchFactory::create_launch`]
///
/// `capabilities` is the raw agent mask as submitted by the caller; it is
/// validated before anything else happens with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLaunch {
    pub name: String,
    pub symbol: String,
    pub total_supply: u64,
    pub capabilities: u64,
}

/// Fee side effects of a call that has not been committed yet
#[derive(Debug, Default)]
struct Settlement {
    record: Option<FeeRecord>,
    refunded: u64,
}

pub struct LaunchFactory<H: Host> {
    config: ProtocolConfig,
    registry: LaunchRegistry,
    ledger: FeeLedger,
    host: H,
    events: Vec<LaunchpadEvent>,
}

impl<H: Host> LaunchFactory<H> {
    pub fn new(config: ProtocolConfig, host: H) -> Self {
        Self {
            config,
            registry: LaunchRegistry::new(),
            ledger: FeeLedger::new(),
            host,
            events: Vec::new(),
        }
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Mint a token, collect the launch fee and record the launch
    pub fn create_launch(
        &mut self,
        creator: Pubkey,
        request: CreateLaunch,
        payment: u64,
    ) -> LaunchpadResult<LaunchId> {
        self.try_create_launch(creator, request, payment)
            .map_err(|err| {
                warn!(%creator, %err, "Launch creation rejected");
                err
            })
    }

    /// Replace the capability set of a launch, charging for kinds that were
    /// never purchased on it
    pub fn update_capabilities(
        &mut self,
        caller: Pubkey,
        id: LaunchId,
        capabilities: u64,
        payment: u64,
    ) -> LaunchpadResult<()> {
        self.try_update_capabilities(caller, id, capabilities, payment)
            .map_err(|err| {
                warn!(%caller, %id, %err, "Capability update rejected");
                err
            })
    }

    /// Move a launch to `status` on behalf of an authorized agent
    pub fn update_status(
        &mut self,
        caller: Pubkey,
        id: LaunchId,
        status: LaunchStatus,
    ) -> LaunchpadResult<()> {
        let now = self.host.unix_timestamp();
        let old = self
            .registry
            .transition(id, &caller, status, self.config.authorized_agents(), now)
            .map_err(|err| {
                warn!(%caller, %id, %err, "Status update rejected");
                err
            })?;

        info!(%id, %old, new = %status, "Launch status changed");
        self.events.push(LaunchpadEvent::StatusChanged(StatusChanged {
            id,
            old,
            new: status,
            actor: caller,
        }));
        Ok(())
    }

    fn try_create_launch(
        &mut self,
        creator: Pubkey,
        request: CreateLaunch,
        payment: u64,
    ) -> LaunchpadResult<LaunchId> {
        if self.config.is_paused() {
            return Err(LaunchpadError::ProtocolPaused);
        }
        let max = self.config.max_supply();
        if request.total_supply == 0 || request.total_supply > max {
            return Err(LaunchpadError::InvalidSupply {
                supply: request.total_supply,
                max,
            });
        }
        let capabilities = CapabilitySet::from_bits(request.capabilities)?;
        let quote = fees::quote(&self.config.fee_schedule(), capabilities, QuoteMode::Initial)?;
        let required = quote.total()?;
        if payment < required {
            return Err(LaunchpadError::InsufficientPayment {
                required,
                paid: payment,
            });
        }

        let id = self.registry.next_id();
        let now = self.host.unix_timestamp();
        let token_request = TokenRequest {
            name: request.name,
            symbol: request.symbol,
            total_supply: request.total_supply,
            owner: creator,
        };

        self.host.begin();
        let (token, settlement) =
            match self.settle_launch(id, creator, &token_request, quote, payment, now) {
                Ok(settled) => settled,
                Err(err) => {
                    self.host.rollback();
                    return Err(err);
                }
            };

        let launch = Launch {
            id,
            token,
            creator,
            name: token_request.name,
            symbol: token_request.symbol,
            total_supply: token_request.total_supply,
            capabilities,
            purchased: capabilities,
            created_at: now,
            updated_at: now,
            platform_fee_paid: quote.platform,
            agent_fee_paid: quote.agent,
            status: LaunchStatus::Created,
        };
        let created = LaunchCreated {
            id,
            token,
            creator,
            name: launch.name.clone(),
            symbol: launch.symbol.clone(),
            total_supply: launch.total_supply,
            capabilities_enabled: !capabilities.is_empty(),
            capabilities,
        };
        if let Err(err) = self.registry.insert(launch) {
            self.abort(&settlement);
            return Err(err);
        }
        self.host.commit();

        info!(
            %id,
            %token,
            %creator,
            symbol = %created.symbol,
            %capabilities,
            fee = required,
            "Launch created"
        );
        self.push_settlement_events(id, creator, &settlement);
        self.events.push(LaunchpadEvent::LaunchCreated(created));
        Ok(id)
    }

    fn try_update_capabilities(
        &mut self,
        caller: Pubkey,
        id: LaunchId,
        capabilities: u64,
        payment: u64,
    ) -> LaunchpadResult<()> {
        if self.config.is_paused() {
            return Err(LaunchpadError::ProtocolPaused);
        }
        let capabilities = CapabilitySet::from_bits(capabilities)?;
        let launch = self.registry.get(id)?;
        if launch.creator != caller {
            return Err(LaunchpadError::Unauthorized);
        }
        let previous = launch.capabilities;
        let added = CapabilitySet::added(launch.purchased, capabilities);
        let removed = CapabilitySet::removed(previous, capabilities);
        let quote = fees::quote(&self.config.fee_schedule(), added, QuoteMode::Incremental)?;
        let required = quote.total()?;
        if payment < required {
            return Err(LaunchpadError::InsufficientPayment {
                required,
                paid: payment,
            });
        }
        let now = self.host.unix_timestamp();

        self.host.begin();
        let settlement = match self.escrow_and_settle(id, caller, quote, payment, now) {
            Ok(settlement) => settlement,
            Err(err) => {
                self.host.rollback();
                return Err(err);
            }
        };
        if let Err(err) =
            self.registry
                .set_capabilities(id, &caller, capabilities, quote.agent, now)
        {
            self.abort(&settlement);
            return Err(err);
        }
        self.host.commit();

        info!(
            %id,
            %previous,
            current = %capabilities,
            %added,
            %removed,
            fee = required,
            "Capabilities updated"
        );
        self.push_settlement_events(id, caller, &settlement);
        self.events
            .push(LaunchpadEvent::CapabilitiesUpdated(CapabilitiesUpdated {
                id,
                previous,
                current: capabilities,
                added,
                removed,
                agent_fee: quote.agent,
            }));
        Ok(())
    }

    fn settle_launch(
        &mut self,
        id: LaunchId,
        creator: Pubkey,
        request: &TokenRequest,
        quote: FeeQuote,
        payment: u64,
        now: i64,
    ) -> LaunchpadResult<(Pubkey, Settlement)> {
        self.host.escrow(&creator, payment)?;
        let token = self.host.create_token(request)?;
        let settlement = self.settle_fee(id, creator, quote, payment, now)?;
        Ok((token, settlement))
    }

    fn escrow_and_settle(
        &mut self,
        id: LaunchId,
        payer: Pubkey,
        quote: FeeQuote,
        payment: u64,
        now: i64,
    ) -> LaunchpadResult<Settlement> {
        self.host.escrow(&payer, payment)?;
        self.settle_fee(id, payer, quote, payment, now)
    }

    /// Collect the quoted fee out of `payment` and refund the rest.
    /// On error the ledger is left as it was.
    fn settle_fee(
        &mut self,
        id: LaunchId,
        payer: Pubkey,
        quote: FeeQuote,
        payment: u64,
        now: i64,
    ) -> LaunchpadResult<Settlement> {
        let required = quote.total()?;
        let excess = payment
            .checked_sub(required)
            .ok_or(LaunchpadError::InsufficientPayment {
                required,
                paid: payment,
            })?;

        let record = if required > 0 {
            let beneficiaries = self.config.beneficiaries();
            Some(self.ledger.collect(
                &mut self.host,
                id,
                payer,
                quote,
                required,
                &beneficiaries,
                now,
            )?)
        } else {
            None
        };

        if let Err(err) = self.ledger.refund_excess(&mut self.host, &payer, excess) {
            if let Some(record) = &record {
                self.ledger.reverse(record);
            }
            return Err(err);
        }

        Ok(Settlement {
            record,
            refunded: excess,
        })
    }

    fn abort(&mut self, settlement: &Settlement) {
        if let Some(record) = &settlement.record {
            self.ledger.reverse(record);
        }
        self.ledger.reverse_refund(settlement.refunded);
        self.host.rollback();
    }

    fn push_settlement_events(&mut self, id: LaunchId, payer: Pubkey, settlement: &Settlement) {
        if let Some(record) = &settlement.record {
            self.events.push(LaunchpadEvent::FeeCollected(FeeCollected {
                id,
                payer,
                platform_fee: record.platform_fee,
                agent_fee: record.agent_fee,
            }));
        }
        if settlement.refunded > 0 {
            self.events.push(LaunchpadEvent::ExcessRefunded(ExcessRefunded {
                id,
                payer,
                amount: settlement.refunded,
            }));
        }
    }

    // ========================================================================
    // Operator configuration
    // ========================================================================

    fn configure<F>(&mut self, change: F) -> LaunchpadResult<()>
    where
        F: FnOnce(&mut ProtocolConfig, i64) -> LaunchpadResult<ConfigChange>,
    {
        let now = self.host.unix_timestamp();
        let change = change(&mut self.config, now)?;
        self.events.push(LaunchpadEvent::ConfigUpdated(change));
        Ok(())
    }

    pub fn set_beneficiaries(
        &mut self,
        caller: Pubkey,
        treasury: Pubkey,
        agent_provider: Pubkey,
    ) -> LaunchpadResult<()> {
        self.configure(|config, now| {
            config.set_beneficiaries(&caller, treasury, agent_provider, now)
        })
    }

    pub fn set_fees(&mut self, caller: Pubkey, platform_fee: u64, agent_fee: u64) -> LaunchpadResult<()> {
        self.configure(|config, now| config.set_fees(&caller, platform_fee, agent_fee, now))
    }

    pub fn set_max_supply(&mut self, caller: Pubkey, max_supply: u64) -> LaunchpadResult<()> {
        self.configure(|config, now| config.set_max_supply(&caller, max_supply, now))
    }

    pub fn add_authorized_agent(&mut self, caller: Pubkey, agent: Pubkey) -> LaunchpadResult<()> {
        self.configure(|config, now| config.add_authorized_agent(&caller, agent, now))
    }

    pub fn remove_authorized_agent(&mut self, caller: Pubkey, agent: Pubkey) -> LaunchpadResult<()> {
        self.configure(|config, now| config.remove_authorized_agent(&caller, agent, now))
    }

    pub fn set_paused(&mut self, caller: Pubkey, paused: bool) -> LaunchpadResult<()> {
        self.configure(|config, now| config.set_paused(&caller, paused, now))
    }

    pub fn initiate_authority_transfer(
        &mut self,
        caller: Pubkey,
        new_authority: Pubkey,
    ) -> LaunchpadResult<()> {
        self.configure(|config, now| config.initiate_authority_transfer(&caller, new_authority, now))
    }

    pub fn cancel_authority_transfer(&mut self, caller: Pubkey) -> LaunchpadResult<()> {
        self.configure(|config, now| config.cancel_authority_transfer(&caller, now))
    }

    pub fn accept_authority_transfer(&mut self, caller: Pubkey) -> LaunchpadResult<()> {
        self.configure(|config, now| config.accept_authority_transfer(&caller, now))
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn get_launch(&self, id: LaunchId) -> LaunchpadResult<&Launch> {
        self.registry.get(id)
    }

    pub fn launches_by_creator(&self, creator: &Pubkey) -> &[LaunchId] {
        self.registry.by_creator(creator)
    }

    pub fn is_capability_enabled(&self, id: LaunchId, kind: AgentKind) -> LaunchpadResult<bool> {
        Ok(self.registry.get(id)?.is_capability_enabled(kind))
    }

    pub fn total_launches(&self) -> u64 {
        self.registry.len()
    }

    /// Most recent fee collection for a launch
    pub fn fee_record(&self, id: LaunchId) -> Option<&FeeRecord> {
        self.ledger.latest(id)
    }

    pub fn fee_history(&self, id: LaunchId) -> &[FeeRecord] {
        self.ledger.history(id)
    }

    pub fn fee_totals(&self) -> FeeTotals {
        self.ledger.totals()
    }

    /// Fee `create_launch` would charge for a raw capability mask
    pub fn quote_launch(&self, capabilities: u64) -> LaunchpadResult<FeeQuote> {
        let capabilities = CapabilitySet::from_bits(capabilities)?;
        fees::quote(&self.config.fee_schedule(), capabilities, QuoteMode::Initial)
    }

    /// Fee `update_capabilities` would charge for moving launch `id` to a
    /// raw capability mask
    pub fn quote_upgrade(&self, id: LaunchId, capabilities: u64) -> LaunchpadResult<FeeQuote> {
        let capabilities = CapabilitySet::from_bits(capabilities)?;
        let launch = self.registry.get(id)?;
        let added = CapabilitySet::added(launch.purchased, capabilities);
        fees::quote(&self.config.fee_schedule(), added, QuoteMode::Incremental)
    }

    pub fn launches(&self, offset: usize, limit: usize) -> Vec<&Launch> {
        self.registry.page(offset, limit)
    }

    pub fn launches_with_capability(&self, kind: AgentKind) -> Vec<&Launch> {
        self.registry.with_capability(kind).collect()
    }

    pub fn launches_with_status(&self, status: LaunchStatus) -> Vec<&Launch> {
        self.registry.with_status(status).collect()
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Events emitted since the last drain
    pub fn events(&self) -> &[LaunchpadEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<LaunchpadEvent> {
        std::mem::take(&mut self.events)
    }
}
