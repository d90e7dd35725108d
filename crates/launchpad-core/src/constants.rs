//! # Protocol Constants
//!
//! Defaults used when a protocol configuration is created without
//! explicit values, plus fixed limits.

use solana_program::native_token::LAMPORTS_PER_SOL;

/// Default base platform fee charged once per launch: 0.01 SOL
pub const DEFAULT_PLATFORM_FEE: u64 = LAMPORTS_PER_SOL / 100;

/// Default fee per enabled agent capability: 0.005 SOL
pub const DEFAULT_AGENT_FEE: u64 = LAMPORTS_PER_SOL / 200;

/// Default supply ceiling: one billion tokens at 9 decimals
pub const DEFAULT_MAX_SUPPLY: u64 = 1_000_000_000 * 1_000_000_000;

/// Id assigned to the first launch. Zero is never a valid launch id.
pub const FIRST_LAUNCH_ID: u64 = 1;

/// Delay before a proposed operator may accept authority: 24 hours
pub const AUTHORITY_TRANSFER_DELAY: i64 = 24 * 60 * 60;

/// Largest page returned by paginated launch queries
pub const MAX_PAGE_SIZE: usize = 100;
