//! Token name and symbol validation applied by the token minter
//!
//! Symbols must be short, uppercase and alphanumeric, and may not shadow
//! major existing assets.

use crate::host::MintError;

pub const MAX_NAME_LENGTH: usize = 32;
pub const MAX_SYMBOL_LENGTH: usize = 12;

/// Symbols that cannot be used for new launches
pub const RESTRICTED_SYMBOLS: &[&str] = &[
    // Major blockchain tokens
    "SOL", "WSOL", "MSOL", "STSOL", "JSOL", "BSOL", "ETH", "WETH", "BTC", "WBTC",
    // Major stablecoins
    "USDC", "USDT", "USDS", "DAI", "FRAX", "LUSD", "BUSD",
    // Common reserved words
    "BITCOIN", "ETHEREUM", "SOLANA", "DOLLAR", "EURO",
];

/// Case-insensitive check against [`RESTRICTED_SYMBOLS`]
pub fn is_symbol_restricted(symbol: &str) -> bool {
    let symbol_upper = symbol.to_uppercase();
    RESTRICTED_SYMBOLS.contains(&symbol_upper.as_str())
}

pub fn validate_symbol(symbol: &str) -> Result<(), MintError> {
    if symbol.is_empty() {
        return Err(MintError::InvalidSymbol("symbol is empty"));
    }
    if symbol.len() > MAX_SYMBOL_LENGTH {
        return Err(MintError::InvalidSymbol("symbol is too long"));
    }
    if !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(MintError::InvalidSymbol("symbol is not alphanumeric"));
    }
    if symbol != symbol.to_uppercase() {
        return Err(MintError::InvalidSymbol("symbol is not uppercase"));
    }
    if is_symbol_restricted(symbol) {
        return Err(MintError::InvalidSymbol("symbol is restricted"));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), MintError> {
    if name.trim().is_empty() {
        return Err(MintError::InvalidName("name is empty"));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(MintError::InvalidName("name is too long"));
    }
    Ok(())
}

/// Validate the display strings of a new token
pub fn validate_token(name: &str, symbol: &str) -> Result<(), MintError> {
    validate_name(name)?;
    validate_symbol(symbol)
}

#[test]
fn test_restricted_symbols() {
    assert!(is_symbol_restricted("SOL"));
    assert!(is_symbol_restricted("sol"));
    assert!(is_symbol_restricted("Usdc"));
    assert!(is_symbol_restricted("solana"));
    assert!(!is_symbol_restricted("TEST"));
    assert!(!is_symbol_restricted("MOON"));
}

#[test]
fn test_symbol_validation() {
    assert!(validate_symbol("TEST").is_ok());
    assert!(validate_symbol("AGENT42").is_ok());
    assert!(validate_symbol("A").is_ok());

    assert_eq!(
        validate_symbol(""),
        Err(MintError::InvalidSymbol("symbol is empty"))
    );
    assert!(validate_symbol("AAAAAAAAAAAAAAAAAAAAAAAAA").is_err());
    assert!(validate_symbol("MY-TOKEN").is_err());
    assert!(validate_symbol("MY TOKEN").is_err());
    assert!(validate_symbol("test").is_err());
    assert_eq!(
        validate_symbol("USDC"),
        Err(MintError::InvalidSymbol("symbol is restricted"))
    );
}

#[test]
fn test_name_validation() {
    assert!(validate_name("Test").is_ok());
    assert!(validate_name("Agent Launch Token").is_ok());
    assert_eq!(validate_name("   "), Err(MintError::InvalidName("name is empty")));
    assert!(validate_name(&"x".repeat(MAX_NAME_LENGTH + 1)).is_err());
    assert!(validate_token("", "TEST").is_err());
    assert!(validate_token("Test", "").is_err());
}
