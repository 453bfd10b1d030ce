//! Fixed-point amount parsing and formatting
//!
//! ETH has 18 decimals on the wire but the ledger tracks micro-ETH (6),
//! the same precision as cUSDT.

use thiserror::Error;

/// Ledger precision for both assets
pub const MICRO_DECIMALS: u32 = 6;

/// Native asset precision
pub const WEI_DECIMALS: u32 = 18;

/// Wei per micro-ETH
pub const WEI_PER_MICRO: u128 = 1_000_000_000_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitsError {
    #[error("Amount is required")]
    Empty,

    #[error("Invalid amount: {0}")]
    Invalid(String),

    #[error("Too many decimals (max {0})")]
    TooManyDecimals(u32),

    #[error("Amount out of range: {0}")]
    Overflow(String),
}

/// Parse a non-negative decimal string into base units
///
/// `"1.5"` with 6 decimals is `1_500_000`. Whole part may be empty (`".5"`).
pub fn parse_fixed(value: &str, decimals: u32) -> Result<u128, UnitsError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(UnitsError::Empty);
    }

    let (whole_raw, frac_raw) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };
    let whole = if whole_raw.is_empty() { "0" } else { whole_raw };

    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac_raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(UnitsError::Invalid(trimmed.to_string()));
    }
    if frac_raw.len() > decimals as usize {
        return Err(UnitsError::TooManyDecimals(decimals));
    }

    let overflow = || UnitsError::Overflow(trimmed.to_string());
    let whole: u128 = whole.parse().map_err(|_| overflow())?;
    let frac: u128 = if frac_raw.is_empty() {
        0
    } else {
        format!("{:0<width$}", frac_raw, width = decimals as usize)
            .parse()
            .map_err(|_| overflow())?
    };

    whole
        .checked_mul(10u128.pow(decimals))
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(overflow)
}

/// Render base units as a decimal string with trailing zeros trimmed
pub fn format_fixed(value: u128, decimals: u32) -> String {
    let base = 10u128.pow(decimals);
    let whole = value / base;
    let frac = value % base;
    if decimals == 0 || frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Parse a cUSDT amount into micro-USDT
pub fn parse_usdt(value: &str) -> Result<u64, UnitsError> {
    let micro = parse_fixed(value, MICRO_DECIMALS)?;
    u64::try_from(micro).map_err(|_| UnitsError::Overflow(value.trim().to_string()))
}

/// Parse an ETH amount into wei
pub fn parse_eth(value: &str) -> Result<u128, UnitsError> {
    parse_fixed(value, WEI_DECIMALS)
}

/// Wei to micro-ETH, truncating dust below 10^12 wei
pub fn wei_to_micro(wei: u128) -> u128 {
    wei / WEI_PER_MICRO
}

pub fn format_usdt(micro: u64) -> String {
    format_fixed(micro as u128, MICRO_DECIMALS)
}

pub fn format_eth_micro(micro: u64) -> String {
    format_fixed(micro as u128, MICRO_DECIMALS)
}

pub fn format_wei(wei: u128) -> String {
    format_fixed(wei, WEI_DECIMALS)
}
