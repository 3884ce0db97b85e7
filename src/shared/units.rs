//! Ether <-> wei conversion for the UI boundary.
//!
//! The store and the contract binding only ever see wei (`U256`). These
//! helpers convert human-entered ether amounts into wei and back for display.
//! All math is exact: `rust_decimal::Decimal` on the way in, integer division
//! on the way out.

use std::fmt;
use std::str::FromStr;

use ethers_core::types::U256;
use rust_decimal::Decimal;

/// Number of decimals between ether and wei.
pub const ETHER_DECIMALS: u32 = 18;

/// Errors that can occur while converting ether amounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitsError {
    Negative(String),
    FractionalWei { value: String },
    Overflow { context: String },
    InvalidDecimal { input: String, reason: String },
}

impl fmt::Display for UnitsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitsError::Negative(v) => write!(f, "Amount must not be negative, got {}", v),
            UnitsError::FractionalWei { value } => {
                write!(f, "More than 18 decimals (fractional wei): {}", value)
            }
            UnitsError::Overflow { context } => write!(f, "Overflow: {}", context),
            UnitsError::InvalidDecimal { input, reason } => {
                write!(f, "Invalid decimal '{}': {}", input, reason)
            }
        }
    }
}

impl std::error::Error for UnitsError {}

/// Convert an ether amount into wei.
///
/// ```text
/// wei = ether * 10^18
/// ```
pub fn parse_ether(ether: Decimal) -> Result<U256, UnitsError> {
    if ether.is_sign_negative() && !ether.is_zero() {
        return Err(UnitsError::Negative(ether.to_string()));
    }

    let normalized = ether.normalize();
    let mantissa = normalized.mantissa().unsigned_abs();
    let scale = normalized.scale();

    if scale > ETHER_DECIMALS {
        return Err(UnitsError::FractionalWei {
            value: ether.to_string(),
        });
    }

    U256::from(mantissa)
        .checked_mul(U256::exp10((ETHER_DECIMALS - scale) as usize))
        .ok_or_else(|| UnitsError::Overflow {
            context: format!("{} * 10^18", ether),
        })
}

/// Parse a human-entered ether string (e.g. `"1.5"`) into wei.
pub fn parse_ether_str(input: &str) -> Result<U256, UnitsError> {
    let ether = Decimal::from_str(input.trim()).map_err(|e| UnitsError::InvalidDecimal {
        input: input.to_string(),
        reason: e.to_string(),
    })?;
    parse_ether(ether)
}

/// Format a wei amount as ether, trimming trailing zeros but always keeping
/// one fractional digit (`1500000000000000000` -> `"1.5"`, `10^18` -> `"1.0"`).
pub fn format_ether(wei: U256) -> String {
    let (whole, fraction) = wei.div_mod(U256::exp10(ETHER_DECIMALS as usize));
    let fraction = format!("{:0>18}", fraction.to_string());
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        format!("{}.0", whole)
    } else {
        format!("{}.{}", whole, fraction)
    }
}
