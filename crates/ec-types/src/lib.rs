use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Decimal places of the native unit.
pub const ETHER_DECIMALS: u32 = 18;

const WEI_PER_ETHER: u128 = 10u128.pow(ETHER_DECIMALS);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct AccountAddress(pub String);

impl AccountAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountAddress {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuantityError {
    #[error("quantity is empty")]
    Empty,
    #[error("quantity `{0}` is not a valid hex number")]
    InvalidHex(String),
    #[error("quantity `{0}` is not a valid decimal number")]
    InvalidDecimal(String),
    #[error("quantity `{0}` does not fit in 128 bits")]
    Overflow(String),
}

/// Integer amount in the smallest native unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
#[serde(transparent)]
pub struct Wei(pub u128);

impl Wei {
    pub const ZERO: Wei = Wei(0);

    /// Parses a JSON-RPC hex quantity such as `0x22b1c8c1227a0000`.
    pub fn from_hex_quantity(value: &str) -> Result<Self, QuantityError> {
        let trimmed = value.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| QuantityError::InvalidHex(trimmed.to_owned()))?;
        if digits.is_empty() {
            return Err(QuantityError::Empty);
        }
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(QuantityError::InvalidHex(trimmed.to_owned()));
        }
        u128::from_str_radix(digits, 16)
            .map(Wei)
            .map_err(|_| QuantityError::Overflow(trimmed.to_owned()))
    }

    /// Parses a base-10 integer string, as some providers return balances that way.
    pub fn from_decimal_str(value: &str) -> Result<Self, QuantityError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(QuantityError::Empty);
        }
        if !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(QuantityError::InvalidDecimal(trimmed.to_owned()));
        }
        trimmed
            .parse::<u128>()
            .map(Wei)
            .map_err(|_| QuantityError::Overflow(trimmed.to_owned()))
    }

    /// Accepts either a `0x` hex quantity or a plain decimal integer.
    pub fn parse(value: &str) -> Result<Self, QuantityError> {
        let trimmed = value.trim();
        if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
            Self::from_hex_quantity(trimmed)
        } else {
            Self::from_decimal_str(trimmed)
        }
    }

    pub fn to_ether(self) -> Ether {
        Ether(self)
    }
}

/// Balance in ether, kept as exact wei and rendered as a fixed-point decimal.
///
/// Formatting matches `fromWei(value, "ether")`: no trailing zeros in the
/// fraction and no decimal point for whole amounts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(transparent)]
pub struct Ether(pub Wei);

impl Ether {
    pub fn wei(self) -> Wei {
        self.0
    }
}

impl fmt::Display for Ether {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = self.0.0;
        let whole = raw / WEI_PER_ETHER;
        let fraction = raw % WEI_PER_ETHER;
        if fraction == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{fraction:0width$}", width = ETHER_DECIMALS as usize);
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl From<Wei> for Ether {
    fn from(value: Wei) -> Self {
        Ether(value)
    }
}
