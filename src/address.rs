use crate::errors::PortfolioError;
use alloy::primitives::Address;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static ADDRESS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").expect("valid address pattern"));

/// A wallet address as the caller wrote it, validated against `^0x[a-fA-F0-9]{40}$`.
/// Mixed case is accepted without a checksum check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletAddress {
    raw: String,
    address: Address,
}

impl WalletAddress {
    pub fn as_address(&self) -> Address {
        self.address
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for WalletAddress {
    type Err = PortfolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !ADDRESS_PATTERN.is_match(s) {
            return Err(PortfolioError::invalid_address(s));
        }

        let address = Address::from_str(s).map_err(|_| PortfolioError::invalid_address(s))?;

        Ok(Self {
            raw: s.to_string(),
            address,
        })
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
