use crate::chain::ChainKey;
use serde::Serialize;
use std::time::Duration;
use strum_macros::{Display, EnumString};
use thiserror::Error;

/// The upstream call a failure was absorbed from. Used as a log field and metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UpstreamOperation {
    NativeBalance,
    TokenDiscovery,
    TokenMetadata,
    PriceBatch,
}

#[derive(Error, Debug)]
pub enum PortfolioError {
    #[error("Invalid Ethereum address format: {address}")]
    InvalidAddress { address: String },

    #[error("Chain {chain} has no usable RPC endpoint")]
    ChainUnavailable { chain: ChainKey },

    #[error("Chain {chain} did not answer within {timeout:?}")]
    ChainTimedOut { chain: ChainKey, timeout: Duration },

    #[error("Upstream {operation} call failed for {scope}: {message}")]
    Upstream {
        operation: UpstreamOperation,
        scope: String,
        message: String,
    },

    #[error("Internal failure: {message}")]
    Internal { message: String },
}

impl PortfolioError {
    pub fn invalid_address(address: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
        }
    }

    pub fn chain_unavailable(chain: ChainKey) -> Self {
        Self::ChainUnavailable { chain }
    }

    pub fn chain_timed_out(chain: ChainKey, timeout: Duration) -> Self {
        Self::ChainTimedOut { chain, timeout }
    }

    pub fn upstream(
        operation: UpstreamOperation,
        scope: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        Self::Upstream {
            operation,
            scope: scope.into(),
            message: message.to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
