use crate::balances::{ChainReader, DiscoveredToken, TokenMetadata};
use crate::erc20::fetch_token_metadata;
use crate::units::parse_hex_quantity;
use alloy::primitives::{Address, Bytes, U256};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::Debug;

/// JSON-RPC 2.0 client for a single chain endpoint.
#[derive(Clone)]
pub struct RpcClient {
    host: Url,
    client: Client,
}

impl RpcClient {
    pub fn new(host: Url) -> Self {
        Self::with_client(host, Client::new())
    }

    /// Shares the connection pool and timeout of an existing HTTP client.
    pub fn with_client(host: Url, client: Client) -> Self {
        RpcClient { host, client }
    }

    pub async fn request<T>(&self, request: &Request) -> Result<T, RpcError>
    where
        T: for<'de> Deserialize<'de> + Debug,
    {
        let response: Response<T> = self
            .client
            .post(self.host.clone())
            .json(request)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(RpcError::transport)?
            .json()
            .await
            .map_err(RpcError::transport)?;

        if let Some(error) = response.error {
            Err(error)
        } else {
            response
                .result
                .ok_or_else(|| RpcError::transport("No result in response"))
        }
    }

    pub fn create_request(&self, method: &str, params: Option<Value>) -> Request {
        Request {
            method: method.to_string(),
            params,
            id: json!(generate_rpc_id()),
            jsonrpc: Some("2.0".to_string()),
        }
    }

    /// `eth_getBalance` at the latest block, in wei.
    pub async fn get_balance(&self, address: Address) -> Result<U256> {
        let value: String = self
            .request(&self.create_request("eth_getBalance", Some(json!([address, "latest"]))))
            .await?;

        parse_hex_quantity(&value).ok_or(anyhow!("Invalid balance quantity: {}", value))
    }

    /// `eth_call` against the latest block, returning the raw ABI encoded output.
    pub async fn call(&self, to: Address, data: Vec<u8>) -> Result<Bytes> {
        let output: Bytes = self
            .request(&self.create_request(
                "eth_call",
                Some(json!([{ "to": to, "data": Bytes::from(data) }, "latest"])),
            ))
            .await?;

        Ok(output)
    }

    /// Alchemy's `alchemy_getTokenBalances` extension, ERC-20 balances held by `address`.
    pub async fn get_token_balances(&self, address: Address) -> Result<Vec<TokenBalance>> {
        let response: TokenBalancesResponse = self
            .request(&self.create_request("alchemy_getTokenBalances", Some(json!([address]))))
            .await?;

        Ok(response.token_balances)
    }
}

#[async_trait]
impl ChainReader for RpcClient {
    async fn native_balance(&self, address: Address) -> Result<U256> {
        self.get_balance(address).await
    }

    async fn discover_tokens(&self, address: Address) -> Result<Vec<DiscoveredToken>> {
        let balances = self.get_token_balances(address).await?;

        Ok(balances
            .into_iter()
            .map(|balance| DiscoveredToken {
                contract_address: balance.contract_address,
                raw_balance: balance
                    .token_balance
                    .as_deref()
                    .and_then(parse_hex_quantity),
            })
            .collect())
    }

    async fn token_metadata(&self, contract: Address, owner: Address) -> Result<TokenMetadata> {
        fetch_token_metadata(self, contract, owner).await
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// The name of the RPC call.
    pub method: String,
    /// Parameters to the RPC call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Identifier for this request, which should appear in the response.
    pub id: Value,
    /// jsonrpc field, MUST be "2.0".
    pub jsonrpc: Option<String>,
}

/// A JSONRPC response object.
#[derive(Debug, Clone, Deserialize)]
pub struct Response<T> {
    /// A result if there is one, or [`None`].
    pub result: Option<T>,
    /// An error if there is one, or [`None`].
    pub error: Option<RpcError>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RpcError {
    /// The integer identifier of the error
    pub code: i32,
    /// A string describing the error
    pub message: String,
    /// Additional data specific to the error
    pub data: Option<Value>,
}

impl RpcError {
    /// Internal error code for failures that never reached a JSON-RPC response.
    pub const INTERNAL_ERROR: i32 = -32603;

    fn transport(message: impl ToString) -> Self {
        RpcError {
            code: Self::INTERNAL_ERROR,
            message: message.to_string(),
            data: None,
        }
    }
}

impl std::error::Error for RpcError {}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RPC Error {}: {} {}",
            self.code,
            self.message,
            self.data
                .as_ref()
                .map(|d| d.to_string())
                .unwrap_or_default()
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalancesResponse {
    pub token_balances: Vec<TokenBalance>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub contract_address: Address,
    /// Hex quantity, `null` when the provider could not read the balance
    pub token_balance: Option<String>,
}

fn generate_rpc_id() -> u32 {
    rand::rng().random()
}
