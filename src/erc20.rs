use crate::balances::TokenMetadata;
use crate::rpc::RpcClient;
use crate::units::to_decimal;
use alloy::primitives::Address;
use alloy::sol;
use alloy::sol_types::SolCall;
use anyhow::{Context, Result};

sol! {
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
        function name() external view returns (string);
    }
}

async fn call<C: SolCall>(client: &RpcClient, contract: Address, call: C) -> Result<C::Return> {
    let output = client.call(contract, call.abi_encode()).await?;

    C::abi_decode_returns(&output, true)
        .with_context(|| format!("Decoding {} output from {}", C::SIGNATURE, contract))
}

/// Reads balance, decimals, symbol and name of an ERC-20 contract concurrently.
/// Fails if any of the four calls fails or does not decode, e.g. for non-token contracts.
pub async fn fetch_token_metadata(
    client: &RpcClient,
    contract: Address,
    owner: Address,
) -> Result<TokenMetadata> {
    let (balance, decimals, symbol, name) = tokio::try_join!(
        call(client, contract, IERC20::balanceOfCall { owner }),
        call(client, contract, IERC20::decimalsCall {}),
        call(client, contract, IERC20::symbolCall {}),
        call(client, contract, IERC20::nameCall {}),
    )?;

    let decimals = decimals._0;

    Ok(TokenMetadata {
        balance: to_decimal(balance._0, decimals),
        decimals,
        symbol: symbol._0,
        name: name._0,
    })
}
