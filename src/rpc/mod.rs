/*
 * JSON-RPC client for reading contract state and estimating gas on Base
 */

use crate::models::{ContractCall, Result, SwapError};
use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest, U256};
use std::sync::Arc;

/// Read side of the chain, injected into every manager.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// `eth_call` against a view function.
    async fn read_contract(&self, to: Address, data: Bytes) -> Result<Bytes>;

    /// `eth_call` of a state-changing function, optionally from a given sender.
    async fn simulate_contract(&self, call: &ContractCall) -> Result<Bytes>;

    async fn estimate_gas(&self, call: &ContractCall) -> Result<U256>;

    async fn get_balance(&self, address: Address) -> Result<U256>;
}

pub(crate) fn to_typed_transaction(call: &ContractCall) -> TypedTransaction {
    let mut tx = TransactionRequest::new()
        .to(call.to)
        .data(call.data.clone())
        .value(call.value);
    if let Some(from) = call.from {
        tx = tx.from(from);
    }
    if let Some(gas) = call.gas {
        tx = tx.gas(gas);
    }
    tx.into()
}

pub struct RpcClient {
    provider: Arc<Provider<Http>>,
    chain_id: u64,
}

impl RpcClient {
    pub async fn new(rpc_url: &str, chain_id: u64) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| SwapError::Rpc(format!("Failed to create provider: {e}")))?;

        let chain = provider
            .get_chainid()
            .await
            .map_err(|e| SwapError::Rpc(format!("Failed to get chain ID: {e}")))?;

        if chain.as_u64() != chain_id {
            return Err(SwapError::Rpc(format!(
                "Chain ID mismatch: expected {}, got {}",
                chain_id,
                chain.as_u64()
            )));
        }

        Ok(Self {
            provider: Arc::new(provider),
            chain_id,
        })
    }

    #[must_use]
    pub fn provider(&self) -> Arc<Provider<Http>> {
        self.provider.clone()
    }

    #[must_use]
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

#[async_trait]
impl ChainClient for RpcClient {
    async fn read_contract(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(data).into();
        self.provider
            .call(&tx, None)
            .await
            .map_err(|e| SwapError::Contract(format!("eth_call to {to:?} failed: {e}")))
    }

    async fn simulate_contract(&self, call: &ContractCall) -> Result<Bytes> {
        self.provider
            .call(&to_typed_transaction(call), None)
            .await
            .map_err(|e| SwapError::Contract(format!("Simulation against {:?} reverted: {e}", call.to)))
    }

    async fn estimate_gas(&self, call: &ContractCall) -> Result<U256> {
        self.provider
            .estimate_gas(&to_typed_transaction(call), None)
            .await
            .map_err(|e| SwapError::Estimation(e.to_string()))
    }

    async fn get_balance(&self, address: Address) -> Result<U256> {
        self.provider
            .get_balance(address, None)
            .await
            .map_err(|e| SwapError::Rpc(format!("Failed to get balance of {address:?}: {e}")))
    }
}
