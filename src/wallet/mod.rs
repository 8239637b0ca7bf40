/*
 * Wallet boundary: account, network, typed-data signing and submission
 */

use crate::models::{ContractCall, Result, SwapError};
use crate::rpc::to_typed_transaction;
use async_trait::async_trait;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, PendingTransaction, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip712::TypedData;
use ethers::types::{Address, Signature, TransactionReceipt, H256};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn address(&self) -> Result<Address>;

    async fn chain_id(&self) -> Result<u64>;

    async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Signature>;

    async fn send_transaction(&self, call: &ContractCall) -> Result<H256>;

    async fn wait_for_receipt(&self, hash: H256) -> Result<TransactionReceipt>;
}

/// Signs with an in-process key and submits through the HTTP provider.
pub struct LocalWalletClient {
    client: SignerMiddleware<Provider<Http>, LocalWallet>,
    poll_interval: Duration,
}

impl LocalWalletClient {
    pub fn new(provider: Arc<Provider<Http>>, private_key: &str, chain_id: u64) -> Result<Self> {
        let wallet = private_key
            .trim()
            .parse::<LocalWallet>()
            .map_err(|e| SwapError::Config(format!("Invalid private key: {e}")))?
            .with_chain_id(chain_id);

        Ok(Self {
            client: SignerMiddleware::new((*provider).clone(), wallet),
            poll_interval: Duration::from_secs(2),
        })
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

#[async_trait]
impl WalletProvider for LocalWalletClient {
    async fn address(&self) -> Result<Address> {
        Ok(self.client.address())
    }

    async fn chain_id(&self) -> Result<u64> {
        let chain = self
            .client
            .get_chainid()
            .await
            .map_err(|e| SwapError::Rpc(format!("Failed to get chain ID: {e}")))?;
        Ok(chain.as_u64())
    }

    async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Signature> {
        self.client
            .signer()
            .sign_typed_data(typed_data)
            .await
            .map_err(|e| SwapError::Signature(e.to_string()))
    }

    async fn send_transaction(&self, call: &ContractCall) -> Result<H256> {
        let mut tx = to_typed_transaction(call);
        tx.set_from(self.client.address());

        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(|e| SwapError::Submission(e.to_string()))?;
        let hash = pending.tx_hash();
        debug!("Submitted transaction {hash:?}");
        Ok(hash)
    }

    async fn wait_for_receipt(&self, hash: H256) -> Result<TransactionReceipt> {
        PendingTransaction::new(hash, self.client.provider())
            .interval(self.poll_interval)
            .await
            .map_err(|e| SwapError::Rpc(format!("Failed waiting for {hash:?}: {e}")))?
            .ok_or_else(|| SwapError::ReceiptFailure(format!("{hash:?} dropped from mempool")))
    }
}
