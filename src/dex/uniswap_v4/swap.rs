/*
 * Swap orchestration: preconditions, permit signing, submission, confirmation
 */

use ethers::types::{Address, H256, U64};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::permit::Permit2Client;
use super::transaction::TransactionBuilder;
use crate::config::Config;
use crate::metrics::Metrics;
use crate::models::{ContractCall, Result, SwapError, SwapParams, SwapResult, SwapStatus, SwapTransaction};
use crate::rpc::ChainClient;
use crate::utils::parse_amount;
use crate::wallet::WalletProvider;

/// Drives one swap intent at a time. Build a new manager for every
/// concurrent swap; the wallet slot and status channel are shared per instance.
pub struct SwapManager {
    builder: TransactionBuilder,
    permit2: Permit2Client,
    wallet: Option<Arc<dyn WalletProvider>>,
    expected_chain_id: u64,
    chain_name: String,
    permit_expiry_minutes: u64,
    status: watch::Sender<SwapStatus>,
    metrics: Option<Arc<Metrics>>,
}

impl SwapManager {
    #[must_use]
    pub fn new(chain: Arc<dyn ChainClient>, config: &Config) -> Self {
        let (status, _) = watch::channel(SwapStatus::Pending);
        Self {
            builder: TransactionBuilder::new(chain.clone(), config),
            permit2: Permit2Client::new(chain, config.contracts.permit2, config.chain.chain_id),
            wallet: None,
            expected_chain_id: config.chain.chain_id,
            chain_name: config.chain.name.clone(),
            permit_expiry_minutes: config.trading.permit_expiry_minutes,
            status,
            metrics: None,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.builder = self.builder.with_metrics(metrics.clone());
        self.metrics = Some(metrics);
        self
    }

    pub fn set_wallet(&mut self, wallet: Arc<dyn WalletProvider>) {
        self.wallet = Some(wallet);
    }

    /// Observes PENDING -> CONFIRMING -> SUCCESS/FAILED for the current swap.
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<SwapStatus> {
        self.status.subscribe()
    }

    #[must_use]
    pub fn status(&self) -> SwapStatus {
        *self.status.borrow()
    }

    /// Routes to the buy or sell path. Never returns an error: every failure
    /// ends up in a FAILED `SwapResult`. Sells must be owned by the connected
    /// wallet, since it signs the permit and submits the transaction.
    pub async fn execute_swap(&self, params: &SwapParams, user: Address) -> SwapResult {
        if params.is_buying {
            self.execute_buy_swap(params).await
        } else {
            self.execute_sell_swap(params, user).await
        }
    }

    pub async fn execute_buy_swap(&self, params: &SwapParams) -> SwapResult {
        self.begin();
        let outcome = async {
            let wallet = self.validate_swap_preconditions().await?;
            let user = wallet.address().await?;
            let tx = self.builder.build_buy_transaction(params, user).await?;
            self.submit(wallet.as_ref(), &tx).await
        }
        .await;
        self.conclude(params, outcome)
    }

    pub async fn execute_sell_swap(&self, params: &SwapParams, user: Address) -> SwapResult {
        self.begin();
        let outcome = async {
            let wallet = self.validate_swap_preconditions().await?;
            let signer = wallet.address().await?;
            if signer != user {
                return Err(SwapError::Precondition(
                    "Connected wallet does not match the selling account".to_string(),
                ));
            }
            self.builder.validate_swap_params(params)?;

            let amount = parse_amount(&params.amount_in)?;
            let permit = self
                .permit2
                .sign_permit(
                    wallet.as_ref(),
                    user,
                    params.token_address,
                    amount,
                    self.builder.router(),
                    self.permit_expiry_minutes,
                )
                .await?;

            let tx = self.builder.build_sell_transaction(params, &permit, user).await?;
            self.submit(wallet.as_ref(), &tx).await
        }
        .await;
        self.conclude(params, outcome)
    }

    /// Wallet present and on the expected network. Checked before any
    /// signature or RPC cost.
    async fn validate_swap_preconditions(&self) -> Result<Arc<dyn WalletProvider>> {
        let wallet = self
            .wallet
            .clone()
            .ok_or_else(|| SwapError::Precondition("No wallet connected".to_string()))?;

        let chain_id = wallet.chain_id().await?;
        if chain_id != self.expected_chain_id {
            return Err(SwapError::Precondition(format!(
                "Please switch to the {} network",
                self.chain_name
            )));
        }
        Ok(wallet)
    }

    async fn submit(&self, wallet: &dyn WalletProvider, tx: &SwapTransaction) -> Result<(H256, bool)> {
        let hash = wallet.send_transaction(&ContractCall::from(tx)).await?;
        self.transition(SwapStatus::Confirming);
        info!("Swap submitted: {hash:?}, waiting for confirmation");

        let receipt = wallet.wait_for_receipt(hash).await?;
        Ok((hash, receipt.status == Some(U64::one())))
    }

    fn begin(&self) {
        self.status.send_replace(SwapStatus::Pending);
    }

    fn transition(&self, next: SwapStatus) {
        let current = self.status();
        match current.advance(next) {
            Ok(next) => {
                self.status.send_replace(next);
            }
            Err(e) => warn!("{e}"),
        }
    }

    fn conclude(&self, params: &SwapParams, outcome: Result<(H256, bool)>) -> SwapResult {
        let result = match outcome {
            Ok((hash, true)) => {
                self.transition(SwapStatus::Success);
                info!("Swap confirmed: {hash:?}");
                SwapResult {
                    hash,
                    success: true,
                    status: SwapStatus::Success,
                    error: None,
                    amount_out: None,
                }
            }
            Ok((hash, false)) => {
                self.transition(SwapStatus::Failed);
                error!("Swap reverted on chain: {hash:?}");
                SwapResult::failed(hash, "Transaction failed")
            }
            Err(e) => {
                self.transition(SwapStatus::Failed);
                error!("Swap failed: {e}");
                SwapResult::failed(H256::zero(), e.user_message())
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_swap(params.trade_type(), result.success);
        }
        result
    }
}
