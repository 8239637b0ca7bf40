/*
 * Swap service that wires the Uniswap V4 managers to the RPC, wallet and price feed
 */

use ethers::types::{Address, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::{
    balance::{BalanceAsset, BalanceReader, Balances},
    cex::{CexClient, CoinbaseClient},
    config::Config,
    dex::uniswap_v4::{PoolId, PoolKey, PoolStateReader, QuoteManager, SwapManager, TransactionBuilder},
    metrics::Metrics,
    models::{
        BalanceCheck, EthPrice, PermitData, PoolState, QuoteComparison, QuoteResult, Result, SwapError,
        SwapParams, SwapResult, SwapTransaction, TradeType,
    },
    rpc::{ChainClient, RpcClient},
    utils::parse_positive_amount,
    wallet::{LocalWalletClient, WalletProvider},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub pool_id: PoolId,
    pub pool_key: PoolKey,
    pub state: PoolState,
    /// Tokens per ETH.
    pub spot_price: Decimal,
}

pub struct SwapService {
    config: Arc<Config>,
    chain: Arc<dyn ChainClient>,
    quotes: QuoteManager,
    builder: TransactionBuilder,
    pool: PoolStateReader,
    balances: BalanceReader,
    cex: Arc<dyn CexClient>,
    wallet: Option<Arc<dyn WalletProvider>>,
    metrics: Arc<Metrics>,
}

impl SwapService {
    pub async fn new(config: Config) -> Result<Self> {
        info!("Initializing swap service");

        let rpc = RpcClient::new(&config.chain.rpc_url, config.chain.chain_id).await?;
        info!("Connected to {} RPC (chain {})", config.chain.name, rpc.chain_id());

        let wallet: Option<Arc<dyn WalletProvider>> = match &config.wallet.private_key {
            Some(key) => {
                let wallet = LocalWalletClient::new(rpc.provider(), key, config.chain.chain_id)?
                    .with_poll_interval(Duration::from_millis(config.chain.receipt_poll_interval_ms));
                info!("Signing wallet loaded: {:?}", wallet.address().await?);
                Some(Arc::new(wallet))
            }
            None => {
                info!("No signing key configured, swap execution disabled");
                None
            }
        };

        let cex: Arc<dyn CexClient> = Arc::new(CoinbaseClient::with_base_url(&config.trading.price_feed_url));
        Self::from_parts(config, Arc::new(rpc), cex, wallet)
    }

    /// Assembles the service around already constructed collaborators.
    pub fn from_parts(
        config: Config,
        chain: Arc<dyn ChainClient>,
        cex: Arc<dyn CexClient>,
        wallet: Option<Arc<dyn WalletProvider>>,
    ) -> Result<Self> {
        config.validate()?;
        let metrics = Arc::new(Metrics::new()?);
        let pool_key = config.pool_key();

        let quotes = QuoteManager::new(chain.clone(), config.contracts.v4_quoter, pool_key)
            .with_metrics(metrics.clone())
            .with_interval(Duration::from_millis(config.trading.quote_interval_ms));
        let builder = TransactionBuilder::new(chain.clone(), &config).with_metrics(metrics.clone());
        let pool = PoolStateReader::new(chain.clone(), config.contracts.state_view, pool_key);
        let balances = BalanceReader::new(chain.clone());

        Ok(Self {
            config: Arc::new(config),
            chain,
            quotes,
            builder,
            pool,
            balances,
            cex,
            wallet,
            metrics,
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    #[must_use]
    pub fn quote_manager(&self) -> &QuoteManager {
        &self.quotes
    }

    #[must_use]
    pub fn can_execute(&self) -> bool {
        self.wallet.is_some()
    }

    pub async fn get_quote(&self, amount_in: &str, trade_type: TradeType) -> Option<QuoteResult> {
        self.quotes.get_swap_quote(amount_in, trade_type == TradeType::Buy).await
    }

    pub async fn compare_quotes(&self, amount_in: &str) -> Option<QuoteComparison> {
        self.quotes.compare_quotes(amount_in).await
    }

    pub async fn pool_snapshot(&self) -> Result<PoolSnapshot> {
        let state = self.pool.get_pool_state().await?;
        let spot_price = PoolStateReader::spot_price(&state, self.config.pool.token_decimals)?;

        Ok(PoolSnapshot {
            pool_id: self.pool.pool_id(),
            pool_key: *self.pool.pool_key(),
            state,
            spot_price,
        })
    }

    pub async fn balances(&self, owner: Address) -> Result<Balances> {
        self.balances.get_balances(self.config.contracts.token, owner).await
    }

    /// Whether `owner` holds `amount` of the asset the trade spends.
    pub async fn check_balance(&self, owner: Address, amount: &str, trade_type: TradeType) -> Result<BalanceCheck> {
        let asset = match trade_type {
            TradeType::Buy => BalanceAsset::Native,
            TradeType::Sell => BalanceAsset::Token(self.config.contracts.token),
        };
        self.balances.check_balance(asset, owner, amount).await
    }

    pub async fn eth_price(&self) -> Result<EthPrice> {
        self.cex.get_spot_price("ETH", "USD").await
    }

    /// Swap intent for the configured token. Without an explicit floor the
    /// output minimum comes from a fresh quote and the slippage tolerance.
    /// Malformed or non-positive amounts fail before the quoter is called.
    pub async fn prepare_params(
        &self,
        amount_in: &str,
        trade_type: TradeType,
        min_amount_out: Option<U256>,
        slippage_percent: Option<u32>,
    ) -> Result<SwapParams> {
        parse_positive_amount(amount_in)?;
        let token = self.config.contracts.token;
        let is_buying = trade_type == TradeType::Buy;
        let slippage = slippage_percent.unwrap_or(self.config.trading.default_slippage_percent);

        if let Some(min_amount_out) = min_amount_out {
            return Ok(SwapParams {
                token_address: token,
                amount_in: amount_in.to_string(),
                min_amount_out,
                is_buying,
                slippage_percent: Some(slippage),
            });
        }

        let quote = self
            .quotes
            .get_swap_quote(amount_in, is_buying)
            .await
            .ok_or_else(|| SwapError::Quote(format!("No quote available for {amount_in}")))?;
        Ok(SwapParams::from_quote(token, amount_in, is_buying, &quote, Some(slippage)))
    }

    /// Unsigned transaction for external signers. Sells need their permit.
    pub async fn build_swap(
        &self,
        params: &SwapParams,
        user: Address,
        permit: Option<&PermitData>,
    ) -> Result<SwapTransaction> {
        self.builder.build_swap_transaction(params, user, permit).await
    }

    /// Signs and submits with the configured key. Each call runs on its own
    /// `SwapManager`.
    pub async fn execute_swap(&self, params: &SwapParams) -> Result<SwapResult> {
        let wallet = self
            .wallet
            .clone()
            .ok_or_else(|| SwapError::Config("Swap execution requires PRIVATE_KEY".to_string()))?;
        let user = wallet.address().await?;

        let mut manager = SwapManager::new(self.chain.clone(), &self.config).with_metrics(self.metrics.clone());
        manager.set_wallet(wallet);

        info!(
            "Executing {:?} of {} for {user:?}",
            params.trade_type(),
            params.amount_in
        );
        Ok(manager.execute_swap(params, user).await)
    }
}
