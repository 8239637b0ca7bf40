/*
 * Price quotes from the V4 Quoter, one-shot and polled
 */

use ethers::abi::{decode, ParamType, Token};
use ethers::types::{Address, Bytes, U256};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::encode_call;
use super::encoding::to_uint128;
use super::types::PoolKey;
use crate::metrics::Metrics;
use crate::models::{ContractCall, QuoteComparison, QuoteParams, QuoteResult, Result, SwapError, TradeType};
use crate::rpc::ChainClient;
use crate::utils::{get_swap_direction, parse_amount};

pub const QUOTE_EXACT_INPUT_SINGLE_SIGNATURE: &str =
    "quoteExactInputSingle(((address,address,uint24,int24,address),bool,uint128,bytes))";

pub const DEFAULT_QUOTE_INTERVAL: Duration = Duration::from_millis(5_000);

#[must_use]
pub fn encode_quote_call(params: &QuoteParams) -> Bytes {
    encode_call(
        QUOTE_EXACT_INPUT_SINGLE_SIGNATURE,
        &[Token::Tuple(vec![
            params.pool_key.to_token(),
            Token::Bool(params.zero_for_one),
            Token::Uint(U256::from(params.exact_amount)),
            Token::Bytes(params.hook_data.to_vec()),
        ])],
    )
}

/// `(uint256 amountOut, uint256 gasEstimate)`
pub fn decode_quote(raw: &[u8]) -> Result<QuoteResult> {
    let tokens = decode(&[ParamType::Uint(256), ParamType::Uint(256)], raw)
        .map_err(|e| SwapError::Quote(format!("Invalid quoter response: {e}")))?;

    match tokens.as_slice() {
        [Token::Uint(amount_out), Token::Uint(gas_estimate)] => Ok(QuoteResult {
            amount_out: *amount_out,
            gas_estimate: *gas_estimate,
        }),
        _ => Err(SwapError::Quote("Unexpected quoter response shape".to_string())),
    }
}

#[derive(Clone)]
pub struct QuoteManager {
    chain: Arc<dyn ChainClient>,
    quoter: Address,
    pool_key: PoolKey,
    interval: Duration,
    metrics: Option<Arc<Metrics>>,
}

impl QuoteManager {
    #[must_use]
    pub fn new(chain: Arc<dyn ChainClient>, quoter: Address, pool_key: PoolKey) -> Self {
        Self {
            chain,
            quoter,
            pool_key,
            interval: DEFAULT_QUOTE_INTERVAL,
            metrics: None,
        }
    }

    /// Polling period used by `subscribe_quotes`.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Simulates the swap on the quoter. Any revert or transport failure
    /// means "no quote".
    pub async fn get_quote(&self, params: &QuoteParams) -> Option<QuoteResult> {
        let call = ContractCall {
            to: self.quoter,
            data: encode_quote_call(params),
            ..ContractCall::default()
        };

        let quote = match self.chain.simulate_contract(&call).await {
            Ok(raw) => decode_quote(&raw),
            Err(e) => Err(e),
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_quote(quote.is_ok());
        }

        match quote {
            Ok(quote) => {
                debug!(
                    "Quote zero_for_one={} amount={} -> out={} gas={}",
                    params.zero_for_one, params.exact_amount, quote.amount_out, quote.gas_estimate
                );
                Some(quote)
            }
            Err(e) => {
                warn!("Error getting quote: {e}");
                None
            }
        }
    }

    pub async fn get_buy_quote(&self, amount_in: &str) -> Option<QuoteResult> {
        self.get_swap_quote(amount_in, true).await
    }

    pub async fn get_sell_quote(&self, amount_in: &str) -> Option<QuoteResult> {
        self.get_swap_quote(amount_in, false).await
    }

    pub async fn get_swap_quote(&self, amount_in: &str, is_buying: bool) -> Option<QuoteResult> {
        let params = self.quote_params(amount_in, is_buying)?;
        self.get_quote(&params).await
    }

    fn quote_params(&self, amount_in: &str, is_buying: bool) -> Option<QuoteParams> {
        let exact_amount = parse_amount(amount_in).and_then(to_uint128).ok()?;
        if exact_amount == 0 {
            return None;
        }

        Some(QuoteParams {
            pool_key: self.pool_key,
            zero_for_one: get_swap_direction(is_buying),
            exact_amount,
            hook_data: Bytes::new(),
        })
    }

    /// Quotes both directions for the same input amount.
    pub async fn compare_quotes(&self, amount_in: &str) -> Option<QuoteComparison> {
        let (buy, sell) = tokio::join!(self.get_buy_quote(amount_in), self.get_sell_quote(amount_in));
        let (buy_quote, sell_quote) = (buy?, sell?);

        let (buy_out, sell_out) = (buy_quote.amount_out, sell_quote.amount_out);
        let spread = if buy_out > sell_out { buy_out - sell_out } else { sell_out - buy_out };
        let spread_percent = if buy_out.is_zero() {
            Decimal::ZERO
        } else {
            let basis_points = (spread.saturating_mul(U256::from(10_000u32)) / buy_out)
                .min(U256::from(i64::MAX.unsigned_abs()));
            Decimal::new(basis_points.low_u64() as i64, 2)
        };

        Some(QuoteComparison {
            buy_quote,
            sell_quote,
            spread,
            spread_percent,
            better_deal: if buy_out > sell_out { TradeType::Buy } else { TradeType::Sell },
        })
    }

    /// `create_quote_subscription` at the manager's configured interval
    /// (5 seconds unless overridden).
    pub fn subscribe_quotes<F>(
        &self,
        amount_in: impl Into<String>,
        is_buying: bool,
        on_quote_update: F,
    ) -> QuoteSubscription
    where
        F: Fn(Option<QuoteResult>) + Send + Sync + 'static,
    {
        self.create_quote_subscription(amount_in, is_buying, on_quote_update, self.interval)
    }

    /// Issues a quote immediately and then once per `interval` until the
    /// returned handle is cancelled or dropped. A tick's quote finishes before
    /// the next one starts; ticks missed meanwhile are skipped.
    pub fn create_quote_subscription<F>(
        &self,
        amount_in: impl Into<String>,
        is_buying: bool,
        on_quote_update: F,
        interval: Duration,
    ) -> QuoteSubscription
    where
        F: Fn(Option<QuoteResult>) + Send + Sync + 'static,
    {
        let manager = self.clone();
        let amount_in = amount_in.into();
        let period = interval.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let quote = manager.get_swap_quote(&amount_in, is_buying).await;
                on_quote_update(quote);
            }
        });

        QuoteSubscription { handle }
    }
}

/// Owner handle of a polling quote task.
pub struct QuoteSubscription {
    handle: JoinHandle<()>,
}

impl QuoteSubscription {
    pub fn cancel(&self) {
        self.handle.abort();
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for QuoteSubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
