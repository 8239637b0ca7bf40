/*
 * Unsigned Universal Router transactions for callers that submit themselves
 */

use ethers::types::{Address, U256};
use std::sync::Arc;
use tracing::{debug, warn};

use super::encoding::{encode_buy_data, encode_execute_calldata, encode_sell_data, to_uint128};
use super::types::PoolKey;
use crate::config::Config;
use crate::metrics::Metrics;
use crate::models::{ContractCall, PermitData, Result, SwapData, SwapError, SwapParams, SwapTransaction};
use crate::rpc::ChainClient;
use crate::utils::{calculate_gas_with_buffer, create_deadline, parse_amount, parse_positive_amount};

/// Rejects caller mistakes before any network call is made.
pub fn validate_swap_params(params: &SwapParams) -> Result<()> {
    if params.token_address.is_zero() {
        return Err(SwapError::Validation("Invalid token address".to_string()));
    }

    parse_positive_amount(&params.amount_in)
        .map_err(|e| SwapError::Validation(format!("Invalid amount input: {e}")))?;

    if let Some(slippage) = params.slippage_percent {
        if slippage > 100 {
            return Err(SwapError::Validation(format!("Invalid slippage percentage: {slippage}")));
        }
    }

    Ok(())
}

#[derive(Clone)]
pub struct TransactionBuilder {
    chain: Arc<dyn ChainClient>,
    router: Address,
    pool_key: PoolKey,
    gas_buffer_percent: u32,
    fallback_gas_limit: U256,
    deadline_minutes: u64,
    metrics: Option<Arc<Metrics>>,
}

impl TransactionBuilder {
    #[must_use]
    pub fn new(chain: Arc<dyn ChainClient>, config: &Config) -> Self {
        Self {
            chain,
            router: config.contracts.universal_router,
            pool_key: config.pool_key(),
            gas_buffer_percent: config.trading.gas_buffer_percent,
            fallback_gas_limit: U256::from(config.trading.fallback_gas_limit),
            deadline_minutes: config.trading.deadline_minutes,
            metrics: None,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[must_use]
    pub fn router(&self) -> Address {
        self.router
    }

    pub fn validate_swap_params(&self, params: &SwapParams) -> Result<()> {
        validate_swap_params(params)?;
        if params.token_address != self.pool_key.currency1 {
            return Err(SwapError::Validation(format!(
                "Token {:?} is not traded in the configured pool",
                params.token_address
            )));
        }
        Ok(())
    }

    pub async fn build_buy_transaction(&self, params: &SwapParams, user: Address) -> Result<SwapTransaction> {
        self.validate_swap_params(params)?;
        let swap = self.encode(params, None)?;
        self.finish(swap, user).await
    }

    pub async fn build_sell_transaction(
        &self,
        params: &SwapParams,
        permit: &PermitData,
        user: Address,
    ) -> Result<SwapTransaction> {
        self.validate_swap_params(params)?;
        let swap = self.encode(params, Some(permit))?;
        self.finish(swap, user).await
    }

    /// Sells need the caller's signed permit; buys ignore it.
    pub async fn build_swap_transaction(
        &self,
        params: &SwapParams,
        user: Address,
        permit: Option<&PermitData>,
    ) -> Result<SwapTransaction> {
        if params.is_buying {
            return self.build_buy_transaction(params, user).await;
        }
        let permit = permit
            .ok_or_else(|| SwapError::Validation("Permit data required for sell transactions".to_string()))?;
        self.build_sell_transaction(params, permit, user).await
    }

    /// Buffered gas for the swap, or the fallback ceiling when estimation fails.
    pub async fn estimate_swap_gas(
        &self,
        params: &SwapParams,
        user: Address,
        permit: Option<&PermitData>,
    ) -> Result<U256> {
        self.validate_swap_params(params)?;
        let swap = self.encode(params, permit)?;
        let deadline = create_deadline(self.deadline_minutes);
        let call = ContractCall {
            from: Some(user),
            to: self.router,
            data: encode_execute_calldata(&swap, deadline),
            value: swap.value,
            gas: None,
        };
        Ok(self.estimate_gas_or_fallback(&call).await)
    }

    fn encode(&self, params: &SwapParams, permit: Option<&PermitData>) -> Result<SwapData> {
        let amount_in = to_uint128(parse_amount(&params.amount_in)?)?;
        if params.is_buying {
            return Ok(encode_buy_data(&self.pool_key, amount_in, params.min_amount_out));
        }
        let permit = permit
            .ok_or_else(|| SwapError::Validation("Permit data required for sell transactions".to_string()))?;
        encode_sell_data(&self.pool_key, amount_in, permit, self.router, params.min_amount_out)
    }

    async fn finish(&self, swap: SwapData, user: Address) -> Result<SwapTransaction> {
        let deadline = create_deadline(self.deadline_minutes);
        let data = encode_execute_calldata(&swap, deadline);
        let call = ContractCall {
            from: Some(user),
            to: self.router,
            data: data.clone(),
            value: swap.value,
            gas: None,
        };
        let gas_limit = self.estimate_gas_or_fallback(&call).await;

        Ok(SwapTransaction {
            to: self.router,
            data,
            value: swap.value,
            gas_limit,
        })
    }

    /// Estimation failures are not fatal for either direction: overpaying gas
    /// beats blocking the swap.
    async fn estimate_gas_or_fallback(&self, call: &ContractCall) -> U256 {
        match self.chain.estimate_gas(call).await {
            Ok(estimate) => {
                let gas_limit = calculate_gas_with_buffer(estimate, self.gas_buffer_percent);
                debug!("Gas estimate {estimate}, limit with buffer {gas_limit}");
                gas_limit
            }
            Err(e) => {
                warn!(
                    "Gas estimation failed, using fallback limit {}: {e}",
                    self.fallback_gas_limit
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_gas_fallback();
                }
                self.fallback_gas_limit
            }
        }
    }
}
