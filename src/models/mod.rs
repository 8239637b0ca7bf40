/*
 * Data models, error taxonomy and result types for the swap layer
 */

use chrono::{DateTime, Utc};
use ethers::types::{Address, Bytes, H256, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dex::uniswap_v4::PoolKey;
use crate::utils::calculate_min_amount_out;

/// A single swap intent. Built fresh per user action and consumed once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapParams {
    pub token_address: Address,
    /// Human readable amount, e.g. "1.5". Parsed to 18 decimals at the boundary.
    pub amount_in: String,
    /// Output floor, already slippage adjusted.
    pub min_amount_out: U256,
    /// True for ETH -> token, false for token -> ETH.
    pub is_buying: bool,
    pub slippage_percent: Option<u32>,
}

impl SwapParams {
    /// Builds swap parameters from a fresh quote, applying the slippage tolerance
    /// (10% when `slippage_percent` is `None`).
    #[must_use]
    pub fn from_quote(
        token_address: Address,
        amount_in: impl Into<String>,
        is_buying: bool,
        quote: &QuoteResult,
        slippage_percent: Option<u32>,
    ) -> Self {
        let slippage = slippage_percent.unwrap_or(crate::utils::DEFAULT_SLIPPAGE_PERCENT);
        Self {
            token_address,
            amount_in: amount_in.into(),
            min_amount_out: calculate_min_amount_out(quote.amount_out, slippage),
            is_buying,
            slippage_percent: Some(slippage),
        }
    }

    #[must_use]
    pub fn trade_type(&self) -> TradeType {
        if self.is_buying {
            TradeType::Buy
        } else {
            TradeType::Sell
        }
    }
}

/// Encoded Universal Router payload for one swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapData {
    pub commands: Bytes,
    pub inputs: Vec<Bytes>,
    /// Native value attached to the call.
    pub value: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteParams {
    pub pool_key: PoolKey,
    /// True for currency0 -> currency1.
    pub zero_for_one: bool,
    pub exact_amount: u128,
    pub hook_data: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteResult {
    pub amount_out: U256,
    pub gas_estimate: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteComparison {
    pub buy_quote: QuoteResult,
    pub sell_quote: QuoteResult,
    pub spread: U256,
    pub spread_percent: Decimal,
    pub better_deal: TradeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitDetails {
    pub token: Address,
    /// uint160 on chain.
    pub amount: U256,
    /// uint48 unix timestamp.
    pub expiration: u64,
    /// uint48, strictly increasing per (owner, token, spender).
    pub nonce: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitData {
    /// 65 byte ECDSA signature over the EIP-712 PermitSingle.
    pub signature: Bytes,
    pub details: PermitDetails,
    pub sig_deadline: U256,
}

/// Fully formed, not yet submitted router call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapTransaction {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas_limit: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapResult {
    pub hash: H256,
    pub success: bool,
    pub status: SwapStatus,
    pub error: Option<String>,
    pub amount_out: Option<U256>,
}

impl SwapResult {
    #[must_use]
    pub fn failed(hash: H256, error: impl Into<String>) -> Self {
        Self {
            hash,
            success: false,
            status: SwapStatus::Failed,
            error: Some(error.into()),
            amount_out: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeType {
    Buy,
    Sell,
}

impl std::str::FromStr for TradeType {
    type Err = SwapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "buy" => Ok(TradeType::Buy),
            "sell" => Ok(TradeType::Sell),
            _ => Err(SwapError::Validation(format!("Unknown trade side: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwapStatus {
    Pending,
    Confirming,
    Success,
    Failed,
}

impl SwapStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, SwapStatus::Success | SwapStatus::Failed)
    }

    /// Moves to `next` if the transition is allowed. Terminal states never move.
    pub fn advance(self, next: SwapStatus) -> Result<SwapStatus> {
        let allowed = matches!(
            (self, next),
            (SwapStatus::Pending, SwapStatus::Confirming)
                | (SwapStatus::Pending, SwapStatus::Failed)
                | (SwapStatus::Confirming, SwapStatus::Success)
                | (SwapStatus::Confirming, SwapStatus::Failed)
        );
        if allowed {
            Ok(next)
        } else {
            Err(SwapError::Unknown(format!(
                "Invalid swap status transition {self:?} -> {next:?}"
            )))
        }
    }
}

/// Call descriptor shared by gas estimation, simulation and submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractCall {
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas: Option<U256>,
}

impl From<&SwapTransaction> for ContractCall {
    fn from(tx: &SwapTransaction) -> Self {
        Self {
            from: None,
            to: tx.to,
            data: tx.data.clone(),
            value: tx.value,
            gas: Some(tx.gas_limit),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    pub sqrt_price_x96: U256,
    pub tick: i32,
    pub protocol_fee: u32,
    pub lp_fee: u32,
    pub liquidity: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BalanceStatus {
    Sufficient,
    Insufficient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceCheck {
    pub balance: U256,
    pub required: U256,
    pub status: BalanceStatus,
}

impl BalanceCheck {
    #[must_use]
    pub fn has_insufficient_balance(&self) -> bool {
        self.status == BalanceStatus::Insufficient
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EthPrice {
    pub exchange: String,
    pub pair: String,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum SwapError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid amount format: {0}")]
    Format(String),

    #[error("{0}")]
    Precondition(String),

    #[error("Quote error: {0}")]
    Quote(String),

    #[error("Gas estimation error: {0}")]
    Estimation(String),

    #[error("Submission error: {0}")]
    Submission(String),

    #[error("Transaction failed: {0}")]
    ReceiptFailure(String),

    #[error("Signature error: {0}")]
    Signature(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Contract interaction error: {0}")]
    Contract(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CEX API error: {0}")]
    CexApi(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl SwapError {
    /// Short message suitable for surfacing in a `SwapResult`.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            SwapError::Precondition(msg) => msg.clone(),
            SwapError::ReceiptFailure(_) => "Transaction failed".to_string(),
            SwapError::Signature(msg) => format!("Signature rejected: {msg}"),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SwapError>;
