/*
 * Native and ERC-20 balances for the swap form
 */

use ethers::abi::{decode, ParamType, Token};
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::dex::uniswap_v4::encode_call;
use crate::models::{BalanceCheck, BalanceStatus, Result, SwapError};
use crate::rpc::ChainClient;
use crate::utils::parse_amount;

pub const BALANCE_OF_SIGNATURE: &str = "balanceOf(address)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceAsset {
    Native,
    Token(Address),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Balances {
    pub owner: Address,
    pub eth: U256,
    pub token: U256,
}

pub struct BalanceReader {
    chain: Arc<dyn ChainClient>,
}

impl BalanceReader {
    #[must_use]
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self { chain }
    }

    pub async fn get_eth_balance(&self, owner: Address) -> Result<U256> {
        self.chain.get_balance(owner).await
    }

    pub async fn get_token_balance(&self, token: Address, owner: Address) -> Result<U256> {
        let call_data = encode_call(BALANCE_OF_SIGNATURE, &[Token::Address(owner)]);
        let raw = self.chain.read_contract(token, call_data).await?;
        decode_balance(&raw)
    }

    pub async fn get_balances(&self, token: Address, owner: Address) -> Result<Balances> {
        let (eth, token) = tokio::try_join!(self.get_eth_balance(owner), self.get_token_balance(token, owner))?;
        Ok(Balances { owner, eth, token })
    }

    pub async fn get_balance(&self, asset: BalanceAsset, owner: Address) -> Result<U256> {
        match asset {
            BalanceAsset::Native => self.get_eth_balance(owner).await,
            BalanceAsset::Token(token) => self.get_token_balance(token, owner).await,
        }
    }

    /// An empty or zero amount never needs funds and skips the balance read.
    pub async fn check_balance(&self, asset: BalanceAsset, owner: Address, amount: &str) -> Result<BalanceCheck> {
        let required = if amount.trim().is_empty() {
            U256::zero()
        } else {
            parse_amount(amount)?
        };

        if required.is_zero() {
            return Ok(BalanceCheck {
                balance: U256::zero(),
                required,
                status: BalanceStatus::Sufficient,
            });
        }

        let balance = self.get_balance(asset, owner).await?;
        debug!("{asset:?} balance of {owner:?}: {balance}, required {required}");
        Ok(evaluate_balance(balance, required))
    }
}

#[must_use]
pub fn evaluate_balance(balance: U256, required: U256) -> BalanceCheck {
    let status = if balance >= required {
        BalanceStatus::Sufficient
    } else {
        BalanceStatus::Insufficient
    };
    BalanceCheck {
        balance,
        required,
        status,
    }
}

fn decode_balance(raw: &[u8]) -> Result<U256> {
    let tokens = decode(&[ParamType::Uint(256)], raw)
        .map_err(|e| SwapError::Contract(format!("Invalid balanceOf response: {e}")))?;

    match tokens.as_slice() {
        [Token::Uint(balance)] => Ok(*balance),
        _ => Err(SwapError::Contract("Unexpected balanceOf response shape".to_string())),
    }
}
