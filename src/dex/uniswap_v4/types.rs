/*
 * Uniswap V4 types and structures
 */

use ethers::abi::{encode, Token};
use ethers::types::{Address, H160, H256, I256, U256};
use ethers::utils::keccak256;
use serde::{Deserialize, Serialize};

use crate::models::{Result, SwapError};

pub const MIN_TICK: i32 = -887_272;
pub const MAX_TICK: i32 = 887_272;
/// Native ETH is addressed as the zero currency and always sorts first.
pub const NATIVE_CURRENCY: Address = H160([0u8; 20]);

const MAX_UINT24: u32 = 0x00FF_FFFF;
const MIN_INT24: i32 = -0x0080_0000;
const MAX_INT24: i32 = 0x007F_FFFF;

/// keccak256 of the ABI encoded pool key.
pub type PoolId = H256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolKey {
    pub currency0: Address,
    pub currency1: Address,
    /// uint24 fee in hundredths of a bip.
    pub fee: u32,
    /// int24 tick spacing.
    pub tick_spacing: i32,
    pub hooks: Address,
}

impl PoolKey {
    /// Sorts the two currencies so that `currency0 < currency1`.
    pub fn new(token_a: Address, token_b: Address, fee: u32, tick_spacing: i32, hooks: Address) -> Result<Self> {
        if token_a == token_b {
            return Err(SwapError::Validation("Pool currencies must differ".to_string()));
        }
        if fee > MAX_UINT24 {
            return Err(SwapError::Validation(format!("Fee {fee} does not fit uint24")));
        }
        if !(MIN_INT24..=MAX_INT24).contains(&tick_spacing) {
            return Err(SwapError::Validation(format!(
                "Tick spacing {tick_spacing} does not fit int24"
            )));
        }

        let (currency0, currency1) = if token_a < token_b {
            (token_a, token_b)
        } else {
            (token_b, token_a)
        };

        Ok(Self {
            currency0,
            currency1,
            fee,
            tick_spacing,
            hooks,
        })
    }

    /// ETH/token pool. The zero address always sorts below any token.
    #[must_use]
    pub fn native_pair(token: Address, fee: u32, tick_spacing: i32, hooks: Address) -> Self {
        Self {
            currency0: NATIVE_CURRENCY,
            currency1: token,
            fee,
            tick_spacing,
            hooks,
        }
    }

    #[must_use]
    pub fn is_native_pair(&self) -> bool {
        self.currency0 == NATIVE_CURRENCY
    }

    /// Input and output currency for a swap in the given direction.
    #[must_use]
    pub fn currencies_for(&self, zero_for_one: bool) -> (Address, Address) {
        if zero_for_one {
            (self.currency0, self.currency1)
        } else {
            (self.currency1, self.currency0)
        }
    }

    /// `(address,address,uint24,int24,address)` with int24 sign-extended to 256 bits.
    #[must_use]
    pub fn to_token(&self) -> Token {
        Token::Tuple(vec![
            Token::Address(self.currency0),
            Token::Address(self.currency1),
            Token::Uint(U256::from(self.fee)),
            Token::Int(I256::from(self.tick_spacing).into_raw()),
            Token::Address(self.hooks),
        ])
    }

    #[must_use]
    pub fn to_id(&self) -> PoolId {
        H256::from(keccak256(encode(&[self.to_token()])))
    }
}
