/*
 * Uniswap V4 pool state reads through the StateView lens
 */

use ethers::abi::{decode, ParamType, Token};
use ethers::types::{Address, I256};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

use super::encode_call;
use super::types::{PoolId, PoolKey};
use crate::models::{PoolState, Result, SwapError};
use crate::rpc::ChainClient;
use crate::utils::{sqrt_price_x96_to_price, ETHER_DECIMALS};

pub struct PoolStateReader {
    chain: Arc<dyn ChainClient>,
    state_view: Address,
    pool_key: PoolKey,
}

impl PoolStateReader {
    #[must_use]
    pub fn new(chain: Arc<dyn ChainClient>, state_view: Address, pool_key: PoolKey) -> Self {
        Self {
            chain,
            state_view,
            pool_key,
        }
    }

    #[must_use]
    pub fn pool_id(&self) -> PoolId {
        self.pool_key.to_id()
    }

    #[must_use]
    pub fn pool_key(&self) -> &PoolKey {
        &self.pool_key
    }

    pub async fn get_pool_state(&self) -> Result<PoolState> {
        let (sqrt_price_x96, tick, protocol_fee, lp_fee) = self.read_slot0().await?;
        let liquidity = self.read_liquidity().await?;

        Ok(PoolState {
            sqrt_price_x96,
            tick,
            protocol_fee,
            lp_fee,
            liquidity,
        })
    }

    /// Tokens per ETH at the current sqrt price.
    pub fn spot_price(state: &PoolState, token_decimals: u32) -> Result<Decimal> {
        sqrt_price_x96_to_price(state.sqrt_price_x96, ETHER_DECIMALS, token_decimals)
    }

    async fn read_slot0(&self) -> Result<(ethers::types::U256, i32, u32, u32)> {
        let pool_id = self.pool_id();
        let call_data = encode_call("getSlot0(bytes32)", &[Token::FixedBytes(pool_id.as_bytes().to_vec())]);
        let result = self.chain.read_contract(self.state_view, call_data).await?;
        let slot0 = decode_slot0(&result)?;
        debug!("slot0 for pool {pool_id:?}: tick {}", slot0.1);
        Ok(slot0)
    }

    async fn read_liquidity(&self) -> Result<u128> {
        let call_data = encode_call(
            "getLiquidity(bytes32)",
            &[Token::FixedBytes(self.pool_id().as_bytes().to_vec())],
        );
        let result = self.chain.read_contract(self.state_view, call_data).await?;
        decode_liquidity(&result)
    }
}

/// `(uint160 sqrtPriceX96, int24 tick, uint24 protocolFee, uint24 lpFee)`
pub(crate) fn decode_slot0(raw: &[u8]) -> Result<(ethers::types::U256, i32, u32, u32)> {
    let tokens = decode(
        &[ParamType::Uint(160), ParamType::Int(24), ParamType::Uint(24), ParamType::Uint(24)],
        raw,
    )
    .map_err(|e| SwapError::Contract(format!("Invalid slot0 response: {e}")))?;

    match tokens.as_slice() {
        [Token::Uint(sqrt_price), Token::Int(tick), Token::Uint(protocol_fee), Token::Uint(lp_fee)] => Ok((
            *sqrt_price,
            I256::from_raw(*tick).as_i32(),
            protocol_fee.low_u32(),
            lp_fee.low_u32(),
        )),
        _ => Err(SwapError::Contract("Unexpected slot0 response shape".to_string())),
    }
}

pub(crate) fn decode_liquidity(raw: &[u8]) -> Result<u128> {
    let tokens = decode(&[ParamType::Uint(128)], raw)
        .map_err(|e| SwapError::Contract(format!("Invalid liquidity response: {e}")))?;

    match tokens.as_slice() {
        [Token::Uint(liquidity)] => Ok(liquidity.low_u128()),
        _ => Err(SwapError::Contract("Unexpected liquidity response shape".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::abi::encode;
    use ethers::types::U256;

    #[test]
    fn decodes_negative_tick() {
        let raw = encode(&[
            Token::Uint(U256::one() << 96),
            Token::Int(I256::from(-887_220).into_raw()),
            Token::Uint(U256::zero()),
            Token::Uint(U256::from(3000u32)),
        ]);
        let (sqrt_price, tick, protocol_fee, lp_fee) = decode_slot0(&raw).unwrap();
        assert_eq!(sqrt_price, U256::one() << 96);
        assert_eq!(tick, -887_220);
        assert_eq!(protocol_fee, 0);
        assert_eq!(lp_fee, 3000);
    }

    #[test]
    fn short_slot0_is_rejected() {
        assert!(decode_slot0(&[0u8; 64]).is_err());
    }

    #[test]
    fn decodes_liquidity() {
        let raw = encode(&[Token::Uint(U256::from(123_456_789u64))]);
        assert_eq!(decode_liquidity(&raw).unwrap(), 123_456_789);
    }
}
