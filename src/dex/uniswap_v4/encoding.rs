/*
 * ABI encoding of Universal Router inputs for single-hop exact-input swaps
 */

use ethers::abi::{encode, Token};
use ethers::types::{Address, Bytes, U256};

use super::commands::{encode_buy_commands, encode_sell_commands, encode_swap_actions};
use super::encode_call;
use super::types::PoolKey;
use crate::models::{PermitData, Result, SwapData, SwapError};

pub const EXECUTE_SIGNATURE: &str = "execute(bytes,bytes[],uint256)";

const MAX_UINT48: u64 = (1 << 48) - 1;

/// Rejects amounts that would not fit the router's `uint128 amountIn`.
pub fn to_uint128(amount: U256) -> Result<u128> {
    if amount.bits() > 128 {
        return Err(SwapError::Validation(format!("Amount {amount} exceeds uint128")));
    }
    Ok(amount.as_u128())
}

/// `(PoolKey poolKey, bool zeroForOne, uint128 amountIn, uint256 amountOutMinimum, bytes hookData)`
#[must_use]
pub fn encode_swap_params(pool_key: &PoolKey, zero_for_one: bool, amount_in: u128, min_amount_out: U256) -> Bytes {
    encode(&[
        pool_key.to_token(),
        Token::Bool(zero_for_one),
        Token::Uint(U256::from(amount_in)),
        Token::Uint(min_amount_out),
        Token::Bytes(Vec::new()),
    ])
    .into()
}

/// `(address currency, uint256 amount)` for SETTLE_ALL.
#[must_use]
pub fn encode_settle_params(currency: Address, amount: U256) -> Bytes {
    encode(&[Token::Address(currency), Token::Uint(amount)]).into()
}

/// `(address currency, uint256 minAmount)` for TAKE_ALL.
#[must_use]
pub fn encode_take_params(currency: Address, amount: U256) -> Bytes {
    encode(&[Token::Address(currency), Token::Uint(amount)]).into()
}

/// `(bytes actions, bytes[] params)` consumed by the V4_SWAP command.
#[must_use]
pub fn encode_router_inputs(actions: &Bytes, params: &[Bytes]) -> Bytes {
    encode(&[
        Token::Bytes(actions.to_vec()),
        Token::Array(params.iter().map(|p| Token::Bytes(p.to_vec())).collect()),
    ])
    .into()
}

/// `(PermitSingle permitSingle, bytes signature)` consumed by PERMIT2_PERMIT.
pub fn encode_permit2_data(permit: &PermitData, spender: Address) -> Result<Bytes> {
    let details = &permit.details;
    if details.amount.bits() > 160 {
        return Err(SwapError::Validation(format!("Permit amount {} exceeds uint160", details.amount)));
    }
    if details.expiration > MAX_UINT48 || details.nonce > MAX_UINT48 {
        return Err(SwapError::Validation("Permit expiration or nonce exceeds uint48".to_string()));
    }

    Ok(encode(&[
        Token::Tuple(vec![
            Token::Tuple(vec![
                Token::Address(details.token),
                Token::Uint(details.amount),
                Token::Uint(U256::from(details.expiration)),
                Token::Uint(U256::from(details.nonce)),
            ]),
            Token::Address(spender),
            Token::Uint(permit.sig_deadline),
        ]),
        Token::Bytes(permit.signature.to_vec()),
    ])
    .into())
}

fn encode_v4_swap(pool_key: &PoolKey, zero_for_one: bool, amount_in: u128, min_amount_out: U256) -> Bytes {
    let (currency_in, currency_out) = pool_key.currencies_for(zero_for_one);
    let params = [
        encode_swap_params(pool_key, zero_for_one, amount_in, min_amount_out),
        encode_settle_params(currency_in, U256::from(amount_in)),
        encode_take_params(currency_out, U256::zero()),
    ];
    encode_router_inputs(&encode_swap_actions(), &params)
}

/// ETH -> token. The input amount travels as call value.
#[must_use]
pub fn encode_buy_data(pool_key: &PoolKey, amount_in: u128, min_amount_out: U256) -> SwapData {
    SwapData {
        commands: encode_buy_commands(),
        inputs: vec![encode_v4_swap(pool_key, true, amount_in, min_amount_out)],
        value: U256::from(amount_in),
    }
}

/// Token -> ETH, pulling the token through a Permit2 signature.
pub fn encode_sell_data(
    pool_key: &PoolKey,
    amount_in: u128,
    permit: &PermitData,
    spender: Address,
    min_amount_out: U256,
) -> Result<SwapData> {
    Ok(SwapData {
        commands: encode_sell_commands(),
        inputs: vec![
            encode_permit2_data(permit, spender)?,
            encode_v4_swap(pool_key, false, amount_in, min_amount_out),
        ],
        value: U256::zero(),
    })
}

/// Calldata for `UniversalRouter.execute(commands, inputs, deadline)`.
#[must_use]
pub fn encode_execute_calldata(swap: &SwapData, deadline: U256) -> Bytes {
    encode_call(
        EXECUTE_SIGNATURE,
        &[
            Token::Bytes(swap.commands.to_vec()),
            Token::Array(swap.inputs.iter().map(|i| Token::Bytes(i.to_vec())).collect()),
            Token::Uint(deadline),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PermitDetails;
    use ethers::abi::{decode, ParamType};

    fn pool_key() -> PoolKey {
        PoolKey::native_pair(Address::repeat_byte(0x73), 0, 60, Address::repeat_byte(0x3a))
    }

    fn word(bytes: &[u8], index: usize) -> U256 {
        U256::from_big_endian(&bytes[index * 32..(index + 1) * 32])
    }

    fn permit() -> PermitData {
        PermitData {
            signature: vec![0x11; 65].into(),
            details: PermitDetails {
                token: Address::repeat_byte(0x73),
                amount: U256::exp10(18),
                expiration: 1_700_000_600,
                nonce: 7,
            },
            sig_deadline: U256::from(1_700_000_600u64),
        }
    }

    #[test]
    fn swap_params_layout() {
        let encoded = encode_swap_params(&pool_key(), true, 5, U256::from(4u8));
        // 5 pool key words, zeroForOne, amountIn, amountOutMinimum, hookData offset, hookData length
        assert_eq!(encoded.len(), 10 * 32);
        assert_eq!(word(&encoded, 3), U256::from(60u8));
        assert_eq!(word(&encoded, 5), U256::one());
        assert_eq!(word(&encoded, 6), U256::from(5u8));
        assert_eq!(word(&encoded, 7), U256::from(4u8));
        assert_eq!(word(&encoded, 8), U256::from(9 * 32));
        assert_eq!(word(&encoded, 9), U256::zero());
    }

    #[test]
    fn amount_width_is_enforced() {
        assert_eq!(to_uint128(U256::from(u128::MAX)).unwrap(), u128::MAX);
        assert!(to_uint128(U256::from(u128::MAX) + 1).is_err());
    }

    #[test]
    fn buy_settles_native_and_takes_token() {
        let data = encode_buy_data(&pool_key(), 1_000, U256::from(900u32));
        assert_eq!(data.commands.to_vec(), vec![0x10]);
        assert_eq!(data.inputs.len(), 1);
        assert_eq!(data.value, U256::from(1_000u32));

        let decoded = decode(
            &[ParamType::Bytes, ParamType::Array(Box::new(ParamType::Bytes))],
            &data.inputs[0],
        )
        .unwrap();
        assert_eq!(decoded[0], Token::Bytes(vec![0x06, 0x0c, 0x0f]));
        let params = decoded[1].clone().into_array().unwrap();
        assert_eq!(params.len(), 3);

        let settle = params[1].clone().into_bytes().unwrap();
        assert_eq!(settle, encode_settle_params(Address::zero(), U256::from(1_000u32)).to_vec());
        let take = params[2].clone().into_bytes().unwrap();
        assert_eq!(take, encode_take_params(Address::repeat_byte(0x73), U256::zero()).to_vec());
    }

    #[test]
    fn sell_carries_permit_then_swap() {
        let spender = Address::repeat_byte(0x6f);
        let data = encode_sell_data(&pool_key(), 1_000, &permit(), spender, U256::zero()).unwrap();
        assert_eq!(data.commands.to_vec(), vec![0x0a, 0x10]);
        assert_eq!(data.inputs.len(), 2);
        assert!(data.value.is_zero());

        let swap = decode(
            &[ParamType::Bytes, ParamType::Array(Box::new(ParamType::Bytes))],
            &data.inputs[1],
        )
        .unwrap();
        let params = swap[1].clone().into_array().unwrap();
        let swap_params = params[0].clone().into_bytes().unwrap();
        assert_eq!(word(&swap_params, 5), U256::zero(), "sell is oneForZero");
        let settle = params[1].clone().into_bytes().unwrap();
        assert_eq!(settle, encode_settle_params(Address::repeat_byte(0x73), U256::from(1_000u32)).to_vec());
    }

    #[test]
    fn permit_payload_layout() {
        let spender = Address::repeat_byte(0x6f);
        let encoded = encode_permit2_data(&permit(), spender).unwrap();
        let decoded = decode(
            &[
                ParamType::Tuple(vec![
                    ParamType::Tuple(vec![
                        ParamType::Address,
                        ParamType::Uint(160),
                        ParamType::Uint(48),
                        ParamType::Uint(48),
                    ]),
                    ParamType::Address,
                    ParamType::Uint(256),
                ]),
                ParamType::Bytes,
            ],
            &encoded,
        )
        .unwrap();

        let permit_single = decoded[0].clone().into_tuple().unwrap();
        let details = permit_single[0].clone().into_tuple().unwrap();
        assert_eq!(details[0], Token::Address(Address::repeat_byte(0x73)));
        assert_eq!(details[3], Token::Uint(U256::from(7u8)));
        assert_eq!(permit_single[1], Token::Address(spender));
        assert_eq!(decoded[1], Token::Bytes(vec![0x11; 65]));
    }

    #[test]
    fn permit_width_is_enforced() {
        let mut oversized = permit();
        oversized.details.amount = U256::one() << 160;
        assert!(encode_permit2_data(&oversized, Address::zero()).is_err());

        let mut stale = permit();
        stale.details.nonce = 1 << 48;
        assert!(encode_permit2_data(&stale, Address::zero()).is_err());
    }

    #[test]
    fn execute_calldata_has_selector_and_deadline() {
        let data = encode_buy_data(&pool_key(), 1_000, U256::zero());
        let calldata = encode_execute_calldata(&data, U256::from(1_800_000_000u64));
        assert_eq!(&calldata[0..4], &ethers::utils::keccak256(EXECUTE_SIGNATURE)[0..4]);

        let args = decode(
            &[
                ParamType::Bytes,
                ParamType::Array(Box::new(ParamType::Bytes)),
                ParamType::Uint(256),
            ],
            &calldata[4..],
        )
        .unwrap();
        assert_eq!(args[0], Token::Bytes(vec![0x10]));
        assert_eq!(args[2], Token::Uint(U256::from(1_800_000_000u64)));
    }
}
