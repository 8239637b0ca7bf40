/*
 * Permit2 allowance reads and PermitSingle EIP-712 signing
 */

use ethers::abi::{decode, ParamType, Token};
use ethers::types::transaction::eip712::TypedData;
use ethers::types::{Address, U256};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use super::encode_call;
use crate::models::{PermitData, PermitDetails, Result, SwapError};
use crate::rpc::ChainClient;
use crate::utils::create_deadline;
use crate::wallet::WalletProvider;

pub const ALLOWANCE_SIGNATURE: &str = "allowance(address,address,address)";

/// On-chain allowance record for (owner, token, spender).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allowance {
    pub amount: U256,
    pub expiration: u64,
    pub nonce: u64,
}

pub fn decode_allowance(raw: &[u8]) -> Result<Allowance> {
    let tokens = decode(&[ParamType::Uint(160), ParamType::Uint(48), ParamType::Uint(48)], raw)
        .map_err(|e| SwapError::Contract(format!("Invalid allowance response: {e}")))?;

    match tokens.as_slice() {
        [Token::Uint(amount), Token::Uint(expiration), Token::Uint(nonce)] => Ok(Allowance {
            amount: *amount,
            expiration: expiration.low_u64(),
            nonce: nonce.low_u64(),
        }),
        _ => Err(SwapError::Contract("Unexpected allowance response shape".to_string())),
    }
}

/// EIP-712 `PermitSingle` with domain `{name: "Permit2", chainId, verifyingContract}`.
pub fn permit_typed_data(
    details: &PermitDetails,
    spender: Address,
    sig_deadline: U256,
    chain_id: u64,
    permit2: Address,
) -> Result<TypedData> {
    let payload = json!({
        "types": {
            "EIP712Domain": [
                { "name": "name", "type": "string" },
                { "name": "chainId", "type": "uint256" },
                { "name": "verifyingContract", "type": "address" }
            ],
            "PermitSingle": [
                { "name": "details", "type": "PermitDetails" },
                { "name": "spender", "type": "address" },
                { "name": "sigDeadline", "type": "uint256" }
            ],
            "PermitDetails": [
                { "name": "token", "type": "address" },
                { "name": "amount", "type": "uint160" },
                { "name": "expiration", "type": "uint48" },
                { "name": "nonce", "type": "uint48" }
            ]
        },
        "primaryType": "PermitSingle",
        "domain": {
            "name": "Permit2",
            "chainId": chain_id,
            "verifyingContract": format!("{permit2:?}")
        },
        "message": {
            "details": {
                "token": format!("{:?}", details.token),
                "amount": details.amount.to_string(),
                "expiration": details.expiration.to_string(),
                "nonce": details.nonce.to_string()
            },
            "spender": format!("{spender:?}"),
            "sigDeadline": sig_deadline.to_string()
        }
    });

    Ok(serde_json::from_value(payload)?)
}

#[derive(Clone)]
pub struct Permit2Client {
    chain: Arc<dyn ChainClient>,
    permit2: Address,
    chain_id: u64,
}

impl Permit2Client {
    #[must_use]
    pub fn new(chain: Arc<dyn ChainClient>, permit2: Address, chain_id: u64) -> Self {
        Self {
            chain,
            permit2,
            chain_id,
        }
    }

    pub async fn allowance(&self, owner: Address, token: Address, spender: Address) -> Result<Allowance> {
        let call_data = encode_call(
            ALLOWANCE_SIGNATURE,
            &[Token::Address(owner), Token::Address(token), Token::Address(spender)],
        );
        let raw = self.chain.read_contract(self.permit2, call_data).await?;
        decode_allowance(&raw)
    }

    /// Signs a fresh permit for `amount` of `token`. The nonce is read right
    /// before signing and never cached.
    pub async fn sign_permit(
        &self,
        wallet: &dyn WalletProvider,
        owner: Address,
        token: Address,
        amount: U256,
        spender: Address,
        expiry_minutes: u64,
    ) -> Result<PermitData> {
        let allowance = self.allowance(owner, token, spender).await?;
        let deadline = create_deadline(expiry_minutes);

        let details = PermitDetails {
            token,
            amount,
            expiration: deadline.low_u64(),
            nonce: allowance.nonce,
        };
        let typed_data = permit_typed_data(&details, spender, deadline, self.chain_id, self.permit2)?;
        let signature = wallet.sign_typed_data(&typed_data).await?;
        debug!("Signed Permit2 permit for {token:?} with nonce {}", details.nonce);

        Ok(PermitData {
            signature: signature.to_vec().into(),
            details,
            sig_deadline: deadline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::abi::encode;
    use ethers::types::transaction::eip712::Eip712;
    use ethers::utils::keccak256;

    fn details(nonce: u64) -> PermitDetails {
        PermitDetails {
            token: Address::repeat_byte(0x73),
            amount: U256::exp10(18),
            expiration: 1_700_000_600,
            nonce,
        }
    }

    fn permit2() -> Address {
        super::super::PERMIT2_ADDRESS.parse().unwrap()
    }

    fn expected_digest(details: &PermitDetails, spender: Address, sig_deadline: U256, chain_id: u64) -> [u8; 32] {
        let domain_separator = keccak256(encode(&[
            Token::FixedBytes(keccak256("EIP712Domain(string name,uint256 chainId,address verifyingContract)").to_vec()),
            Token::FixedBytes(keccak256("Permit2").to_vec()),
            Token::Uint(U256::from(chain_id)),
            Token::Address(permit2()),
        ]));
        let details_hash = keccak256(encode(&[
            Token::FixedBytes(keccak256("PermitDetails(address token,uint160 amount,uint48 expiration,uint48 nonce)").to_vec()),
            Token::Address(details.token),
            Token::Uint(details.amount),
            Token::Uint(U256::from(details.expiration)),
            Token::Uint(U256::from(details.nonce)),
        ]));
        let struct_hash = keccak256(encode(&[
            Token::FixedBytes(
                keccak256(
                    "PermitSingle(PermitDetails details,address spender,uint256 sigDeadline)PermitDetails(address token,uint160 amount,uint48 expiration,uint48 nonce)",
                )
                .to_vec(),
            ),
            Token::FixedBytes(details_hash.to_vec()),
            Token::Address(spender),
            Token::Uint(sig_deadline),
        ]));

        let mut preimage = vec![0x19, 0x01];
        preimage.extend_from_slice(&domain_separator);
        preimage.extend_from_slice(&struct_hash);
        keccak256(preimage)
    }

    #[test]
    fn typed_data_digest_matches_permit2_hashing() {
        let spender = Address::repeat_byte(0x6f);
        let deadline = U256::from(1_700_000_600u64);
        let typed = permit_typed_data(&details(3), spender, deadline, 8453, permit2()).unwrap();
        assert_eq!(typed.primary_type, "PermitSingle");
        assert_eq!(
            typed.encode_eip712().unwrap(),
            expected_digest(&details(3), spender, deadline, 8453)
        );
    }

    #[test]
    fn nonce_and_chain_change_the_digest() {
        let spender = Address::repeat_byte(0x6f);
        let deadline = U256::from(1_700_000_600u64);
        let base = permit_typed_data(&details(3), spender, deadline, 8453, permit2())
            .unwrap()
            .encode_eip712()
            .unwrap();
        let next_nonce = permit_typed_data(&details(4), spender, deadline, 8453, permit2())
            .unwrap()
            .encode_eip712()
            .unwrap();
        let other_chain = permit_typed_data(&details(3), spender, deadline, 1, permit2())
            .unwrap()
            .encode_eip712()
            .unwrap();
        assert_ne!(base, next_nonce);
        assert_ne!(base, other_chain);
    }

    #[test]
    fn decodes_allowance_tuple() {
        let raw = encode(&[
            Token::Uint(U256::from(500u32)),
            Token::Uint(U256::from(1_700_000_000u64)),
            Token::Uint(U256::from(9u8)),
        ]);
        let allowance = decode_allowance(&raw).unwrap();
        assert_eq!(allowance.amount, U256::from(500u32));
        assert_eq!(allowance.expiration, 1_700_000_000);
        assert_eq!(allowance.nonce, 9);

        assert!(decode_allowance(&raw[..64]).is_err());
    }
}
