#![allow(dead_code)]

use async_trait::async_trait;
use contentment_swap::config::Config;
use contentment_swap::dex::uniswap_v4::permit::ALLOWANCE_SIGNATURE;
use contentment_swap::models::{ContractCall, Result, SwapError, SwapParams};
use contentment_swap::rpc::ChainClient;
use contentment_swap::wallet::WalletProvider;
use ethers::abi::{encode, Token};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip712::TypedData;
use ethers::types::{Address, Bytes, Signature, TransactionReceipt, H256, U256, U64};
use ethers::utils::keccak256;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const TEST_PRIVATE_KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
pub const PERMIT_NONCE: u64 = 7;

pub fn config() -> Config {
    Config::base_mainnet("http://127.0.0.1:8545").unwrap()
}

pub fn swap_params(amount_in: &str, is_buying: bool) -> SwapParams {
    SwapParams {
        token_address: config().contracts.token,
        amount_in: amount_in.to_string(),
        min_amount_out: U256::exp10(17),
        is_buying,
        slippage_percent: None,
    }
}

fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Scripted chain: quoter output, gas estimate and ERC-20/Permit2 reads.
pub struct MockChain {
    pub quote: Mutex<Option<(U256, U256)>>,
    pub gas_estimate: Mutex<Option<U256>>,
    pub eth_balance: U256,
    pub token_balance: U256,
    pub estimate_calls: AtomicUsize,
    pub simulate_calls: AtomicUsize,
    pub estimated: Mutex<Vec<ContractCall>>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self {
            quote: Mutex::new(Some((U256::exp10(18), U256::from(120_000u32)))),
            gas_estimate: Mutex::new(Some(U256::from(200_000u32))),
            eth_balance: U256::exp10(18),
            token_balance: U256::exp10(21),
            estimate_calls: AtomicUsize::new(0),
            simulate_calls: AtomicUsize::new(0),
            estimated: Mutex::new(Vec::new()),
        }
    }
}

impl MockChain {
    pub fn estimates(&self) -> usize {
        self.estimate_calls.load(Ordering::SeqCst)
    }

    pub fn failing_estimates() -> Self {
        let chain = Self::default();
        *chain.gas_estimate.lock().unwrap() = None;
        chain
    }

    pub fn reverting_quoter() -> Self {
        let chain = Self::default();
        *chain.quote.lock().unwrap() = None;
        chain
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn read_contract(&self, _to: Address, data: Bytes) -> Result<Bytes> {
        let sel = &data[0..4];
        if sel == selector(ALLOWANCE_SIGNATURE) {
            return Ok(encode(&[
                Token::Uint(U256::zero()),
                Token::Uint(U256::zero()),
                Token::Uint(U256::from(PERMIT_NONCE)),
            ])
            .into());
        }
        if sel == selector("balanceOf(address)") {
            return Ok(encode(&[Token::Uint(self.token_balance)]).into());
        }
        Err(SwapError::Contract("unexpected read".to_string()))
    }

    async fn simulate_contract(&self, _call: &ContractCall) -> Result<Bytes> {
        self.simulate_calls.fetch_add(1, Ordering::SeqCst);
        match *self.quote.lock().unwrap() {
            Some((amount_out, gas)) => Ok(encode(&[Token::Uint(amount_out), Token::Uint(gas)]).into()),
            None => Err(SwapError::Contract("execution reverted".to_string())),
        }
    }

    async fn estimate_gas(&self, call: &ContractCall) -> Result<U256> {
        self.estimate_calls.fetch_add(1, Ordering::SeqCst);
        self.estimated.lock().unwrap().push(call.clone());
        self.gas_estimate
            .lock()
            .unwrap()
            .ok_or_else(|| SwapError::Estimation("execution reverted".to_string()))
    }

    async fn get_balance(&self, _address: Address) -> Result<U256> {
        Ok(self.eth_balance)
    }
}

/// Local key wallet that records submissions instead of broadcasting them.
pub struct MockWallet {
    pub signer: LocalWallet,
    pub chain_id: u64,
    pub receipt_status: u64,
    pub sent: Mutex<Vec<ContractCall>>,
    pub signatures: AtomicUsize,
}

impl MockWallet {
    pub fn on_chain(chain_id: u64) -> Self {
        Self {
            signer: TEST_PRIVATE_KEY.parse::<LocalWallet>().unwrap().with_chain_id(chain_id),
            chain_id,
            receipt_status: 1,
            sent: Mutex::new(Vec::new()),
            signatures: AtomicUsize::new(0),
        }
    }

    pub fn sent(&self) -> Vec<ContractCall> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn address(&self) -> Result<Address> {
        Ok(self.signer.address())
    }

    async fn chain_id(&self) -> Result<u64> {
        Ok(self.chain_id)
    }

    async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Signature> {
        self.signatures.fetch_add(1, Ordering::SeqCst);
        self.signer
            .sign_typed_data(typed_data)
            .await
            .map_err(|e| SwapError::Signature(e.to_string()))
    }

    async fn send_transaction(&self, call: &ContractCall) -> Result<H256> {
        self.sent.lock().unwrap().push(call.clone());
        Ok(H256::repeat_byte(0xab))
    }

    async fn wait_for_receipt(&self, hash: H256) -> Result<TransactionReceipt> {
        Ok(TransactionReceipt {
            transaction_hash: hash,
            status: Some(U64::from(self.receipt_status)),
            ..TransactionReceipt::default()
        })
    }
}

impl MockWallet {
    pub fn signer_address(&self) -> Address {
        self.signer.address()
    }
}
