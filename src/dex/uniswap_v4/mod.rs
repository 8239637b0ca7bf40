/*
 * Uniswap V4 integration module
 */

pub mod commands;
pub mod encoding;
pub mod permit;
mod pool;
pub mod quoter;
pub mod swap;
pub mod transaction;
mod types;

pub use commands::{Action, Command};
pub use permit::Permit2Client;
pub use pool::PoolStateReader;
pub use quoter::{QuoteManager, QuoteSubscription};
pub use swap::SwapManager;
pub use transaction::TransactionBuilder;
pub use types::{PoolId, PoolKey, MAX_TICK, MIN_TICK, NATIVE_CURRENCY};

// Base mainnet deployments
pub const UNIVERSAL_ROUTER_ADDRESS: &str = "0x6ff5693b99212da76ad316178a184ab56d299b43";
pub const PERMIT2_ADDRESS: &str = "0x000000000022D473030F116dDEE9F6B43aC78BA3";
pub const V4_QUOTER_ADDRESS: &str = "0xfcB683b34bA4bF29cB9eCe8D805c68132b4D4cF3";
pub const STATE_VIEW_ADDRESS: &str = "0xa3c0c9b65bad0b08107aa264b0f3db444b867a71";
pub const CONTENTMENT_COIN_ADDRESS: &str = "0x737b8F095E3c575a6Ae5FE1711AdB8F271E20269";
pub const CONTENTMENT_HOOK_ADDRESS: &str = "0x3aeC84f1789D494885728ae2A7cB6eea38A42844";

/// Builds `selector(signature) ++ abi.encode(args)`.
#[must_use]
pub(crate) fn encode_call(signature: &str, args: &[ethers::abi::Token]) -> ethers::types::Bytes {
    let selector = &ethers::utils::keccak256(signature.as_bytes())[0..4];
    let mut call_data = Vec::from(selector);
    call_data.extend_from_slice(&ethers::abi::encode(args));
    call_data.into()
}
