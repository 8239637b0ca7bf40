/*
 * Reference ETH price from a centralized exchange
 */

mod coinbase;

use async_trait::async_trait;
use crate::models::{EthPrice, Result};

pub use coinbase::CoinbaseClient;

#[async_trait]
pub trait CexClient: Send + Sync {
    async fn get_spot_price(&self, base: &str, quote: &str) -> Result<EthPrice>;
}
