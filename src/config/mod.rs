/*
 * Configuration management for the swap service
 */

use crate::dex::uniswap_v4::{self, PoolKey};
use crate::models::{Result, SwapError};
use crate::utils::{DEFAULT_DEADLINE_MINUTES, DEFAULT_GAS_BUFFER_PERCENT, DEFAULT_SLIPPAGE_PERCENT};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

pub const BASE_CHAIN_ID: u64 = 8453;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub chain: ChainConfig,
    pub contracts: ContractsConfig,
    pub pool: PoolConfig,
    pub trading: TradingConfig,
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_json: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    /// Shown to users when the wallet is on another network.
    pub name: String,
    pub receipt_poll_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContractsConfig {
    pub universal_router: Address,
    pub permit2: Address,
    pub v4_quoter: Address,
    pub state_view: Address,
    pub token: Address,
    pub hook: Address,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    pub fee: u32,
    pub tick_spacing: i32,
    pub token_decimals: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TradingConfig {
    pub default_slippage_percent: u32,
    pub gas_buffer_percent: u32,
    pub fallback_gas_limit: u64,
    pub deadline_minutes: u64,
    pub permit_expiry_minutes: u64,
    pub quote_interval_ms: u64,
    pub price_feed_url: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WalletConfig {
    /// Hex private key used by the execute endpoint. Never serialized back out.
    #[serde(skip_serializing)]
    pub private_key: Option<String>,
}

impl Config {
    /// Deployment defaults for the Contentment pool on Base.
    pub fn base_mainnet(rpc_url: impl Into<String>) -> Result<Self> {
        Ok(Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                log_level: "info".to_string(),
                log_json: false,
            },
            chain: ChainConfig {
                rpc_url: rpc_url.into(),
                chain_id: BASE_CHAIN_ID,
                name: "Base".to_string(),
                receipt_poll_interval_ms: 2_000,
            },
            contracts: ContractsConfig {
                universal_router: parse_address("UNIVERSAL_ROUTER", uniswap_v4::UNIVERSAL_ROUTER_ADDRESS)?,
                permit2: parse_address("PERMIT2", uniswap_v4::PERMIT2_ADDRESS)?,
                v4_quoter: parse_address("V4_QUOTER", uniswap_v4::V4_QUOTER_ADDRESS)?,
                state_view: parse_address("STATE_VIEW", uniswap_v4::STATE_VIEW_ADDRESS)?,
                token: parse_address("TOKEN", uniswap_v4::CONTENTMENT_COIN_ADDRESS)?,
                hook: parse_address("HOOK", uniswap_v4::CONTENTMENT_HOOK_ADDRESS)?,
            },
            pool: PoolConfig {
                fee: 0,
                tick_spacing: 60,
                token_decimals: 18,
            },
            trading: TradingConfig {
                default_slippage_percent: DEFAULT_SLIPPAGE_PERCENT,
                gas_buffer_percent: DEFAULT_GAS_BUFFER_PERCENT,
                fallback_gas_limit: 3_000_000,
                deadline_minutes: DEFAULT_DEADLINE_MINUTES,
                permit_expiry_minutes: 10,
                quote_interval_ms: 5_000,
                price_feed_url: "https://api.coinbase.com".to_string(),
            },
            wallet: WalletConfig::default(),
        })
    }

    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let rpc_url = env::var("BASE_RPC_URL")
            .map_err(|_| SwapError::Config("BASE_RPC_URL not set".to_string()))?;
        let mut config = Self::base_mainnet(rpc_url)?;

        config.server.host = env::var("SERVER_HOST").unwrap_or(config.server.host);
        config.server.port = env_parse("SERVER_PORT", config.server.port)?;
        config.server.log_level = env::var("LOG_LEVEL").unwrap_or(config.server.log_level);
        config.server.log_json = env::var("LOG_FORMAT")
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        config.chain.chain_id = env_parse("CHAIN_ID", config.chain.chain_id)?;
        config.chain.name = env::var("CHAIN_NAME").unwrap_or(config.chain.name);

        if let Ok(router) = env::var("UNIVERSAL_ROUTER_ADDRESS") {
            config.contracts.universal_router = parse_address("UNIVERSAL_ROUTER_ADDRESS", &router)?;
        }
        if let Ok(quoter) = env::var("V4_QUOTER_ADDRESS") {
            config.contracts.v4_quoter = parse_address("V4_QUOTER_ADDRESS", &quoter)?;
        }
        if let Ok(token) = env::var("TOKEN_ADDRESS") {
            config.contracts.token = parse_address("TOKEN_ADDRESS", &token)?;
        }
        if let Ok(hook) = env::var("HOOK_ADDRESS") {
            config.contracts.hook = parse_address("HOOK_ADDRESS", &hook)?;
        }

        config.trading.default_slippage_percent =
            env_parse("DEFAULT_SLIPPAGE_PERCENT", config.trading.default_slippage_percent)?;
        config.trading.quote_interval_ms = env_parse("QUOTE_INTERVAL_MS", config.trading.quote_interval_ms)?;
        config.trading.price_feed_url = env::var("PRICE_FEED_URL").unwrap_or(config.trading.price_feed_url);

        config.wallet.private_key = env::var("PRIVATE_KEY").ok().filter(|key| !key.is_empty());

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.trading.default_slippage_percent > 100 {
            return Err(SwapError::Config(format!(
                "DEFAULT_SLIPPAGE_PERCENT must be within 0..=100, got {}",
                self.trading.default_slippage_percent
            )));
        }
        if self.contracts.token.is_zero() {
            return Err(SwapError::Config("Token address must not be zero".to_string()));
        }
        if self.trading.quote_interval_ms == 0 {
            return Err(SwapError::Config("QUOTE_INTERVAL_MS must be positive".to_string()));
        }
        Ok(())
    }

    /// The fixed ETH/token pool this deployment trades against.
    #[must_use]
    pub fn pool_key(&self) -> PoolKey {
        PoolKey::native_pair(
            self.contracts.token,
            self.pool.fee,
            self.pool.tick_spacing,
            self.contracts.hook,
        )
    }
}

fn parse_address(name: &str, value: &str) -> Result<Address> {
    Address::from_str(value.trim())
        .map_err(|e| SwapError::Config(format!("Invalid {name} address {value}: {e}")))
}

fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| SwapError::Config(format!("Invalid {name}: {e}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_defaults_describe_the_contentment_pool() {
        let config = Config::base_mainnet("http://localhost:8545").unwrap();
        assert_eq!(config.chain.chain_id, BASE_CHAIN_ID);
        assert_eq!(config.trading.fallback_gas_limit, 3_000_000);
        assert_eq!(config.trading.permit_expiry_minutes, 10);
        config.validate().unwrap();

        let key = config.pool_key();
        assert!(key.currency0.is_zero());
        assert_eq!(key.currency1, config.contracts.token);
        assert_eq!(key.tick_spacing, 60);
        assert_eq!(key.hooks, config.contracts.hook);
    }

    #[test]
    fn rejects_out_of_range_slippage() {
        let mut config = Config::base_mainnet("http://localhost:8545").unwrap();
        config.trading.default_slippage_percent = 101;
        assert!(matches!(config.validate(), Err(SwapError::Config(_))));
    }

    #[test]
    fn private_key_is_not_serialized() {
        let mut config = Config::base_mainnet("http://localhost:8545").unwrap();
        config.wallet.private_key = Some("0xdeadbeef".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("deadbeef"));
    }
}
