/*
 * Contentment swap - Uniswap V4 swap layer for Base
 * Core library exports and module declarations
 */

pub mod api;
pub mod balance;
pub mod cex;
pub mod config;
pub mod dex;
pub mod metrics;
pub mod models;
pub mod rpc;
pub mod service;
pub mod utils;
pub mod wallet;

pub use config::Config;
pub use models::*;
pub use service::SwapService;
