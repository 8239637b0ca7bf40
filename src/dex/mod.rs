/*
 * DEX integrations
 */

pub mod uniswap_v4;
