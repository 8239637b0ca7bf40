/*
 * Prometheus counters for quotes, swaps and gas fallbacks
 */

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use crate::models::{Result, SwapError, TradeType};

pub struct Metrics {
    registry: Registry,
    quotes_total: IntCounterVec,
    swaps_total: IntCounterVec,
    gas_fallbacks_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new_custom(Some("contentment_swap".to_string()), None)
            .map_err(metrics_error)?;

        let quotes_total = IntCounterVec::new(
            Opts::new("quotes_total", "Quoter simulations by outcome"),
            &["outcome"],
        )
        .map_err(metrics_error)?;
        let swaps_total = IntCounterVec::new(
            Opts::new("swaps_total", "Swap attempts by side and outcome"),
            &["side", "outcome"],
        )
        .map_err(metrics_error)?;
        let gas_fallbacks_total = IntCounter::new(
            "gas_fallbacks_total",
            "Gas estimations replaced by the fallback ceiling",
        )
        .map_err(metrics_error)?;

        registry.register(Box::new(quotes_total.clone())).map_err(metrics_error)?;
        registry.register(Box::new(swaps_total.clone())).map_err(metrics_error)?;
        registry.register(Box::new(gas_fallbacks_total.clone())).map_err(metrics_error)?;

        Ok(Self {
            registry,
            quotes_total,
            swaps_total,
            gas_fallbacks_total,
        })
    }

    pub fn record_quote(&self, available: bool) {
        let outcome = if available { "ok" } else { "unavailable" };
        self.quotes_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_swap(&self, trade_type: TradeType, success: bool) {
        let side = match trade_type {
            TradeType::Buy => "buy",
            TradeType::Sell => "sell",
        };
        let outcome = if success { "success" } else { "failed" };
        self.swaps_total.with_label_values(&[side, outcome]).inc();
    }

    pub fn record_gas_fallback(&self) {
        self.gas_fallbacks_total.inc();
    }

    #[must_use]
    pub fn gas_fallbacks(&self) -> u64 {
        self.gas_fallbacks_total.get()
    }

    /// Text exposition format.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;
        String::from_utf8(buffer).map_err(|e| SwapError::Unknown(format!("Metrics are not UTF-8: {e}")))
    }
}

fn metrics_error(e: prometheus::Error) -> SwapError {
    SwapError::Unknown(format!("Metrics error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_recorded_counters() {
        let metrics = Metrics::new().unwrap();
        metrics.record_quote(true);
        metrics.record_quote(false);
        metrics.record_swap(TradeType::Sell, false);
        metrics.record_gas_fallback();

        let text = metrics.render().unwrap();
        assert!(text.contains("contentment_swap_quotes_total{outcome=\"ok\"} 1"));
        assert!(text.contains("contentment_swap_swaps_total{outcome=\"failed\",side=\"sell\"} 1"));
        assert_eq!(metrics.gas_fallbacks(), 1);
    }
}
