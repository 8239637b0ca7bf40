/*
 * REST API for quotes, pool state and swaps
 */

use ethers::types::{Address, U256};
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{get, post, routes, State};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::error;

use crate::balance::Balances;
use crate::config::Config;
use crate::models::{
    EthPrice, PermitData, QuoteComparison, QuoteResult, SwapError, SwapResult, SwapTransaction, TradeType,
};
use crate::service::{PoolSnapshot, SwapService};
use crate::utils::format_amount;

pub struct ApiState {
    pub config: Config,
    pub swap_service: Arc<SwapService>,
}

type ApiResult<T> = std::result::Result<Json<T>, Custom<String>>;

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub amount_in: String,
    pub side: TradeType,
    pub quote: QuoteResult,
    pub amount_out_formatted: String,
}

#[derive(Debug, Deserialize)]
pub struct BuildSwapRequest {
    pub user: Address,
    pub amount_in: String,
    pub side: TradeType,
    /// Decimal wei. Quoted and slippage adjusted when absent.
    pub min_amount_out: Option<String>,
    pub slippage_percent: Option<u32>,
    pub permit: Option<PermitData>,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteSwapRequest {
    pub amount_in: String,
    pub side: TradeType,
    pub min_amount_out: Option<String>,
    pub slippage_percent: Option<u32>,
}

fn api_error(e: &SwapError) -> Custom<String> {
    let status = match e {
        SwapError::Validation(_) | SwapError::Format(_) => Status::BadRequest,
        SwapError::Quote(_) => Status::NotFound,
        SwapError::Config(_) => Status::Forbidden,
        SwapError::CexApi(_) | SwapError::Network(_) | SwapError::Rpc(_) | SwapError::Contract(_) => {
            Status::BadGateway
        }
        _ => Status::InternalServerError,
    };
    if status.code >= 500 {
        error!("API request failed: {e}");
    }
    Custom(status, e.to_string())
}

fn parse_side(side: Option<&str>) -> std::result::Result<TradeType, Custom<String>> {
    side.map_or(Ok(TradeType::Buy), |side| TradeType::from_str(side).map_err(|e| api_error(&e)))
}

fn parse_min_amount_out(raw: Option<&str>) -> std::result::Result<Option<U256>, Custom<String>> {
    raw.map(|value| {
        U256::from_dec_str(value.trim())
            .map_err(|e| api_error(&SwapError::Format(format!("Invalid min_amount_out {value}: {e}"))))
    })
    .transpose()
}

#[get("/health")]
pub async fn health_check() -> &'static str {
    "OK"
}

#[get("/metrics")]
pub async fn metrics(state: &State<ApiState>) -> std::result::Result<String, Custom<String>> {
    state.swap_service.metrics().render().map_err(|e| api_error(&e))
}

#[get("/api/v1/quote?<amount_in>&<side>")]
pub async fn get_quote(amount_in: String, side: Option<String>, state: &State<ApiState>) -> ApiResult<QuoteResponse> {
    let side = parse_side(side.as_deref())?;
    let quote = state
        .swap_service
        .get_quote(&amount_in, side)
        .await
        .ok_or_else(|| api_error(&SwapError::Quote(format!("No quote available for {amount_in}"))))?;

    Ok(Json(QuoteResponse {
        amount_out_formatted: format_amount(quote.amount_out),
        amount_in,
        side,
        quote,
    }))
}

#[get("/api/v1/quote/compare?<amount_in>")]
pub async fn compare_quotes(amount_in: String, state: &State<ApiState>) -> ApiResult<QuoteComparison> {
    state
        .swap_service
        .compare_quotes(&amount_in)
        .await
        .map(Json)
        .ok_or_else(|| api_error(&SwapError::Quote(format!("No quotes available for {amount_in}"))))
}

#[get("/api/v1/pool")]
pub async fn get_pool(state: &State<ApiState>) -> ApiResult<PoolSnapshot> {
    state.swap_service.pool_snapshot().await.map(Json).map_err(|e| api_error(&e))
}

#[get("/api/v1/balances/<owner>")]
pub async fn get_balances(owner: &str, state: &State<ApiState>) -> ApiResult<Balances> {
    let owner = Address::from_str(owner)
        .map_err(|e| api_error(&SwapError::Validation(format!("Invalid owner address {owner}: {e}"))))?;
    state.swap_service.balances(owner).await.map(Json).map_err(|e| api_error(&e))
}

#[get("/api/v1/eth-price")]
pub async fn get_eth_price(state: &State<ApiState>) -> ApiResult<EthPrice> {
    state.swap_service.eth_price().await.map(Json).map_err(|e| api_error(&e))
}

#[post("/api/v1/swap/build", format = "json", data = "<request>")]
pub async fn build_swap(request: Json<BuildSwapRequest>, state: &State<ApiState>) -> ApiResult<SwapTransaction> {
    let request = request.into_inner();
    let min_amount_out = parse_min_amount_out(request.min_amount_out.as_deref())?;
    let service = &state.swap_service;

    let params = service
        .prepare_params(&request.amount_in, request.side, min_amount_out, request.slippage_percent)
        .await
        .map_err(|e| api_error(&e))?;
    service
        .build_swap(&params, request.user, request.permit.as_ref())
        .await
        .map(Json)
        .map_err(|e| api_error(&e))
}

#[post("/api/v1/swap/execute", format = "json", data = "<request>")]
pub async fn execute_swap(request: Json<ExecuteSwapRequest>, state: &State<ApiState>) -> ApiResult<SwapResult> {
    let service = &state.swap_service;
    if !service.can_execute() {
        return Err(Custom(
            Status::Forbidden,
            "Swap execution is disabled: no signing key configured".to_string(),
        ));
    }

    let request = request.into_inner();
    let min_amount_out = parse_min_amount_out(request.min_amount_out.as_deref())?;
    let params = service
        .prepare_params(&request.amount_in, request.side, min_amount_out, request.slippage_percent)
        .await
        .map_err(|e| api_error(&e))?;
    service.execute_swap(&params).await.map(Json).map_err(|e| api_error(&e))
}

#[must_use]
pub fn create_rocket(state: ApiState) -> rocket::Rocket<rocket::Build> {
    let figment = rocket::Config::figment()
        .merge(("address", state.config.server.host.clone()))
        .merge(("port", state.config.server.port));

    rocket::custom(figment).manage(state).mount(
        "/",
        routes![
            health_check,
            metrics,
            get_quote,
            compare_quotes,
            get_pool,
            get_balances,
            get_eth_price,
            build_swap,
            execute_swap
        ],
    )
}
