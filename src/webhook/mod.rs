use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::bingx::client::{to_exchange_symbol, to_plain_symbol};
use crate::bingx::BingxClient;
use crate::config::{Config, TradingConfig};
use crate::signal::{
    self, PriceToken, ResolvedPrices, Side, SignalError, SignalKind, StopLossField,
};
use crate::storage::{NewSignal, Store};
use crate::telegram::TelegramNotifier;

/// Shared state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Store,
    pub bingx: Arc<BingxClient>,
    pub telegram: Arc<TelegramNotifier>,
    /// Client for the webhook -> import forward call.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        store: Store,
        bingx: Arc<BingxClient>,
        telegram: Arc<TelegramNotifier>,
    ) -> Self {
        Self {
            config,
            store,
            bingx,
            telegram,
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/api/signals/import", post(handle_import))
        .route("/api/orders/limit", get(handle_limit_orders))
        .route("/api/watchlist", get(handle_watchlist_list).post(handle_watchlist_add))
        .route("/health", get(handle_health))
        .with_state(state)
}

/// Bind and serve the ingest API.
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        state.config.server.bind_addr, state.config.server.port
    )
    .parse()?;

    let app = router(state);
    info!(%addr, "Starting webhook server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error(transparent)]
    Signal(#[from] SignalError),
    #[error("Could not fetch market price for {symbol}: {detail}")]
    MarketPrice { symbol: String, detail: String },
    #[error("{0}")]
    Internal(String),
}

impl WebhookError {
    fn status(&self) -> StatusCode {
        match self {
            WebhookError::Signal(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Incoming webhook payload. Indicator tools send a superset of these
/// fields depending on the alert type; unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignalPayload {
    pub symbol: Option<String>,
    pub side: Option<String>,
    #[serde(rename = "type")]
    pub signal_type: Option<String>,
    pub leverage: Option<u32>,
    pub entries: Option<Vec<PriceToken>>,
    pub targets: Option<Vec<PriceToken>>,
    pub stop_loss: Option<StopLossField>,
    pub external_signal_id: Option<String>,
    pub confidence_score: Option<f64>,
    pub notes: Option<String>,
    pub risk_reward_ratio: Option<f64>,

    // Indicator metadata, echoed into alert text.
    pub entry: Option<Value>,
    pub levels: Option<String>,
    pub prices: Option<String>,
    pub cross_bars_ago: Option<Value>,
    pub t3_distance: Option<Value>,
    pub t3_lines: Option<Value>,
    pub candle_size: Option<Value>,
    pub distance_to_t3: Option<Value>,
    pub candle_position: Option<Value>,
    pub distance_to_trend_start: Option<Value>,
}

/// Presence validation. Trading signals (entries + targets in the body)
/// only need symbol and side; anything else must also name its type.
pub fn validate_required(payload: &SignalPayload) -> Result<(), SignalError> {
    let is_trading = payload.entries.is_some() && payload.targets.is_some();

    let mut missing = Vec::new();
    if payload.symbol.is_none() {
        missing.push("symbol".to_string());
    }
    if payload.side.is_none() {
        missing.push("side".to_string());
    }
    if !is_trading && payload.signal_type.is_none() {
        missing.push("type".to_string());
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SignalError::MissingFields(missing))
    }
}

/// Classify the payload; an absent type means a generic trading signal.
pub fn classify(payload: &SignalPayload) -> Result<SignalKind, SignalError> {
    match payload.signal_type.as_deref() {
        Some(raw) => SignalKind::parse(raw),
        None => Ok(SignalKind::TradingSignal),
    }
}

/// A normalized trading signal with every price resolved to an absolute
/// value. `raw_*` keep the original tokens for the import forward call.
#[derive(Debug, Clone)]
pub struct TradingPlan {
    pub symbol: String,
    pub side: Side,
    pub leverage: u32,
    pub raw_entries: Vec<PriceToken>,
    pub raw_targets: Vec<PriceToken>,
    pub raw_stop_loss: PriceToken,
    pub resolved: ResolvedPrices,
}

/// Normalize a trading-signal payload, applying the documented defaults:
/// leverage 6, entries derived from the market price, targets 2%, stop 5%.
/// `market_price` is only consulted when the payload carries no entries.
pub fn build_trading_plan(
    payload: &SignalPayload,
    market_price: Option<f64>,
    trading: &TradingConfig,
) -> Result<TradingPlan, WebhookError> {
    let symbol = payload
        .symbol
        .as_deref()
        .ok_or_else(|| SignalError::MissingFields(vec!["symbol".to_string()]))?
        .trim()
        .to_uppercase();
    let side = Side::parse(
        payload
            .side
            .as_deref()
            .ok_or_else(|| SignalError::MissingFields(vec!["side".to_string()]))?,
    )?;

    let leverage = payload.leverage.unwrap_or(trading.default_leverage);

    let raw_entries = match &payload.entries {
        Some(entries) if !entries.is_empty() => entries.clone(),
        _ => {
            let price = market_price.ok_or_else(|| WebhookError::MarketPrice {
                symbol: symbol.clone(),
                detail: "no market price available".to_string(),
            })?;
            signal::default_entries(price, side, trading.entry_spread_pct)
                .into_iter()
                .map(PriceToken::Price)
                .collect()
        }
    };

    let raw_targets = match &payload.targets {
        Some(targets) if !targets.is_empty() => targets.clone(),
        _ => vec![PriceToken::Text(format!("{}%", trading.default_target_pct))],
    };

    let raw_stop_loss = payload
        .stop_loss
        .as_ref()
        .and_then(|sl| sl.first().cloned())
        .unwrap_or_else(|| PriceToken::Text(format!("{}%", trading.default_stop_loss_pct)));

    let resolved = signal::resolve_prices(
        &raw_entries,
        &raw_targets,
        Some(&raw_stop_loss),
        side,
        trading.default_stop_loss_pct,
    );

    Ok(TradingPlan {
        symbol,
        side,
        leverage,
        raw_entries,
        raw_targets,
        raw_stop_loss,
        resolved,
    })
}

fn processed_data(plan: &TradingPlan) -> Value {
    json!({
        "symbol": plan.symbol,
        "side": plan.side.as_str(),
        "leverage": plan.leverage,
        "entries": {
            "entry_market": plan.resolved.entries[0],
            "entry_2": plan.resolved.entries[1],
            "entry_3": plan.resolved.entries[2],
        },
        "targets": {
            "take_profit_1": plan.resolved.take_profits[0],
            "take_profit_2": plan.resolved.take_profits[1],
            "take_profit_3": plan.resolved.take_profits[2],
            "take_profit_4": plan.resolved.take_profits[3],
            "take_profit_5": plan.resolved.take_profits[4],
        },
        "stop_loss": plan.resolved.stop_loss,
        "source": "Webhook Import",
    })
}

async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "ok", "time": Utc::now().to_rfc3339() }))
}

async fn handle_webhook(State(state): State<AppState>, Json(raw): Json<Value>) -> Response {
    match process_webhook(&state, &raw).await {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => {
            warn!("Webhook processing failed: {}", err);
            // Error alerts go to the admin channel; delivery failures are
            // already folded into the record.
            let _ = state.telegram.notify_error("webhook", &err.to_string()).await;

            let body = json!({
                "success": false,
                "error": err.to_string(),
                "debug_info": {
                    "timestamp": Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                    "input_data": raw,
                }
            });
            (err.status(), Json(body)).into_response()
        }
    }
}

async fn process_webhook(state: &AppState, raw: &Value) -> Result<Value, WebhookError> {
    let payload: SignalPayload = serde_json::from_value(raw.clone())
        .map_err(|e| SignalError::Invalid(format!("invalid payload: {}", e)))?;

    validate_required(&payload)?;
    let kind = classify(&payload)?;

    let symbol = payload.symbol.clone().unwrap_or_default();
    let side = Side::parse(payload.side.as_deref().unwrap_or_default())?;
    info!(symbol = %symbol, side = %side, kind = kind.as_str(), "Processing signal");

    match kind {
        SignalKind::Fvg | SignalKind::FvgTouch | SignalKind::LnlSignal => {
            let delivery = state
                .telegram
                .fvg_alert(
                    &symbol,
                    side,
                    kind,
                    &text(&payload.entry),
                    &text(&payload.cross_bars_ago),
                    &text(&payload.t3_distance),
                    &text(&payload.t3_lines),
                )
                .await;

            Ok(json!({
                "success": true,
                "symbol": symbol,
                "message": "FVG signal successfully processed",
                "status": "NEW",
                "telegram_sent": delivery.ok,
            }))
        }

        SignalKind::T3Ssl => {
            let delivery = state
                .telegram
                .baseline_alert(&symbol, side, &text(&payload.entry))
                .await;

            Ok(json!({
                "success": true,
                "message": "Baseline Hit notification sent",
                "type": kind.as_str(),
                "telegram_sent": delivery.ok,
            }))
        }

        SignalKind::TriggerCross => {
            let mut missing = Vec::new();
            if payload.levels.is_none() {
                missing.push("levels".to_string());
            }
            if payload.prices.is_none() {
                missing.push("prices".to_string());
            }
            if !missing.is_empty() {
                return Err(SignalError::MissingFields(missing).into());
            }

            let _ = state
                .telegram
                .hit_cross_alert(
                    &symbol,
                    side,
                    payload.levels.as_deref().unwrap_or_default(),
                    payload.prices.as_deref().unwrap_or_default(),
                )
                .await;

            process_trading_signal(state, &payload).await
        }

        SignalKind::IchimokuBeforeCross | SignalKind::IchimokuAfterCross => {
            let _ = state
                .telegram
                .ichimoku_alert(&symbol, side, &text(&payload.entry), kind)
                .await;

            process_trading_signal(state, &payload).await
        }

        SignalKind::InTrend | SignalKind::UpTrend => {
            let required = [
                ("entry", payload.entry.is_some()),
                ("candle_size", payload.candle_size.is_some()),
                ("distance_to_t3", payload.distance_to_t3.is_some()),
                ("candle_position", payload.candle_position.is_some()),
                ("distance_to_trend_start", payload.distance_to_trend_start.is_some()),
            ];
            let missing: Vec<String> = required
                .iter()
                .filter(|(_, present)| !present)
                .map(|(name, _)| name.to_string())
                .collect();
            if !missing.is_empty() {
                return Err(SignalError::MissingFields(missing).into());
            }

            let _ = state
                .telegram
                .adaptive_alert(
                    kind,
                    &symbol,
                    side,
                    &text(&payload.entry),
                    &text(&payload.candle_size),
                    &text(&payload.distance_to_t3),
                    &text(&payload.candle_position),
                    &text(&payload.distance_to_trend_start),
                )
                .await;

            process_trading_signal(state, &payload).await
        }

        SignalKind::TradingSignal => process_trading_signal(state, &payload).await,
    }
}

async fn process_trading_signal(
    state: &AppState,
    payload: &SignalPayload,
) -> Result<Value, WebhookError> {
    // Only hit the ticker endpoint when the signal carries no entries.
    let market_price = if payload.entries.as_ref().map_or(true, |e| e.is_empty()) {
        let symbol = payload.symbol.as_deref().unwrap_or_default();
        Some(
            state
                .bingx
                .last_price(symbol)
                .await
                .map_err(|e| WebhookError::MarketPrice {
                    symbol: symbol.to_string(),
                    detail: e.to_string(),
                })?,
        )
    } else {
        None
    };

    let plan = build_trading_plan(payload, market_price, &state.config.trading)?;

    // Forward the raw tokens to the import endpoint. Fire-and-forget: a
    // failure is reported in the response but does not abort the request.
    let api_response = export_signal(state, payload, &plan).await;
    let signal_id = api_response.get("signal_id").cloned().unwrap_or(Value::Null);

    let _ = state
        .telegram
        .trading_signal_alert(&plan.symbol, plan.side, &plan.resolved, plan.leverage)
        .await;

    Ok(json!({
        "success": true,
        "signal_id": signal_id,
        "message": "Trading signal processed successfully",
        "api_response": api_response,
        "processed_data": processed_data(&plan),
    }))
}

/// POST the normalized signal to the import endpoint, folding any failure
/// into a `{success: false, ...}` record.
async fn export_signal(state: &AppState, payload: &SignalPayload, plan: &TradingPlan) -> Value {
    let mut body = json!({
        "symbol": plan.symbol,
        "side": plan.side.as_str(),
        "leverage": plan.leverage,
        "entries": plan.raw_entries,
        "targets": plan.raw_targets,
        "stop_loss": [plan.raw_stop_loss],
    });
    if let Some(id) = &payload.external_signal_id {
        body["external_signal_id"] = json!(id);
    }
    if let Some(score) = payload.confidence_score {
        body["confidence_score"] = json!(score);
    }
    if let Some(notes) = &payload.notes {
        body["notes"] = json!(notes);
    }
    if let Some(rrr) = payload.risk_reward_ratio {
        body["risk_reward_ratio"] = json!(rrr);
    }

    let url = state.config.signal_import_url();
    let result = async {
        let response = state.http.post(&url).json(&body).send().await?;
        let status = response.status();
        let value: Value = response.json().await?;
        if !status.is_success() || !value["success"].as_bool().unwrap_or(false) {
            anyhow::bail!(
                "import API returned error: {}",
                value["error"].as_str().unwrap_or("unknown")
            );
        }
        Ok::<Value, anyhow::Error>(value)
    }
    .await;

    match result {
        Ok(value) => value,
        Err(e) => {
            warn!("Signal export failed: {}", e);
            json!({
                "success": false,
                "error": format!("API export failed: {}", e),
                "message": "Signal processed but API export failed",
            })
        }
    }
}

/// Body of the internal import endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportRequest {
    pub symbol: String,
    pub side: String,
    pub leverage: i64,
    pub entries: Vec<PriceToken>,
    pub targets: Vec<PriceToken>,
    pub stop_loss: StopLossField,
    pub external_signal_id: Option<String>,
    pub confidence_score: Option<f64>,
    pub notes: Option<String>,
    pub risk_reward_ratio: Option<f64>,
}

/// Boundary validation of an import request. The import endpoint is strict:
/// no side synonyms, hard caps on array sizes and leverage.
pub fn validate_import(request: &ImportRequest) -> Result<Side, SignalError> {
    let side = match request.side.trim().to_uppercase().as_str() {
        "LONG" => Side::Long,
        "SHORT" => Side::Short,
        other => return Err(SignalError::InvalidSide(other.to_string())),
    };

    if request.entries.is_empty() {
        return Err(SignalError::Invalid(
            "Field 'entries' must be a non-empty array".to_string(),
        ));
    }
    if request.entries.len() > signal::MAX_ENTRIES {
        return Err(SignalError::Invalid("Maximum 3 entries allowed".to_string()));
    }
    if request.targets.is_empty() {
        return Err(SignalError::Invalid(
            "Field 'targets' must be a non-empty array".to_string(),
        ));
    }
    if request.targets.len() > signal::MAX_TARGETS {
        return Err(SignalError::Invalid("Maximum 5 targets allowed".to_string()));
    }
    if !(1..=100).contains(&request.leverage) {
        return Err(SignalError::Invalid(
            "Leverage must be between 1 and 100".to_string(),
        ));
    }

    Ok(side)
}

async fn handle_import(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> Response {
    match import_signal(&state, &request).await {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => {
            warn!("Signal import failed: {}", err);
            let body = json!({
                "success": false,
                "error": err.to_string(),
                "debug": {
                    "symbol": request.symbol,
                    "side": request.side,
                }
            });
            (StatusCode::BAD_REQUEST, Json(body)).into_response()
        }
    }
}

async fn import_signal(state: &AppState, request: &ImportRequest) -> Result<Value, WebhookError> {
    let side = validate_import(request)?;
    let symbol = request.symbol.trim().to_uppercase();

    let resolved = signal::resolve_prices(
        &request.entries,
        &request.targets,
        request.stop_loss.first(),
        side,
        state.config.trading.default_stop_loss_pct,
    );

    let new_signal = NewSignal {
        symbol: to_plain_symbol(&symbol),
        side: side.as_str().to_string(),
        entry_market_price: resolved.entries[0],
        entry_2: resolved.entries[1],
        entry_3: resolved.entries[2],
        take_profits: resolved.take_profits,
        stop_loss: Some(resolved.stop_loss),
        leverage: request.leverage,
        source_name: "JSON Import".to_string(),
        external_signal_id: request.external_signal_id.clone(),
        confidence_score: request.confidence_score.unwrap_or(0.0),
        notes: request.notes.clone(),
        risk_reward_ratio: request.risk_reward_ratio.unwrap_or(0.0),
        auto_created: true,
    };

    let signal_id = state
        .store
        .insert_signal(&new_signal)
        .await
        .map_err(|e| WebhookError::Internal(format!("Failed to save signal: {}", e)))?;

    info!(signal_id, symbol = %new_signal.symbol, "Signal imported");

    Ok(json!({
        "success": true,
        "signal_id": signal_id,
        "message": "Signal imported successfully",
        "processed_data": {
            "symbol": new_signal.symbol,
            "side": new_signal.side,
            "leverage": new_signal.leverage,
            "entries": {
                "entry_market": resolved.entries[0],
                "entry_2": resolved.entries[1],
                "entry_3": resolved.entries[2],
            },
            "targets": {
                "take_profit_1": resolved.take_profits[0],
                "take_profit_2": resolved.take_profits[1],
                "take_profit_3": resolved.take_profits[2],
                "take_profit_4": resolved.take_profits[3],
                "take_profit_5": resolved.take_profits[4],
            },
            "stop_loss": resolved.stop_loss,
            "source": "JSON Import",
        }
    }))
}

/// Pending limit orders annotated with live prices and entry progress, for
/// the dashboard widget poll.
async fn handle_limit_orders(State(state): State<AppState>) -> Response {
    let orders = match state.store.pending_limit_orders().await {
        Ok(orders) => orders,
        Err(e) => {
            let body = json!({ "success": false, "error": e.to_string() });
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
        }
    };

    let mut price_cache: HashMap<String, Option<f64>> = HashMap::new();
    let mut data = Vec::with_capacity(orders.len());

    for order in &orders {
        let key = to_exchange_symbol(&order.symbol);
        let current_price = match price_cache.get(&key) {
            Some(cached) => *cached,
            None => {
                let fetched = state.bingx.ticker_price(&order.symbol).await.ok();
                price_cache.insert(key, fetched);
                fetched
            }
        };

        let entry_price = order.price.unwrap_or(0.0);
        let mut item = json!({
            "id": order.id,
            "symbol": order.symbol,
            "side": order.side,
            "entry_price": entry_price,
            "quantity": order.quantity,
            "leverage": order.leverage,
            "status": order.status,
            "created_at": order.created_at.to_rfc3339(),
        });

        match current_price {
            Some(price) => {
                let distance_pct = if price > 0.0 {
                    (entry_price - price) / price * 100.0
                } else {
                    0.0
                };
                item["price_status"] = json!("success");
                item["current_price"] = json!(price);
                item["distance_pct"] = json!(distance_pct);
                item["progress"] = json!(signal::entry_progress(price, entry_price));
            }
            None => {
                item["price_status"] = json!("error");
                item["current_price"] = Value::Null;
            }
        }

        data.push(item);
    }

    (StatusCode::OK, Json(json!({ "success": true, "data": data }))).into_response()
}

/// Body for adding a watchlist item (a pending price alert).
#[derive(Debug, Clone, Deserialize)]
pub struct WatchlistRequest {
    pub symbol: String,
    pub entry_price: f64,
    #[serde(default = "default_entry_type")]
    pub entry_type: String,
    pub direction: String,
    #[serde(default)]
    pub margin_amount: f64,
    pub initial_price: Option<f64>,
}

fn default_entry_type() -> String {
    "limit".to_string()
}

async fn handle_watchlist_add(
    State(state): State<AppState>,
    Json(request): Json<WatchlistRequest>,
) -> Response {
    let side = match Side::parse(&request.direction) {
        Ok(side) => side,
        Err(e) => {
            let body = json!({ "success": false, "error": e.to_string() });
            return (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response();
        }
    };
    if request.entry_price <= 0.0 {
        let body = json!({ "success": false, "error": "entry_price must be positive" });
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response();
    }

    let direction = side.as_str().to_lowercase();
    match state
        .store
        .insert_watchlist_item(
            &request.symbol.trim().to_uppercase(),
            request.entry_price,
            &request.entry_type,
            &direction,
            request.margin_amount,
            request.initial_price,
        )
        .await
    {
        Ok(id) => {
            info!(id, symbol = %request.symbol, "Watchlist item added");
            (StatusCode::OK, Json(json!({ "success": true, "id": id }))).into_response()
        }
        Err(e) => {
            let body = json!({ "success": false, "error": e.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

async fn handle_watchlist_list(State(state): State<AppState>) -> Response {
    match state.store.active_watchlist().await {
        Ok(items) => {
            let data: Vec<Value> = items
                .iter()
                .map(|item| {
                    json!({
                        "id": item.id,
                        "symbol": item.symbol,
                        "entry_price": item.entry_price,
                        "entry_type": item.entry_type,
                        "direction": item.direction,
                        "margin_amount": item.margin_amount,
                        "status": item.status,
                        "created_at": item.created_at.to_rfc3339(),
                    })
                })
                .collect();
            (StatusCode::OK, Json(json!({ "success": true, "data": data }))).into_response()
        }
        Err(e) => {
            let body = json!({ "success": false, "error": e.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

fn text(value: &Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "N/A".to_string(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trading_payload() -> SignalPayload {
        SignalPayload {
            symbol: Some("BTCUSDT".to_string()),
            side: Some("long".to_string()),
            entries: Some(vec![
                PriceToken::Price(45000.0),
                PriceToken::Price(44500.0),
            ]),
            targets: Some(vec![
                PriceToken::Text("2%".to_string()),
                PriceToken::Text("4%".to_string()),
            ]),
            stop_loss: Some(StopLossField::Many(vec![PriceToken::Text("3%".to_string())])),
            ..Default::default()
        }
    }

    #[test]
    fn test_required_fields_for_trading_signal() {
        assert!(validate_required(&trading_payload()).is_ok());

        // Non-trading payloads need a type.
        let payload = SignalPayload {
            symbol: Some("BTCUSDT".to_string()),
            side: Some("LONG".to_string()),
            ..Default::default()
        };
        match validate_required(&payload) {
            Err(SignalError::MissingFields(fields)) => assert_eq!(fields, vec!["type"]),
            other => panic!("expected missing type, got {:?}", other),
        }
    }

    #[test]
    fn test_classification_defaults_to_trading() {
        assert_eq!(classify(&trading_payload()).unwrap(), SignalKind::TradingSignal);

        let mut payload = trading_payload();
        payload.signal_type = Some("FVG".to_string());
        assert_eq!(classify(&payload).unwrap(), SignalKind::Fvg);

        payload.signal_type = Some("NOT_A_TYPE".to_string());
        assert!(classify(&payload).is_err());
    }

    #[test]
    fn test_plan_resolves_percentage_prices() {
        let plan =
            build_trading_plan(&trading_payload(), None, &TradingConfig::default()).unwrap();

        assert_eq!(plan.symbol, "BTCUSDT");
        assert_eq!(plan.side, Side::Long);
        assert_eq!(plan.leverage, 6); // default
        assert!((plan.resolved.take_profits[0].unwrap() - 45900.0).abs() < 1e-6);
        assert!((plan.resolved.take_profits[1].unwrap() - 46800.0).abs() < 1e-6);
        assert!((plan.resolved.stop_loss - 43650.0).abs() < 1e-6);
    }

    #[test]
    fn test_plan_defaults_entries_from_market_price() {
        let payload = SignalPayload {
            symbol: Some("ETHUSDT".to_string()),
            side: Some("SHORT".to_string()),
            signal_type: Some("TRADING_SIGNAL".to_string()),
            ..Default::default()
        };

        let plan =
            build_trading_plan(&payload, Some(2000.0), &TradingConfig::default()).unwrap();

        // Market entry plus a 2% pullback entry (above market for shorts).
        assert_eq!(plan.resolved.entries[0], Some(2000.0));
        assert!((plan.resolved.entries[1].unwrap() - 2040.0).abs() < 1e-9);
        // Default target 2% down, default stop 5% up.
        assert!((plan.resolved.take_profits[0].unwrap() - 1960.0).abs() < 1e-9);
        assert!((plan.resolved.stop_loss - 2100.0).abs() < 1e-9);
    }

    #[test]
    fn test_plan_without_entries_or_price_fails() {
        let payload = SignalPayload {
            symbol: Some("ETHUSDT".to_string()),
            side: Some("LONG".to_string()),
            signal_type: Some("TRADING_SIGNAL".to_string()),
            ..Default::default()
        };
        let err = build_trading_plan(&payload, None, &TradingConfig::default()).unwrap_err();
        assert!(matches!(err, WebhookError::MarketPrice { .. }));
    }

    fn import_request() -> ImportRequest {
        ImportRequest {
            symbol: "BTCUSDT".to_string(),
            side: "LONG".to_string(),
            leverage: 6,
            entries: vec![PriceToken::Price(45000.0)],
            targets: vec![PriceToken::Text("2%".to_string())],
            stop_loss: StopLossField::One(PriceToken::Text("5%".to_string())),
            external_signal_id: None,
            confidence_score: None,
            notes: None,
            risk_reward_ratio: None,
        }
    }

    #[test]
    fn test_import_validation_bounds() {
        assert_eq!(validate_import(&import_request()).unwrap(), Side::Long);

        let mut request = import_request();
        request.side = "BUY".to_string(); // synonyms rejected at the import boundary
        assert!(validate_import(&request).is_err());

        let mut request = import_request();
        request.entries = vec![PriceToken::Price(1.0); 4];
        assert!(validate_import(&request).is_err());

        let mut request = import_request();
        request.targets = vec![PriceToken::Text("1%".to_string()); 6];
        assert!(validate_import(&request).is_err());

        let mut request = import_request();
        request.leverage = 0;
        assert!(validate_import(&request).is_err());
        request.leverage = 101;
        assert!(validate_import(&request).is_err());

        let mut request = import_request();
        request.entries = vec![];
        assert!(validate_import(&request).is_err());
    }

    #[test]
    fn test_payload_deserializes_mixed_tokens() {
        let payload: SignalPayload = serde_json::from_str(
            r#"{
                "symbol": "BTCUSDT",
                "side": "LONG",
                "entries": [45000, "44500"],
                "targets": ["2%", 46800],
                "stop_loss": "3%",
                "leverage": 10,
                "confidence_score": 7.5
            }"#,
        )
        .unwrap();

        assert_eq!(payload.leverage, Some(10));
        let entries = payload.entries.as_ref().unwrap();
        assert_eq!(entries[0].as_price(), 45000.0);
        assert_eq!(entries[1].as_price(), 44500.0);
        let stop = payload.stop_loss.as_ref().unwrap().first().unwrap();
        assert_eq!(stop.percentage(), Some(0.03));
    }
}
