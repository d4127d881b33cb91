use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::bingx::auth::BingxAuth;
use crate::bingx::types::*;

#[derive(Debug, Error)]
pub enum BingxError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("BingX API error {code}: {msg}")]
    Api { code: i64, msg: String },
    #[error("unexpected response: {0}")]
    Malformed(String),
    #[error("API credentials not configured")]
    MissingCredentials,
}

type Result<T> = std::result::Result<T, BingxError>;

/// REST client for the BingX perpetual-swap API. Private endpoints sign the
/// sorted query string with HMAC-SHA256 and carry the key in `X-BX-APIKEY`.
pub struct BingxClient {
    client: Client,
    auth: Option<BingxAuth>,
    rest_url: String,
    recv_window: u64,
}

impl BingxClient {
    pub fn new(rest_url: String, auth: Option<BingxAuth>, recv_window: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to create HTTP client"),
            auth,
            rest_url,
            recv_window,
        }
    }

    fn auth(&self) -> Result<&BingxAuth> {
        self.auth.as_ref().ok_or(BingxError::MissingCredentials)
    }

    /// Latest traded price for a symbol (public endpoint).
    pub async fn ticker_price(&self, symbol: &str) -> Result<f64> {
        let url = format!(
            "{}/openApi/swap/v2/quote/price?symbol={}",
            self.rest_url,
            to_exchange_symbol(symbol)
        );

        let envelope: Envelope<RawPrice> = self.client.get(&url).send().await?.json().await?;
        let data = check(envelope)?;

        data.price
            .as_deref()
            .and_then(|p| p.parse::<f64>().ok())
            .filter(|p| *p > 0.0)
            .ok_or_else(|| BingxError::Malformed(format!("no price for {}", symbol)))
    }

    /// Last price from the 24h ticker endpoint (public). The webhook uses
    /// this to derive default entries for signals that carry none.
    pub async fn last_price(&self, symbol: &str) -> Result<f64> {
        let url = format!(
            "{}/openApi/swap/v2/quote/ticker?symbol={}",
            self.rest_url,
            to_exchange_symbol(symbol)
        );

        let envelope: Envelope<RawTicker> = self.client.get(&url).send().await?.json().await?;
        let data = check(envelope)?;

        data.last_price
            .as_deref()
            .and_then(|p| p.parse::<f64>().ok())
            .filter(|p| *p > 0.0)
            .ok_or_else(|| BingxError::Malformed(format!("no lastPrice for {}", symbol)))
    }

    /// USDT balance of the swap account.
    pub async fn account_balance(&self) -> Result<AccountBalance> {
        let envelope: Envelope<Vec<RawBalance>> =
            self.signed_get("/openApi/swap/v2/user/balance", vec![]).await?;
        let balances = check(envelope)?;

        balances
            .into_iter()
            .find(|b| b.asset == "USDT")
            .map(RawBalance::into_balance)
            .ok_or_else(|| BingxError::Malformed("USDT balance not found".to_string()))
    }

    /// All open positions; rows with zero size are dropped.
    pub async fn positions(&self) -> Result<Vec<ExchangePosition>> {
        let envelope: Envelope<Vec<RawPosition>> =
            self.signed_get("/openApi/swap/v2/user/positions", vec![]).await?;
        let raw = check(envelope)?;

        Ok(raw
            .into_iter()
            .map(RawPosition::into_position)
            .filter(|p| p.size != 0.0)
            .collect())
    }

    /// Status of a previously placed order.
    pub async fn order_status(&self, order_id: &str, symbol: &str) -> Result<OrderStatusInfo> {
        let envelope: Envelope<serde_json::Value> = self
            .signed_get(
                "/openApi/swap/v2/trade/order",
                vec![
                    ("orderId", order_id.to_string()),
                    ("symbol", to_exchange_symbol(symbol)),
                ],
            )
            .await?;
        let data = check(envelope)?;

        // The status payload is sometimes nested under an `order` key.
        let node = data.get("order").cloned().unwrap_or(data);
        serde_json::from_value(node)
            .map_err(|e| BingxError::Malformed(format!("order status: {}", e)))
    }

    /// Working orders for a symbol.
    pub async fn open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>> {
        let envelope: Envelope<OpenOrdersData> = self
            .signed_get(
                "/openApi/swap/v2/trade/openOrders",
                vec![("symbol", to_exchange_symbol(symbol))],
            )
            .await?;
        Ok(check(envelope)?.orders)
    }

    /// Place an order. Trigger orders (STOP_MARKET / TAKE_PROFIT_MARKET)
    /// carry a `stopPrice`; limit orders a `price`.
    pub async fn place_order(&self, request: &OrderRequest) -> Result<PlacedOrder> {
        let mut params = vec![
            ("symbol", to_exchange_symbol(&request.symbol)),
            ("side", request.side.as_str().to_string()),
            ("positionSide", request.position_side.clone()),
            ("type", request.order_type.as_str().to_string()),
            ("quantity", format_qty(request.quantity)),
        ];

        if let Some(price) = request.price {
            params.push(("price", price.to_string()));
        }
        if let Some(stop_price) = request.stop_price {
            params.push(("stopPrice", stop_price.to_string()));
            params.push(("timeInForce", "GTC".to_string()));
        }

        let data: serde_json::Value =
            check(self.signed_post("/openApi/swap/v2/trade/order", params).await?)?;

        // Order id arrives either at the top level or nested under `order`.
        let order_id = data
            .get("orderId")
            .or_else(|| data.get("order").and_then(|o| o.get("orderId")))
            .map(value_to_string)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BingxError::Malformed(format!("no orderId in {}", data)))?;

        Ok(PlacedOrder {
            order_id,
            symbol: request.symbol.clone(),
            side: request.side.as_str().to_string(),
            order_type: request.order_type.as_str().to_string(),
        })
    }

    /// Set leverage for one side of a symbol before placing orders on it.
    pub async fn set_leverage(&self, symbol: &str, side: &str, leverage: u32) -> Result<()> {
        let params = vec![
            ("symbol", to_exchange_symbol(symbol)),
            ("side", side.to_string()),
            ("leverage", leverage.to_string()),
        ];

        let _: serde_json::Value =
            check(self.signed_post("/openApi/swap/v2/trade/leverage", params).await?)?;
        Ok(())
    }

    async fn signed_get<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        mut params: Vec<(&str, String)>,
    ) -> Result<Envelope<T>> {
        let auth = self.auth()?;
        params.push(("timestamp", BingxAuth::get_timestamp().to_string()));
        params.push(("recvWindow", self.recv_window.to_string()));
        let query = auth.signed_query(params);

        let url = format!("{}{}?{}", self.rest_url, endpoint, query);
        debug!(endpoint, "signed GET");

        let response = self
            .client
            .get(&url)
            .header("X-BX-APIKEY", auth.get_api_key())
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    async fn signed_post(
        &self,
        endpoint: &str,
        mut params: Vec<(&str, String)>,
    ) -> Result<Envelope<serde_json::Value>> {
        let auth = self.auth()?;
        params.push(("timestamp", BingxAuth::get_timestamp().to_string()));
        params.push(("recvWindow", self.recv_window.to_string()));
        let body = auth.signed_query(params);

        let url = format!("{}{}", self.rest_url, endpoint);
        debug!(endpoint, "signed POST");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("X-BX-APIKEY", auth.get_api_key())
            .body(body)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }
}

fn check<T>(envelope: Envelope<T>) -> Result<T> {
    if envelope.code != 0 {
        return Err(BingxError::Api {
            code: envelope.code,
            msg: envelope.msg,
        });
    }
    envelope
        .data
        .ok_or_else(|| BingxError::Malformed("missing data field".to_string()))
}

fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// BingX swap symbols are hyphenated (`BTC-USDT`). Signals and rows may use
/// the compact `BTCUSDT` form; normalization is idempotent.
pub fn to_exchange_symbol(symbol: &str) -> String {
    let upper = symbol.trim().to_uppercase();
    if !upper.contains("USDT") {
        return upper;
    }
    upper.replace("USDT", "-USDT").replace("--", "-")
}

/// Compact symbol form used in database rows and chat messages.
pub fn to_plain_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase().replace("-USDT", "USDT")
}

fn format_qty(qty: f64) -> String {
    // Quantities are rounded to four decimals, enough for every USDT pair
    // step size the bot trades.
    format!("{:.4}", qty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_normalization() {
        assert_eq!(to_exchange_symbol("BTCUSDT"), "BTC-USDT");
        assert_eq!(to_exchange_symbol("BTC-USDT"), "BTC-USDT");
        assert_eq!(to_exchange_symbol("btcusdt"), "BTC-USDT");
        assert_eq!(to_exchange_symbol("ETHUSDT"), "ETH-USDT");
        assert_eq!(to_plain_symbol("BTC-USDT"), "BTCUSDT");
        assert_eq!(to_plain_symbol("BTCUSDT"), "BTCUSDT");
    }

    #[test]
    fn test_envelope_check() {
        let ok: Envelope<i32> = Envelope { code: 0, msg: String::new(), data: Some(42) };
        assert_eq!(check(ok).unwrap(), 42);

        let err: Envelope<i32> = Envelope {
            code: 100400,
            msg: "bad symbol".to_string(),
            data: None,
        };
        match check(err) {
            Err(BingxError::Api { code, msg }) => {
                assert_eq!(code, 100400);
                assert_eq!(msg, "bad symbol");
            }
            other => panic!("expected Api error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_qty_formatting() {
        assert_eq!(format_qty(0.123456), "0.1235");
        assert_eq!(format_qty(10.0), "10.0000");
    }
}
