use serde::{Deserialize, Serialize};

/// Standard BingX response envelope: `{code, msg, data}` with `code == 0`
/// on success.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

/// USDT balance snapshot of the swap account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountBalance {
    pub total_balance: f64,
    pub available_balance: f64,
    pub margin_used: f64,
    pub unrealized_pnl: f64,
}

/// Raw per-asset balance row as the exchange reports it. All numbers arrive
/// as strings.
#[derive(Debug, Deserialize)]
pub struct RawBalance {
    #[serde(default)]
    pub asset: String,
    #[serde(default)]
    pub balance: Option<String>,
    #[serde(rename = "availableMargin", default)]
    pub available_margin: Option<String>,
    #[serde(default)]
    pub available: Option<String>,
    #[serde(rename = "usedMargin", default)]
    pub used_margin: Option<String>,
    #[serde(rename = "unrealizedProfit", default)]
    pub unrealized_profit: Option<String>,
}

impl RawBalance {
    pub fn into_balance(self) -> AccountBalance {
        AccountBalance {
            total_balance: parse_num(self.balance.as_deref()),
            available_balance: parse_num(
                self.available_margin.as_deref().or(self.available.as_deref()),
            ),
            margin_used: parse_num(self.used_margin.as_deref()),
            unrealized_pnl: parse_num(self.unrealized_profit.as_deref()),
        }
    }
}

/// An open position as reported by the exchange.
#[derive(Debug, Clone, Serialize)]
pub struct ExchangePosition {
    pub symbol: String,
    pub position_side: String,
    pub size: f64,
    pub entry_price: f64,
    pub unrealized_pnl: f64,
    pub leverage: f64,
}

#[derive(Debug, Deserialize)]
pub struct RawPosition {
    #[serde(default)]
    pub symbol: String,
    #[serde(rename = "positionSide", default)]
    pub position_side: String,
    #[serde(rename = "positionAmt", default)]
    pub position_amt: Option<String>,
    #[serde(rename = "avgPrice", default)]
    pub avg_price: Option<String>,
    #[serde(rename = "unrealizedProfit", default)]
    pub unrealized_profit: Option<String>,
    #[serde(default)]
    pub leverage: Option<f64>,
}

impl RawPosition {
    pub fn into_position(self) -> ExchangePosition {
        ExchangePosition {
            symbol: self.symbol,
            position_side: self.position_side,
            size: parse_num(self.position_amt.as_deref()),
            entry_price: parse_num(self.avg_price.as_deref()),
            unrealized_pnl: parse_num(self.unrealized_profit.as_deref()),
            leverage: self.leverage.unwrap_or(1.0),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawPrice {
    #[serde(default)]
    pub price: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawTicker {
    #[serde(rename = "lastPrice", default)]
    pub last_price: Option<String>,
}

/// Exchange-side status of a previously placed order.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderStatusInfo {
    #[serde(default)]
    pub status: String,
    #[serde(rename = "avgPrice", default)]
    pub avg_price: Option<String>,
}

impl OrderStatusInfo {
    pub fn fill_price(&self) -> Option<f64> {
        self.avg_price.as_deref().and_then(|s| s.parse().ok()).filter(|p: &f64| *p > 0.0)
    }
}

/// A working order on the exchange, as listed by the open-orders endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenOrder {
    #[serde(rename = "orderId", default)]
    pub order_id: Option<serde_json::Value>,
    #[serde(rename = "type", default)]
    pub order_type: String,
    #[serde(default)]
    pub symbol: String,
}

impl OpenOrder {
    pub fn is_stop_loss(&self) -> bool {
        matches!(self.order_type.as_str(), "STOP_MARKET" | "STOP")
    }

    pub fn is_take_profit(&self) -> bool {
        matches!(self.order_type.as_str(), "TAKE_PROFIT_MARKET" | "TAKE_PROFIT")
    }
}

#[derive(Debug, Deserialize)]
pub struct OpenOrdersData {
    #[serde(default)]
    pub orders: Vec<OpenOrder>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    StopMarket,
    TakeProfitMarket,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
            OrderType::StopMarket => "STOP_MARKET",
            OrderType::TakeProfitMarket => "TAKE_PROFIT_MARKET",
        }
    }
}

/// Parameters for placing an order on the swap API.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    /// LONG or SHORT for hedge mode.
    pub position_side: String,
    pub order_type: OrderType,
    pub quantity: f64,
    pub price: Option<f64>,
    /// Trigger price for STOP_MARKET / TAKE_PROFIT_MARKET orders.
    pub stop_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order_id: String,
    pub symbol: String,
    pub side: String,
    pub order_type: String,
}

fn parse_num(value: Option<&str>) -> f64 {
    value.and_then(|s| s.parse().ok()).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_balance_fallback_fields() {
        let raw: RawBalance = serde_json::from_str(
            r#"{"asset":"USDT","balance":"1000.5","available":"900.25","usedMargin":"50","unrealizedProfit":"-12.5"}"#,
        )
        .unwrap();
        let balance = raw.into_balance();
        assert_eq!(balance.total_balance, 1000.5);
        // availableMargin missing, falls back to available.
        assert_eq!(balance.available_balance, 900.25);
        assert_eq!(balance.margin_used, 50.0);
        assert_eq!(balance.unrealized_pnl, -12.5);
    }

    #[test]
    fn test_raw_position_parses_string_numbers() {
        let raw: RawPosition = serde_json::from_str(
            r#"{"symbol":"BTC-USDT","positionSide":"LONG","positionAmt":"0.5","avgPrice":"45000","unrealizedProfit":"120.5","leverage":6.0}"#,
        )
        .unwrap();
        let pos = raw.into_position();
        assert_eq!(pos.size, 0.5);
        assert_eq!(pos.entry_price, 45000.0);
        assert_eq!(pos.unrealized_pnl, 120.5);
    }

    #[test]
    fn test_open_order_classification() {
        let order: OpenOrder =
            serde_json::from_str(r#"{"orderId":123,"type":"STOP_MARKET","symbol":"BTC-USDT"}"#)
                .unwrap();
        assert!(order.is_stop_loss());
        assert!(!order.is_take_profit());
    }
}
