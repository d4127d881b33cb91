use std::sync::Arc;

use anyhow::Result;

use crate::bingx::types::{OrderRequest, OrderSide, OrderType};
use crate::bingx::BingxClient;
use crate::config::Config;
use crate::signal::Side;
use crate::storage::{NewOrder, Store};
use crate::telegram::TelegramNotifier;

pub mod balance_sync;
pub mod limit_order_monitor;
pub mod order_status;
pub mod position_sync;
pub mod price_monitor;
pub mod signal_automation;
pub mod sltp_guard;
pub mod target_monitor;

/// Everything a scheduled job needs: config, the store, the exchange client
/// and the notifier.
pub struct JobContext {
    pub config: Arc<Config>,
    pub store: Store,
    pub bingx: Arc<BingxClient>,
    pub telegram: Arc<TelegramNotifier>,
}

/// Run one job by its catalog name.
pub async fn run_job(name: &str, ctx: &JobContext) -> Result<()> {
    match name {
        balance_sync::NAME => balance_sync::run(ctx).await,
        position_sync::NAME => position_sync::run(ctx).await,
        price_monitor::NAME => price_monitor::run(ctx).await,
        order_status::NAME => order_status::run(ctx).await,
        limit_order_monitor::NAME => limit_order_monitor::run(ctx).await,
        target_monitor::NAME => target_monitor::run(ctx).await,
        sltp_guard::NAME => sltp_guard::run(ctx).await,
        signal_automation::NAME => signal_automation::run(ctx).await,
        other => anyhow::bail!("unknown job: {}", other),
    }
}

/// Base-asset quantity for a margin amount at the given leverage.
pub fn position_quantity(margin_usdt: f64, leverage: u32, price: f64) -> f64 {
    if price <= 0.0 {
        return 0.0;
    }
    margin_usdt * leverage as f64 / price
}

/// Place an order on the exchange and record it. In paper-trading mode the
/// exchange call is skipped and the row carries no exchange order id, which
/// keeps it out of the status-polling job.
pub async fn place_and_record(
    ctx: &JobContext,
    signal_id: Option<i64>,
    symbol: &str,
    side: Side,
    order_type: OrderType,
    quantity: f64,
    price: Option<f64>,
    leverage: u32,
) -> Result<i64> {
    let order_side = if side.is_long() {
        OrderSide::Buy
    } else {
        OrderSide::Sell
    };

    let exchange_order_id = if ctx.config.trading.paper_trading {
        None
    } else {
        let request = OrderRequest {
            symbol: symbol.to_string(),
            side: order_side,
            position_side: side.as_str().to_string(),
            order_type,
            quantity,
            price,
            stop_price: None,
        };
        Some(ctx.bingx.place_order(&request).await?.order_id)
    };

    let order = NewOrder {
        signal_id,
        exchange_order_id,
        symbol: symbol.to_string(),
        side: order_side.as_str().to_string(),
        position_side: side.as_str().to_string(),
        order_type: order_type.as_str().to_string(),
        quantity,
        price,
        leverage: leverage as i64,
        status: "NEW".to_string(),
    };

    ctx.store.insert_order(&order).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_quantity() {
        // $100 margin at 6x on a $600 asset buys one unit.
        assert!((position_quantity(100.0, 6, 600.0) - 1.0).abs() < 1e-9);
        assert_eq!(position_quantity(100.0, 6, 0.0), 0.0);
    }
}
