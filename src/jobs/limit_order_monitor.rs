use std::collections::HashMap;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::bingx::types::OrderType;
use crate::jobs::{self, JobContext};
use crate::signal::Side;
use crate::storage::OrderRow;

pub const NAME: &str = "limit-order-monitor";

/// Price tolerance around the entry level, as a fraction (0.1%).
const ENTRY_TOLERANCE: f64 = 0.001;

/// Watch pending limit orders and act when the entry price is reached:
/// either execute at market (auto mode) or notify once for manual approval.
pub async fn run(ctx: &JobContext) -> Result<()> {
    if !ctx.config.trading.auto_trading_enabled {
        debug!("Auto trading disabled, skipping limit order monitor");
        return Ok(());
    }

    let pending = ctx.store.pending_limit_orders().await?;
    if pending.is_empty() {
        return Ok(());
    }
    info!(count = pending.len(), "Checking pending limit orders");

    let auto_execute = ctx.config.trading.limit_order_action == "auto_execute";
    let mut prices: HashMap<String, f64> = HashMap::new();

    for order in &pending {
        let Some(entry_price) = order.price.filter(|p| *p > 0.0) else {
            continue;
        };

        let current_price = match prices.get(&order.symbol) {
            Some(price) => *price,
            None => match ctx.bingx.ticker_price(&order.symbol).await {
                Ok(price) => {
                    prices.insert(order.symbol.clone(), price);
                    price
                }
                Err(e) => {
                    warn!(symbol = %order.symbol, "Could not get price: {}", e);
                    continue;
                }
            },
        };

        // Buy orders fill when the price drops to the level, sell orders
        // when it climbs to it, within a 0.1% tolerance band.
        let reached = if order.side == "BUY" {
            current_price <= entry_price * (1.0 + ENTRY_TOLERANCE)
        } else {
            current_price >= entry_price * (1.0 - ENTRY_TOLERANCE)
        };
        if !reached {
            continue;
        }

        info!(
            order_id = order.id,
            symbol = %order.symbol,
            entry = entry_price,
            current = current_price,
            "Entry price reached"
        );

        if auto_execute {
            if let Err(e) = execute_at_market(ctx, order, current_price).await {
                warn!(order_id = order.id, "Auto execution failed: {}", e);
                let _ = ctx
                    .telegram
                    .notify_error("limit-order-monitor", &e.to_string())
                    .await;
            }
        } else {
            let delivery = ctx
                .telegram
                .limit_order_ready(
                    &order.symbol,
                    &order.side,
                    entry_price,
                    current_price,
                    order.quantity,
                    order.leverage,
                )
                .await;
            if delivery.ok {
                // NOTIFIED is terminal for the monitor; no repeat alerts.
                ctx.store.mark_order_notified(order.id).await?;
            }
        }
    }

    Ok(())
}

async fn execute_at_market(ctx: &JobContext, order: &OrderRow, current_price: f64) -> Result<()> {
    let side = Side::parse(&order.position_side)?;

    let market_order_id = jobs::place_and_record(
        ctx,
        order.signal_id,
        &order.symbol,
        side,
        OrderType::Market,
        order.quantity,
        None,
        order.leverage.max(1) as u32,
    )
    .await?;

    ctx.store.mark_order_triggered(order.id, current_price).await?;

    let _ = ctx
        .telegram
        .auto_executed(
            &order.symbol,
            &order.side,
            order.price.unwrap_or(0.0),
            current_price,
            order.quantity,
            order.leverage,
        )
        .await;

    info!(
        order_id = order.id,
        market_order_id,
        symbol = %order.symbol,
        "Limit order executed at market"
    );
    Ok(())
}
