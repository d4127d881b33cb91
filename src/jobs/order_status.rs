use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::jobs::JobContext;
use crate::storage::{NewPosition, OrderRow};

pub const NAME: &str = "order-status";

/// Poll the exchange for status changes of pending orders. Fills create the
/// corresponding position row; cancellations just flip the status. Both send
/// a notification.
pub async fn run(ctx: &JobContext) -> Result<()> {
    let pending = ctx.store.pending_exchange_orders().await?;
    if pending.is_empty() {
        return Ok(());
    }
    info!(count = pending.len(), "Checking pending orders");

    let mut filled = 0;
    let mut cancelled = 0;

    for order in &pending {
        let Some(exchange_order_id) = order.exchange_order_id.as_deref() else {
            continue;
        };

        let status = match ctx.bingx.order_status(exchange_order_id, &order.symbol).await {
            Ok(status) => status,
            Err(e) => {
                warn!(order_id = order.id, "Failed to get order status: {}", e);
                continue;
            }
        };

        match status.status.as_str() {
            "FILLED" => {
                let fill_price = status.fill_price();
                if let Err(e) = ctx
                    .store
                    .update_order_status(order.id, "FILLED", fill_price, Some(Utc::now()))
                    .await
                {
                    warn!(order_id = order.id, "Failed to record fill: {}", e);
                    continue;
                }
                filled += 1;

                if order.order_type == "MARKET" {
                    if let Some(price) = fill_price {
                        if let Err(e) = create_position(ctx, order, price).await {
                            warn!(order_id = order.id, "Failed to create position: {}", e);
                        }
                    }
                }

                let _ = ctx
                    .telegram
                    .order_filled(
                        &order.symbol,
                        &order.side,
                        order.quantity,
                        fill_price.unwrap_or(0.0),
                        order.leverage,
                    )
                    .await;

                info!(order_id = order.id, symbol = %order.symbol, "Order filled");
            }
            "CANCELED" | "CANCELLED" => {
                if let Err(e) = ctx
                    .store
                    .update_order_status(order.id, "CANCELLED", None, None)
                    .await
                {
                    warn!(order_id = order.id, "Failed to record cancellation: {}", e);
                    continue;
                }
                cancelled += 1;

                let _ = ctx
                    .telegram
                    .order_cancelled(&order.symbol, &order.side, order.quantity, order.price)
                    .await;

                info!(order_id = order.id, symbol = %order.symbol, "Order cancelled");
            }
            _ => {}
        }
    }

    info!(filled, cancelled, "Order status check completed");
    Ok(())
}

async fn create_position(ctx: &JobContext, order: &OrderRow, fill_price: f64) -> Result<()> {
    // One OPEN position per originating signal.
    if let Some(signal_id) = order.signal_id {
        if ctx.store.open_position_for_signal(signal_id).await?.is_some() {
            return Ok(());
        }
    }

    // Pull SL/TP levels from the originating signal when there is one.
    let (stop_loss, take_profit) = match order.signal_id {
        Some(signal_id) => match ctx.store.signal(signal_id).await? {
            Some(signal) => (signal.stop_loss, signal.take_profit_1),
            None => (None, None),
        },
        None => (None, None),
    };

    let leverage = order.leverage.max(1) as f64;
    let position = NewPosition {
        signal_id: order.signal_id,
        symbol: order.symbol.clone(),
        side: order.position_side.clone(),
        size: order.quantity,
        entry_price: fill_price,
        leverage,
        margin_used: order.quantity * fill_price / leverage,
        stop_loss,
        take_profit,
    };

    let position_id = ctx.store.insert_position(&position).await?;
    info!(position_id, symbol = %order.symbol, "Position opened from fill");
    Ok(())
}
