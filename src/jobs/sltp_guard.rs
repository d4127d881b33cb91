use anyhow::Result;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::bingx::types::{OrderRequest, OrderSide, OrderType};
use crate::jobs::JobContext;
use crate::signal::{self, Side};
use crate::storage::PositionRow;

pub const NAME: &str = "sltp-guard";

/// Fallback stop-loss distance when the originating signal carried none.
const DEFAULT_STOP_LOSS_PCT: f64 = 0.02;
/// Fallback take-profit distance when the originating signal carried none.
const DEFAULT_TAKE_PROFIT_PCT: f64 = 0.05;

/// Ensure every open position is protected by exchange-native stop-loss and
/// take-profit trigger orders, creating whichever is missing.
pub async fn run(ctx: &JobContext) -> Result<()> {
    if ctx.config.trading.paper_trading {
        debug!("Paper trading, no exchange orders to guard");
        return Ok(());
    }

    let positions = ctx.store.open_positions().await?;
    if positions.is_empty() {
        return Ok(());
    }
    info!(count = positions.len(), "Checking SL/TP coverage");

    let mut created_sl = 0;
    let mut created_tp = 0;

    for position in &positions {
        let side = match Side::parse(&position.side) {
            Ok(side) => side,
            Err(e) => {
                warn!(position_id = position.id, "Bad side: {}", e);
                continue;
            }
        };

        let orders = match ctx.bingx.open_orders(&position.symbol).await {
            Ok(orders) => orders,
            Err(e) => {
                warn!(symbol = %position.symbol, "Could not list open orders: {}", e);
                continue;
            }
        };

        let has_stop_loss = orders.iter().any(|o| o.is_stop_loss());
        let has_take_profit = orders.iter().any(|o| o.is_take_profit());
        if has_stop_loss && has_take_profit {
            continue;
        }

        let stop_loss = position.stop_loss.filter(|p| *p > 0.0).unwrap_or_else(|| {
            signal::stop_loss_price(position.entry_price, DEFAULT_STOP_LOSS_PCT, side)
        });
        let take_profit = position.take_profit.filter(|p| *p > 0.0).unwrap_or_else(|| {
            signal::target_price(position.entry_price, DEFAULT_TAKE_PROFIT_PCT, side)
        });

        if !has_stop_loss {
            match place_trigger(ctx, position, side, OrderType::StopMarket, stop_loss).await {
                Ok(order_id) => {
                    created_sl += 1;
                    info!(symbol = %position.symbol, order_id, price = stop_loss, "Created stop loss order");
                }
                Err(e) => warn!(symbol = %position.symbol, "Failed to create SL order: {}", e),
            }
            // Space out trigger-order requests.
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        if !has_take_profit {
            match place_trigger(ctx, position, side, OrderType::TakeProfitMarket, take_profit).await
            {
                Ok(order_id) => {
                    created_tp += 1;
                    info!(symbol = %position.symbol, order_id, price = take_profit, "Created take profit order");
                }
                Err(e) => warn!(symbol = %position.symbol, "Failed to create TP order: {}", e),
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    info!(created_sl, created_tp, "SL/TP guard completed");
    Ok(())
}

async fn place_trigger(
    ctx: &JobContext,
    position: &PositionRow,
    side: Side,
    order_type: OrderType,
    stop_price: f64,
) -> Result<String> {
    // Trigger orders close the position: opposite order side, same
    // position side.
    let request = OrderRequest {
        symbol: position.symbol.clone(),
        side: if side.is_long() {
            OrderSide::Sell
        } else {
            OrderSide::Buy
        },
        position_side: side.as_str().to_string(),
        order_type,
        quantity: position.size,
        price: None,
        stop_price: Some(stop_price),
    };

    Ok(ctx.bingx.place_order(&request).await?.order_id)
}
