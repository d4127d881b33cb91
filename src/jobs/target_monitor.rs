use anyhow::Result;
use tracing::{info, warn};

use crate::bingx::types::{OrderRequest, OrderSide, OrderType};
use crate::jobs::JobContext;
use crate::signal::{self, Side};
use crate::storage::PositionRow;

pub const NAME: &str = "target-monitor";

/// Leveraged loss percentage that forces a close regardless of settings.
const EMERGENCY_STOP_PCT: f64 = -50.0;

/// Watch open positions for stop-loss, target and emergency-stop conditions.
pub async fn run(ctx: &JobContext) -> Result<()> {
    let positions = ctx.store.open_positions().await?;
    if positions.is_empty() {
        return Ok(());
    }
    info!(count = positions.len(), "Checking open positions");

    let trading = &ctx.config.trading;

    for position in &positions {
        let side = match Side::parse(&position.side) {
            Ok(side) => side,
            Err(e) => {
                warn!(position_id = position.id, "Bad side: {}", e);
                continue;
            }
        };

        let current_price = match ctx.bingx.ticker_price(&position.symbol).await {
            Ok(price) => price,
            Err(e) => {
                warn!(symbol = %position.symbol, "Could not get price: {}", e);
                continue;
            }
        };

        let pnl_percent = signal::pnl_percent(
            position.entry_price,
            current_price,
            side,
            position.leverage,
        );

        // Stop loss first.
        if trading.auto_stop_loss {
            if let Some(stop_loss) = position.stop_loss.filter(|sl| *sl > 0.0) {
                let hit = if side.is_long() {
                    current_price <= stop_loss
                } else {
                    current_price >= stop_loss
                };

                if hit {
                    if close_position(ctx, position, side, current_price, "STOP_LOSS").await? {
                        let _ = ctx
                            .telegram
                            .stop_loss_triggered(
                                &position.symbol,
                                &position.side,
                                position.entry_price,
                                stop_loss,
                                current_price,
                                pnl_percent,
                                position.leverage,
                            )
                            .await;
                        info!(symbol = %position.symbol, "Stop loss hit, position closed");
                    }
                    continue;
                }
            }
        }

        // Target.
        if pnl_percent >= trading.target_percentage {
            if trading.target_action == "auto_close" {
                if close_position(ctx, position, side, current_price, "TARGET_REACHED").await? {
                    let _ = ctx
                        .telegram
                        .target_reached(
                            &position.symbol,
                            &position.side,
                            position.entry_price,
                            current_price,
                            pnl_percent,
                            trading.target_percentage,
                            position.leverage,
                            true,
                        )
                        .await;
                    info!(symbol = %position.symbol, pnl_percent, "Target reached, auto closed");
                }
            } else if position.target_notified_at.is_none() {
                let delivery = ctx
                    .telegram
                    .target_reached(
                        &position.symbol,
                        &position.side,
                        position.entry_price,
                        current_price,
                        pnl_percent,
                        trading.target_percentage,
                        position.leverage,
                        false,
                    )
                    .await;
                if delivery.ok {
                    // Notify once; the timestamp guards against spam.
                    ctx.store.mark_target_notified(position.id).await?;
                    info!(symbol = %position.symbol, pnl_percent, "Target notification sent");
                }
            }
        }

        // Emergency stop on runaway losses.
        if pnl_percent <= EMERGENCY_STOP_PCT {
            if close_position(ctx, position, side, current_price, "EMERGENCY_STOP").await? {
                let _ = ctx
                    .telegram
                    .emergency_stop(
                        &position.symbol,
                        &position.side,
                        position.entry_price,
                        current_price,
                        pnl_percent,
                        position.leverage,
                    )
                    .await;
                info!(symbol = %position.symbol, pnl_percent, "Emergency stop executed");
            }
        }
    }

    Ok(())
}

/// Close the row and, when live trading, flatten the position on the
/// exchange with a closing market order. The closing order keeps the
/// position side and reverses the order side (hedge mode).
async fn close_position(
    ctx: &JobContext,
    position: &PositionRow,
    side: Side,
    current_price: f64,
    reason: &str,
) -> Result<bool> {
    if ctx.config.trading.auto_trading_enabled && !ctx.config.trading.paper_trading {
        let request = OrderRequest {
            symbol: position.symbol.clone(),
            side: if side.is_long() {
                OrderSide::Sell
            } else {
                OrderSide::Buy
            },
            position_side: side.as_str().to_string(),
            order_type: OrderType::Market,
            quantity: position.size,
            price: None,
            stop_price: None,
        };
        if let Err(e) = ctx.bingx.place_order(&request).await {
            warn!(symbol = %position.symbol, "Closing order failed: {}", e);
            return Ok(false);
        }
    }

    ctx.store
        .close_position(position.id, current_price, reason)
        .await?;
    Ok(true)
}
