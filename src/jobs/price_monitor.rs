use std::collections::HashMap;

use anyhow::Result;
use tracing::{info, warn};

use crate::bingx::types::OrderType;
use crate::jobs::{self, JobContext};
use crate::signal::Side;
use crate::storage::WatchlistRow;

pub const NAME: &str = "price-monitor";

/// Check active watchlist items against live prices. A triggered item flips
/// to its terminal status and fires a price alert; with auto-trading on, the
/// entry order is placed as well.
pub async fn run(ctx: &JobContext) -> Result<()> {
    let items = ctx.store.active_watchlist().await?;
    if items.is_empty() {
        return Ok(());
    }
    info!(count = items.len(), "Checking watchlist items");

    // One ticker call per symbol per run.
    let mut prices: HashMap<String, f64> = HashMap::new();
    let mut triggered = 0;

    for item in &items {
        let current_price = match prices.get(&item.symbol) {
            Some(price) => *price,
            None => match ctx.bingx.ticker_price(&item.symbol).await {
                Ok(price) => {
                    prices.insert(item.symbol.clone(), price);
                    price
                }
                Err(e) => {
                    warn!(symbol = %item.symbol, "Could not get price: {}", e);
                    continue;
                }
            },
        };

        let side = match Side::parse(&item.direction) {
            Ok(side) => side,
            Err(e) => {
                warn!(watchlist_id = item.id, "Bad direction: {}", e);
                continue;
            }
        };

        // Long entries wait for the price to come down to the level, short
        // entries for it to come up. No hysteresis; the terminal status is
        // what prevents re-triggering.
        let reached = if side.is_long() {
            current_price <= item.entry_price
        } else {
            current_price >= item.entry_price
        };
        if !reached {
            continue;
        }

        if let Err(e) = ctx.store.mark_watchlist_triggered(item.id).await {
            warn!(watchlist_id = item.id, "Failed to mark triggered: {}", e);
            continue;
        }
        triggered += 1;

        let _ = ctx
            .telegram
            .price_alert(
                &item.symbol,
                &item.entry_type,
                item.entry_price,
                current_price,
                side,
                item.margin_amount,
                item.id,
            )
            .await;

        info!(
            symbol = %item.symbol,
            side = %side,
            target = item.entry_price,
            current = current_price,
            "Watchlist item triggered"
        );

        if ctx.config.trading.auto_trading_enabled {
            if let Err(e) = open_entry(ctx, item, side, current_price).await {
                warn!(symbol = %item.symbol, "Auto entry failed: {}", e);
                let _ = ctx
                    .telegram
                    .notify_error("price-monitor auto entry", &e.to_string())
                    .await;
            }
        }
    }

    info!(triggered, "Price monitoring completed");
    Ok(())
}

async fn open_entry(
    ctx: &JobContext,
    item: &WatchlistRow,
    side: Side,
    current_price: f64,
) -> Result<()> {
    let leverage = ctx.config.trading.default_leverage;
    let quantity = jobs::position_quantity(item.margin_amount, leverage, current_price);
    if quantity <= 0.0 {
        anyhow::bail!("computed zero quantity for {}", item.symbol);
    }

    if !ctx.config.trading.paper_trading {
        ctx.bingx
            .set_leverage(&item.symbol, side.as_str(), leverage)
            .await?;
    }

    let order_id = jobs::place_and_record(
        ctx,
        None,
        &item.symbol,
        side,
        OrderType::Market,
        quantity,
        None,
        leverage,
    )
    .await?;

    info!(order_id, symbol = %item.symbol, quantity, "Entry order placed from watchlist");
    Ok(())
}
