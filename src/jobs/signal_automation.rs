use anyhow::Result;
use tracing::{debug, info, warn};

use crate::bingx::types::OrderType;
use crate::jobs::{self, JobContext};
use crate::signal::Side;
use crate::storage::SignalRow;

pub const NAME: &str = "signal-automation";

/// Convert ACTIVE signals into exchange orders: a market order at the first
/// entry plus limit orders for the deeper entries. Capped per hour and
/// guarded by the auto-trading switch.
pub async fn run(ctx: &JobContext) -> Result<()> {
    if !ctx.config.trading.auto_trading_enabled {
        debug!("Auto trading disabled, skipping signal automation");
        return Ok(());
    }

    let placed_this_hour = ctx.store.count_orders_last_hour().await?;
    let cap = ctx.config.trading.max_auto_orders_per_hour as i64;
    if placed_this_hour >= cap {
        info!(placed_this_hour, cap, "Hourly order cap reached");
        return Ok(());
    }

    let signals = ctx.store.active_signals().await?;
    if signals.is_empty() {
        return Ok(());
    }
    info!(count = signals.len(), "Processing active signals");

    for signal in &signals {
        match process_signal(ctx, signal).await {
            Ok(true) => {
                ctx.store.mark_signal_status(signal.id, "PROCESSED").await?;
                info!(signal_id = signal.id, symbol = %signal.symbol, "Signal converted to orders");
            }
            Ok(false) => {}
            Err(e) => {
                warn!(signal_id = signal.id, "Signal processing failed: {}", e);
                let _ = ctx
                    .telegram
                    .notify_error("signal-automation", &e.to_string())
                    .await;
            }
        }
    }

    Ok(())
}

async fn process_signal(ctx: &JobContext, signal: &SignalRow) -> Result<bool> {
    // Skip signals that already produced a position.
    if ctx.store.open_position_for_signal(signal.id).await?.is_some() {
        return Ok(false);
    }

    let side = Side::parse(&signal.side)?;
    let leverage = signal.leverage.clamp(1, 100) as u32;

    let entry_price = match signal.entry_market_price.filter(|p| *p > 0.0) {
        Some(price) => price,
        None => ctx.bingx.ticker_price(&signal.symbol).await?,
    };

    let margin = ctx.config.trading.order_margin_usdt;
    let quantity = jobs::position_quantity(margin, leverage, entry_price);
    if quantity <= 0.0 {
        anyhow::bail!("computed zero quantity for {}", signal.symbol);
    }

    if !ctx.config.trading.paper_trading {
        ctx.bingx
            .set_leverage(&signal.symbol, side.as_str(), leverage)
            .await?;
    }

    // Market order at the first entry.
    let market_order_id = jobs::place_and_record(
        ctx,
        Some(signal.id),
        &signal.symbol,
        side,
        OrderType::Market,
        quantity,
        None,
        leverage,
    )
    .await?;
    info!(market_order_id, symbol = %signal.symbol, quantity, "Market entry placed");

    // Deeper entries become resting limit orders.
    for entry in [signal.entry_2, signal.entry_3].into_iter().flatten() {
        if entry <= 0.0 {
            continue;
        }
        let limit_quantity = jobs::position_quantity(margin, leverage, entry);
        let limit_order_id = jobs::place_and_record(
            ctx,
            Some(signal.id),
            &signal.symbol,
            side,
            OrderType::Limit,
            limit_quantity,
            Some(entry),
            leverage,
        )
        .await?;
        info!(limit_order_id, symbol = %signal.symbol, price = entry, "Limit entry placed");
    }

    Ok(true)
}
