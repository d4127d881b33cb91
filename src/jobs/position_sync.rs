use std::collections::HashMap;

use anyhow::Result;
use tracing::{debug, info};

use crate::bingx::client::to_exchange_symbol;
use crate::bingx::types::ExchangePosition;
use crate::jobs::JobContext;
use crate::signal;

pub const NAME: &str = "position-sync";

/// Refresh unrealized P&L of open positions from the exchange and fire
/// milestone notifications on threshold crossings.
pub async fn run(ctx: &JobContext) -> Result<()> {
    let db_positions = ctx.store.open_positions().await?;
    if db_positions.is_empty() {
        debug!("No open positions to sync");
        return Ok(());
    }

    let exchange_positions = ctx.bingx.positions().await?;
    let by_key: HashMap<String, &ExchangePosition> = exchange_positions
        .iter()
        .map(|p| (format!("{}_{}", p.symbol, p.position_side.to_uppercase()), p))
        .collect();

    let mut updated = 0;
    let mut notified = 0;

    for position in &db_positions {
        let key = format!(
            "{}_{}",
            to_exchange_symbol(&position.symbol),
            position.side.to_uppercase()
        );

        let Some(exchange_position) = by_key.get(&key) else {
            debug!(symbol = %position.symbol, side = %position.side, "Position not found on exchange");
            continue;
        };

        let old_pnl = position.unrealized_pnl;
        let new_pnl = exchange_position.unrealized_pnl;

        ctx.store.update_position_pnl(position.id, new_pnl).await?;
        updated += 1;

        // Milestones are percentages of the margin backing the position.
        if position.margin_used == 0.0 {
            continue;
        }
        let old_percent = old_pnl / position.margin_used * 100.0;
        let new_percent = new_pnl / position.margin_used * 100.0;

        if let Some(milestone) = signal::crossed_milestone(old_percent, new_percent) {
            let delivery = ctx
                .telegram
                .pnl_milestone(&position.symbol, &position.side, &milestone, new_pnl)
                .await;
            if delivery.ok {
                notified += 1;
            }
            info!(
                symbol = %position.symbol,
                level = milestone.level,
                current = milestone.current_percent,
                "P&L milestone crossed"
            );
        }
    }

    info!(updated, notified, "Position sync completed");
    Ok(())
}
