use anyhow::Result;
use tracing::info;

use crate::jobs::JobContext;
use crate::signal;

pub const NAME: &str = "balance-sync";

/// Sync the account balance snapshot from the exchange and notify on
/// significant moves (5% or more either way).
pub async fn run(ctx: &JobContext) -> Result<()> {
    let previous = ctx.store.current_balance().await?;
    let current = ctx.bingx.account_balance().await?;

    ctx.store
        .upsert_balance(
            current.total_balance,
            current.available_balance,
            current.margin_used,
            current.unrealized_pnl,
        )
        .await?;

    info!(
        total = current.total_balance,
        available = current.available_balance,
        margin_used = current.margin_used,
        unrealized_pnl = current.unrealized_pnl,
        "Balance updated"
    );

    if let Some(previous) = previous {
        if let Some(change) = signal::balance_change(previous.total_balance, current.total_balance)
        {
            let delivery = ctx.telegram.balance_changed(&change).await;
            info!(
                percent = change.percent,
                sent = delivery.ok,
                "Balance change notification"
            );
        }
    }

    Ok(())
}
