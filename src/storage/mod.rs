use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{FromRow, SqlitePool};
use tracing::info;

/// Database row for the signals table. One row per imported signal; rows are
/// never mutated after creation except for the status flag.
#[derive(Debug, Clone, FromRow)]
pub struct SignalRow {
    pub id: i64,
    pub symbol: String,
    pub side: String,
    pub entry_market_price: Option<f64>,
    pub entry_2: Option<f64>,
    pub entry_3: Option<f64>,
    pub take_profit_1: Option<f64>,
    pub take_profit_2: Option<f64>,
    pub take_profit_3: Option<f64>,
    pub take_profit_4: Option<f64>,
    pub take_profit_5: Option<f64>,
    pub stop_loss: Option<f64>,
    pub leverage: i64,
    pub source_name: Option<String>,
    pub external_signal_id: Option<String>,
    pub confidence_score: f64,
    pub notes: Option<String>,
    pub risk_reward_ratio: f64,
    pub auto_created: bool,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSignal {
    pub symbol: String,
    pub side: String,
    pub entry_market_price: Option<f64>,
    pub entry_2: Option<f64>,
    pub entry_3: Option<f64>,
    pub take_profits: [Option<f64>; 5],
    pub stop_loss: Option<f64>,
    pub leverage: i64,
    pub source_name: String,
    pub external_signal_id: Option<String>,
    pub confidence_score: f64,
    pub notes: Option<String>,
    pub risk_reward_ratio: f64,
    pub auto_created: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
    pub id: i64,
    pub signal_id: Option<i64>,
    pub exchange_order_id: Option<String>,
    pub symbol: String,
    pub side: String,
    pub position_side: String,
    pub order_type: String,
    pub quantity: f64,
    pub price: Option<f64>,
    pub leverage: i64,
    pub status: String,
    pub fill_price: Option<f64>,
    pub fill_time: Option<DateTime<Utc>>,
    pub triggered_price: Option<f64>,
    pub triggered_at: Option<DateTime<Utc>>,
    pub notified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub signal_id: Option<i64>,
    pub exchange_order_id: Option<String>,
    pub symbol: String,
    pub side: String,
    pub position_side: String,
    pub order_type: String,
    pub quantity: f64,
    pub price: Option<f64>,
    pub leverage: i64,
    pub status: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct PositionRow {
    pub id: i64,
    pub signal_id: Option<i64>,
    pub symbol: String,
    pub side: String,
    pub size: f64,
    pub entry_price: f64,
    pub leverage: f64,
    pub margin_used: f64,
    pub unrealized_pnl: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub status: String,
    pub target_notified_at: Option<DateTime<Utc>>,
    pub close_price: Option<f64>,
    pub close_reason: Option<String>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewPosition {
    pub signal_id: Option<i64>,
    pub symbol: String,
    pub side: String,
    pub size: f64,
    pub entry_price: f64,
    pub leverage: f64,
    pub margin_used: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

#[derive(Debug, Clone, FromRow)]
pub struct WatchlistRow {
    pub id: i64,
    pub symbol: String,
    pub entry_price: f64,
    pub entry_type: String,
    pub direction: String,
    pub margin_amount: f64,
    pub percentage: Option<f64>,
    pub initial_price: Option<f64>,
    pub status: String,
    pub triggered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct BalanceRow {
    pub id: i64,
    pub total_balance: f64,
    pub available_balance: f64,
    pub margin_used: f64,
    pub unrealized_pnl: f64,
    pub updated_at: DateTime<Utc>,
}

/// SQLite-backed store for signals, orders, positions, watchlist items and
/// the current balance snapshot.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn connect(url: &str) -> Result<Self> {
        // SQLite allows a single writer; one pooled connection keeps the
        // job fan-out serialized at the database boundary.
        let pool = SqlitePoolOptions::new().max_connections(1).connect(url).await?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS signals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                side TEXT NOT NULL,
                entry_market_price REAL,
                entry_2 REAL,
                entry_3 REAL,
                take_profit_1 REAL,
                take_profit_2 REAL,
                take_profit_3 REAL,
                take_profit_4 REAL,
                take_profit_5 REAL,
                stop_loss REAL,
                leverage INTEGER NOT NULL DEFAULT 6,
                source_name TEXT,
                external_signal_id TEXT,
                confidence_score REAL NOT NULL DEFAULT 0,
                notes TEXT,
                risk_reward_ratio REAL NOT NULL DEFAULT 0,
                auto_created INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'ACTIVE',
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                signal_id INTEGER,
                exchange_order_id TEXT,
                symbol TEXT NOT NULL,
                side TEXT NOT NULL,
                position_side TEXT NOT NULL,
                order_type TEXT NOT NULL,
                quantity REAL NOT NULL,
                price REAL,
                leverage INTEGER NOT NULL DEFAULT 1,
                status TEXT NOT NULL DEFAULT 'NEW',
                fill_price REAL,
                fill_time TEXT,
                triggered_price REAL,
                triggered_at TEXT,
                notified_at TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status, order_type)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS positions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                signal_id INTEGER,
                symbol TEXT NOT NULL,
                side TEXT NOT NULL,
                size REAL NOT NULL,
                entry_price REAL NOT NULL,
                leverage REAL NOT NULL DEFAULT 1,
                margin_used REAL NOT NULL DEFAULT 0,
                unrealized_pnl REAL NOT NULL DEFAULT 0,
                stop_loss REAL,
                take_profit REAL,
                status TEXT NOT NULL DEFAULT 'OPEN',
                target_notified_at TEXT,
                close_price REAL,
                close_reason TEXT,
                opened_at TEXT NOT NULL,
                closed_at TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_positions_status ON positions(status)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS watchlist (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                entry_price REAL NOT NULL,
                entry_type TEXT NOT NULL DEFAULT 'limit',
                direction TEXT NOT NULL,
                margin_amount REAL NOT NULL DEFAULT 0,
                percentage REAL,
                initial_price REAL,
                status TEXT NOT NULL DEFAULT 'active',
                triggered_at TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS account_balance (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                total_balance REAL NOT NULL,
                available_balance REAL NOT NULL,
                margin_used REAL NOT NULL,
                unrealized_pnl REAL NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("✅ Database schema ready");
        Ok(())
    }

    // ---- signals --------------------------------------------------------

    /// Insert a signal row. Replayed payloads insert fresh rows each time;
    /// there is deliberately no deduplication here.
    pub async fn insert_signal(&self, signal: &NewSignal) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO signals (
                symbol, side, entry_market_price, entry_2, entry_3,
                take_profit_1, take_profit_2, take_profit_3, take_profit_4, take_profit_5,
                stop_loss, leverage, source_name, external_signal_id,
                confidence_score, notes, risk_reward_ratio, auto_created, status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'ACTIVE', ?)
            "#,
        )
        .bind(&signal.symbol)
        .bind(&signal.side)
        .bind(signal.entry_market_price)
        .bind(signal.entry_2)
        .bind(signal.entry_3)
        .bind(signal.take_profits[0])
        .bind(signal.take_profits[1])
        .bind(signal.take_profits[2])
        .bind(signal.take_profits[3])
        .bind(signal.take_profits[4])
        .bind(signal.stop_loss)
        .bind(signal.leverage)
        .bind(&signal.source_name)
        .bind(&signal.external_signal_id)
        .bind(signal.confidence_score)
        .bind(&signal.notes)
        .bind(signal.risk_reward_ratio)
        .bind(signal.auto_created)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn active_signals(&self) -> Result<Vec<SignalRow>> {
        Ok(sqlx::query_as::<_, SignalRow>(
            "SELECT * FROM signals WHERE status = 'ACTIVE' ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn signal(&self, id: i64) -> Result<Option<SignalRow>> {
        Ok(sqlx::query_as::<_, SignalRow>("SELECT * FROM signals WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn mark_signal_status(&self, id: i64, status: &str) -> Result<()> {
        sqlx::query("UPDATE signals SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Orders placed in the trailing hour, for the auto-trading cap.
    pub async fn count_orders_last_hour(&self) -> Result<i64> {
        let cutoff = Utc::now() - Duration::hours(1);
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM orders WHERE status != 'CANCELLED' AND created_at >= ?",
        )
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0)
    }

    // ---- orders ---------------------------------------------------------

    pub async fn insert_order(&self, order: &NewOrder) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO orders (
                signal_id, exchange_order_id, symbol, side, position_side,
                order_type, quantity, price, leverage, status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(order.signal_id)
        .bind(&order.exchange_order_id)
        .bind(&order.symbol)
        .bind(&order.side)
        .bind(&order.position_side)
        .bind(&order.order_type)
        .bind(order.quantity)
        .bind(order.price)
        .bind(order.leverage)
        .bind(&order.status)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Orders awaiting an exchange-side status change.
    pub async fn pending_exchange_orders(&self) -> Result<Vec<OrderRow>> {
        Ok(sqlx::query_as::<_, OrderRow>(
            "SELECT * FROM orders \
             WHERE status IN ('NEW', 'PENDING') AND exchange_order_id IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    /// Limit orders the monitor watches: still pending and no older than a
    /// day (stale entries are left for manual cleanup).
    pub async fn pending_limit_orders(&self) -> Result<Vec<OrderRow>> {
        let cutoff = Utc::now() - Duration::hours(24);
        Ok(sqlx::query_as::<_, OrderRow>(
            "SELECT * FROM orders \
             WHERE order_type = 'LIMIT' AND status IN ('NEW', 'PENDING') AND created_at >= ? \
             ORDER BY created_at DESC",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn update_order_status(
        &self,
        id: i64,
        status: &str,
        fill_price: Option<f64>,
        fill_time: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE orders SET status = ?, \
             fill_price = COALESCE(?, fill_price), \
             fill_time = COALESCE(?, fill_time) \
             WHERE id = ?",
        )
        .bind(status)
        .bind(fill_price)
        .bind(fill_time)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_order_triggered(&self, id: i64, price: f64) -> Result<()> {
        sqlx::query(
            "UPDATE orders SET status = 'TRIGGERED', triggered_price = ?, triggered_at = ? \
             WHERE id = ?",
        )
        .bind(price)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_order_notified(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE orders SET status = 'NOTIFIED', notified_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ---- positions ------------------------------------------------------

    /// The ad-hoc uniqueness pre-check: at most one OPEN position per
    /// originating signal and symbol/side.
    pub async fn open_position_for_signal(&self, signal_id: i64) -> Result<Option<PositionRow>> {
        Ok(sqlx::query_as::<_, PositionRow>(
            "SELECT * FROM positions WHERE signal_id = ? AND status = 'OPEN' LIMIT 1",
        )
        .bind(signal_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn insert_position(&self, position: &NewPosition) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO positions (
                signal_id, symbol, side, size, entry_price, leverage,
                margin_used, stop_loss, take_profit, status, opened_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'OPEN', ?)
            "#,
        )
        .bind(position.signal_id)
        .bind(&position.symbol)
        .bind(&position.side)
        .bind(position.size)
        .bind(position.entry_price)
        .bind(position.leverage)
        .bind(position.margin_used)
        .bind(position.stop_loss)
        .bind(position.take_profit)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn open_positions(&self) -> Result<Vec<PositionRow>> {
        Ok(sqlx::query_as::<_, PositionRow>(
            "SELECT * FROM positions WHERE status = 'OPEN' ORDER BY opened_at ASC",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn update_position_pnl(&self, id: i64, unrealized_pnl: f64) -> Result<()> {
        sqlx::query("UPDATE positions SET unrealized_pnl = ? WHERE id = ?")
            .bind(unrealized_pnl)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_target_notified(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE positions SET target_notified_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn close_position(&self, id: i64, close_price: f64, reason: &str) -> Result<()> {
        sqlx::query(
            "UPDATE positions SET status = 'CLOSED', close_price = ?, close_reason = ?, \
             closed_at = ? WHERE id = ?",
        )
        .bind(close_price)
        .bind(reason)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ---- watchlist ------------------------------------------------------

    pub async fn active_watchlist(&self) -> Result<Vec<WatchlistRow>> {
        Ok(sqlx::query_as::<_, WatchlistRow>(
            "SELECT * FROM watchlist WHERE status = 'active' ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn insert_watchlist_item(
        &self,
        symbol: &str,
        entry_price: f64,
        entry_type: &str,
        direction: &str,
        margin_amount: f64,
        initial_price: Option<f64>,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO watchlist (
                symbol, entry_price, entry_type, direction, margin_amount,
                initial_price, status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, 'active', ?)
            "#,
        )
        .bind(symbol)
        .bind(entry_price)
        .bind(entry_type)
        .bind(direction)
        .bind(margin_amount)
        .bind(initial_price)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Flips the item to its terminal state; a triggered item never fires
    /// again.
    pub async fn mark_watchlist_triggered(&self, id: i64) -> Result<()> {
        sqlx::query(
            "UPDATE watchlist SET status = 'triggered', triggered_at = ? WHERE id = ?",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ---- account balance ------------------------------------------------

    pub async fn current_balance(&self) -> Result<Option<BalanceRow>> {
        Ok(sqlx::query_as::<_, BalanceRow>(
            "SELECT * FROM account_balance ORDER BY updated_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Single "current" row, updated in place once it exists.
    pub async fn upsert_balance(
        &self,
        total: f64,
        available: f64,
        margin_used: f64,
        unrealized_pnl: f64,
    ) -> Result<()> {
        let existing = self.current_balance().await?;

        match existing {
            Some(row) => {
                sqlx::query(
                    "UPDATE account_balance SET total_balance = ?, available_balance = ?, \
                     margin_used = ?, unrealized_pnl = ?, updated_at = ? WHERE id = ?",
                )
                .bind(total)
                .bind(available)
                .bind(margin_used)
                .bind(unrealized_pnl)
                .bind(Utc::now())
                .bind(row.id)
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query(
                    "INSERT INTO account_balance \
                     (total_balance, available_balance, margin_used, unrealized_pnl, updated_at) \
                     VALUES (?, ?, ?, ?, ?)",
                )
                .bind(total)
                .bind(available)
                .bind(margin_used)
                .bind(unrealized_pnl)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> Store {
        Store::connect("sqlite::memory:").await.expect("in-memory store")
    }

    fn sample_signal() -> NewSignal {
        NewSignal {
            symbol: "BTCUSDT".to_string(),
            side: "LONG".to_string(),
            entry_market_price: Some(45000.0),
            entry_2: Some(44500.0),
            entry_3: None,
            take_profits: [Some(45900.0), Some(46800.0), None, None, None],
            stop_loss: Some(43650.0),
            leverage: 6,
            source_name: "Webhook Import".to_string(),
            external_signal_id: None,
            confidence_score: 0.0,
            notes: None,
            risk_reward_ratio: 0.0,
            auto_created: true,
        }
    }

    #[tokio::test]
    async fn test_replayed_signal_creates_independent_rows() {
        let store = memory_store().await;
        let first = store.insert_signal(&sample_signal()).await.unwrap();
        let second = store.insert_signal(&sample_signal()).await.unwrap();
        assert_ne!(first, second);

        let active = store.active_signals().await.unwrap();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].symbol, "BTCUSDT");
        assert_eq!(active[0].take_profit_2, Some(46800.0));
    }

    #[tokio::test]
    async fn test_balance_row_is_updated_in_place() {
        let store = memory_store().await;
        assert!(store.current_balance().await.unwrap().is_none());

        store.upsert_balance(1000.0, 900.0, 100.0, 0.0).await.unwrap();
        store.upsert_balance(1100.0, 950.0, 150.0, 25.0).await.unwrap();

        let row = store.current_balance().await.unwrap().unwrap();
        assert_eq!(row.total_balance, 1100.0);
        assert_eq!(row.unrealized_pnl, 25.0);

        // Still a single row.
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM account_balance")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn test_position_lifecycle() {
        let store = memory_store().await;
        let signal_id = store.insert_signal(&sample_signal()).await.unwrap();

        let position = NewPosition {
            signal_id: Some(signal_id),
            symbol: "BTCUSDT".to_string(),
            side: "LONG".to_string(),
            size: 0.1,
            entry_price: 45000.0,
            leverage: 6.0,
            margin_used: 750.0,
            stop_loss: Some(43650.0),
            take_profit: Some(45900.0),
        };
        let id = store.insert_position(&position).await.unwrap();

        // The uniqueness pre-check sees the open row.
        assert!(store.open_position_for_signal(signal_id).await.unwrap().is_some());

        store.update_position_pnl(id, 120.5).await.unwrap();
        let open = store.open_positions().await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].unrealized_pnl, 120.5);

        store.close_position(id, 45900.0, "TARGET_REACHED").await.unwrap();
        assert!(store.open_positions().await.unwrap().is_empty());
        assert!(store.open_position_for_signal(signal_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_watchlist_trigger_is_terminal() {
        let store = memory_store().await;
        let id = store
            .insert_watchlist_item("ETHUSDT", 2000.0, "limit", "long", 50.0, Some(2100.0))
            .await
            .unwrap();

        assert_eq!(store.active_watchlist().await.unwrap().len(), 1);
        store.mark_watchlist_triggered(id).await.unwrap();
        assert!(store.active_watchlist().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_order_status_transitions() {
        let store = memory_store().await;
        let order = NewOrder {
            signal_id: None,
            exchange_order_id: Some("12345".to_string()),
            symbol: "BTCUSDT".to_string(),
            side: "BUY".to_string(),
            position_side: "LONG".to_string(),
            order_type: "LIMIT".to_string(),
            quantity: 0.05,
            price: Some(44000.0),
            leverage: 6,
            status: "NEW".to_string(),
        };
        let id = store.insert_order(&order).await.unwrap();

        assert_eq!(store.pending_limit_orders().await.unwrap().len(), 1);
        assert_eq!(store.pending_exchange_orders().await.unwrap().len(), 1);

        store
            .update_order_status(id, "FILLED", Some(44010.0), Some(Utc::now()))
            .await
            .unwrap();
        assert!(store.pending_limit_orders().await.unwrap().is_empty());
        assert!(store.pending_exchange_orders().await.unwrap().is_empty());
    }
}
