use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub bingx: BingxConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Where the webhook forwards normalized signals. Defaults to this
    /// process's own import endpoint.
    #[serde(default)]
    pub signal_import_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            signal_import_url: None,
        }
    }
}

fn default_bind_addr() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BingxConfig {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    #[serde(default = "default_rest_url")]
    pub rest_url: String,
    #[serde(default = "default_recv_window")]
    pub recv_window: u64,
}

fn default_rest_url() -> String { "https://open-api.bingx.com".to_string() }
fn default_recv_window() -> u64 { 5000 }

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: default_database_url() }
    }
}

fn default_database_url() -> String { "sqlite://data/bot.db?mode=rwc".to_string() }

/// Telegram credentials for the four destinations the dispatcher routes to:
/// the default signal channel, the admin channel (trend/ichimoku and error
/// alerts), the FVG channel, and the "blue" channel for UP_TREND signals.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    #[serde(default)]
    pub admin_bot_token: Option<String>,
    #[serde(default)]
    pub admin_chat_id: Option<String>,
    #[serde(default)]
    pub fvg_bot_token: Option<String>,
    #[serde(default)]
    pub fvg_chat_id: Option<String>,
    #[serde(default)]
    pub blue_bot_token: Option<String>,
    #[serde(default)]
    pub blue_chat_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TradingConfig {
    #[serde(default = "default_leverage")]
    pub default_leverage: u32,
    /// Second default entry is placed this far into the pullback direction.
    #[serde(default = "default_entry_spread_pct")]
    pub entry_spread_pct: f64,
    #[serde(default = "default_target_token_pct")]
    pub default_target_pct: f64,
    #[serde(default = "default_stop_loss_token_pct")]
    pub default_stop_loss_pct: f64,
    /// Record orders without calling the exchange.
    #[serde(default)]
    pub paper_trading: bool,
    /// Master switch for jobs that place or execute orders on their own.
    #[serde(default)]
    pub auto_trading_enabled: bool,
    /// Close positions automatically when the stored stop level is crossed.
    #[serde(default)]
    pub auto_stop_loss: bool,
    /// "notify" or "auto_close" when the target percentage is reached.
    #[serde(default = "default_target_action")]
    pub target_action: String,
    #[serde(default = "default_target_percentage")]
    pub target_percentage: f64,
    /// "notify" or "auto_execute" when a pending limit order's entry price
    /// is reached.
    #[serde(default = "default_limit_order_action")]
    pub limit_order_action: String,
    #[serde(default = "default_max_auto_orders")]
    pub max_auto_orders_per_hour: u32,
    /// Fixed margin per auto-placed order, in USDT.
    #[serde(default = "default_order_margin")]
    pub order_margin_usdt: f64,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            default_leverage: default_leverage(),
            entry_spread_pct: default_entry_spread_pct(),
            default_target_pct: default_target_token_pct(),
            default_stop_loss_pct: default_stop_loss_token_pct(),
            paper_trading: false,
            auto_trading_enabled: false,
            auto_stop_loss: false,
            target_action: default_target_action(),
            target_percentage: default_target_percentage(),
            limit_order_action: default_limit_order_action(),
            max_auto_orders_per_hour: default_max_auto_orders(),
            order_margin_usdt: default_order_margin(),
        }
    }
}

fn default_leverage() -> u32 { 6 }
fn default_entry_spread_pct() -> f64 { 2.0 }
fn default_target_token_pct() -> f64 { 2.0 }
fn default_stop_loss_token_pct() -> f64 { 5.0 }
fn default_target_action() -> String { "notify".to_string() }
fn default_target_percentage() -> f64 { 10.0 }
fn default_limit_order_action() -> String { "notify".to_string() }
fn default_max_auto_orders() -> u32 { 10 }
fn default_order_margin() -> f64 { 100.0 }

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub interval_secs: u64,
}

fn default_true() -> bool { true }

impl JobConfig {
    fn every(interval_secs: u64) -> Self {
        Self { enabled: true, interval_secs }
    }
}

/// Enable flags and run intervals for the scheduled jobs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobsConfig {
    #[serde(default = "default_balance_sync")]
    pub balance_sync: JobConfig,
    #[serde(default = "default_position_sync")]
    pub position_sync: JobConfig,
    #[serde(default = "default_price_monitor")]
    pub price_monitor: JobConfig,
    #[serde(default = "default_order_status")]
    pub order_status: JobConfig,
    #[serde(default = "default_limit_order_monitor")]
    pub limit_order_monitor: JobConfig,
    #[serde(default = "default_target_monitor")]
    pub target_monitor: JobConfig,
    #[serde(default = "default_sltp_guard")]
    pub sltp_guard: JobConfig,
    #[serde(default = "default_signal_automation")]
    pub signal_automation: JobConfig,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            balance_sync: default_balance_sync(),
            position_sync: default_position_sync(),
            price_monitor: default_price_monitor(),
            order_status: default_order_status(),
            limit_order_monitor: default_limit_order_monitor(),
            target_monitor: default_target_monitor(),
            sltp_guard: default_sltp_guard(),
            signal_automation: default_signal_automation(),
        }
    }
}

fn default_balance_sync() -> JobConfig { JobConfig::every(120) }
fn default_position_sync() -> JobConfig { JobConfig::every(180) }
fn default_price_monitor() -> JobConfig { JobConfig::every(60) }
fn default_order_status() -> JobConfig { JobConfig::every(60) }
fn default_limit_order_monitor() -> JobConfig { JobConfig::every(120) }
fn default_target_monitor() -> JobConfig { JobConfig::every(300) }
fn default_sltp_guard() -> JobConfig { JobConfig::every(300) }
fn default_signal_automation() -> JobConfig { JobConfig::every(120) }

impl Config {
    pub fn load() -> Result<Arc<Self>> {
        dotenv::dotenv().ok();

        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("BOT").separator("_"));

        // API keys and chat credentials come from the environment so they
        // never land in a checked-in config file.
        if let Ok(api_key) = std::env::var("BINGX_API_KEY") {
            builder = builder.set_override("bingx.api_key", api_key)?;
        }
        if let Ok(api_secret) = std::env::var("BINGX_SECRET_KEY") {
            builder = builder.set_override("bingx.api_secret", api_secret)?;
        }
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            builder = builder.set_override("telegram.bot_token", token)?;
        }
        if let Ok(chat_id) = std::env::var("TELEGRAM_CHAT_ID") {
            builder = builder.set_override("telegram.chat_id", chat_id)?;
        }
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN_ADMIN") {
            builder = builder.set_override("telegram.admin_bot_token", token)?;
        }
        if let Ok(chat_id) = std::env::var("TELEGRAM_CHAT_ID_ADMIN") {
            builder = builder.set_override("telegram.admin_chat_id", chat_id)?;
        }
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN_FVG") {
            builder = builder.set_override("telegram.fvg_bot_token", token)?;
        }
        if let Ok(chat_id) = std::env::var("TELEGRAM_CHAT_ID_FVG") {
            builder = builder.set_override("telegram.fvg_chat_id", chat_id)?;
        }
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN_BLUE") {
            builder = builder.set_override("telegram.blue_bot_token", token)?;
        }
        if let Ok(chat_id) = std::env::var("TELEGRAM_CHAT_ID_BLUE") {
            builder = builder.set_override("telegram.blue_chat_id", chat_id)?;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", url)?;
        }

        let config = builder.build()?;
        Ok(Arc::new(config.try_deserialize()?))
    }

    /// Effective URL of the internal signal-import endpoint.
    pub fn signal_import_url(&self) -> String {
        self.server.signal_import_url.clone().unwrap_or_else(|| {
            format!("http://127.0.0.1:{}/api/signals/import", self.server.port)
        })
    }
}
