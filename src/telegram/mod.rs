use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::TelegramConfig;
use crate::signal::{
    BalanceChange, ChangeDirection, Milestone, MilestoneKind, ResolvedPrices, Side, SignalKind,
};

/// Outcome of one notification attempt. Telegram failures are folded into
/// this record; they never propagate up the call chain.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub ok: bool,
    pub detail: String,
}

impl Delivery {
    fn sent() -> Self {
        Self { ok: true, detail: "sent".to_string() }
    }

    fn failed(detail: impl Into<String>) -> Self {
        Self { ok: false, detail: detail.into() }
    }
}

/// Chat destinations. Trend and ichimoku alerts go to the admin channel,
/// UP_TREND to the blue channel, FVG family to its own channel, everything
/// else to the default channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Default,
    Admin,
    Fvg,
    Blue,
}

/// Channel a signal kind's alert is routed to.
pub fn route(kind: SignalKind) -> Channel {
    match kind {
        SignalKind::InTrend
        | SignalKind::IchimokuBeforeCross
        | SignalKind::IchimokuAfterCross => Channel::Admin,
        SignalKind::UpTrend => Channel::Blue,
        SignalKind::Fvg | SignalKind::FvgTouch | SignalKind::LnlSignal => Channel::Fvg,
        _ => Channel::Default,
    }
}

#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    fallback_client: Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to create HTTP client"),
            // The fallback transport gets a longer timeout than the primary.
            fallback_client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            config,
        }
    }

    fn credentials(&self, channel: Channel) -> Option<(&str, &str)> {
        let (token, chat_id) = match channel {
            Channel::Default => (&self.config.bot_token, &self.config.chat_id),
            Channel::Admin => (&self.config.admin_bot_token, &self.config.admin_chat_id),
            Channel::Fvg => (&self.config.fvg_bot_token, &self.config.fvg_chat_id),
            Channel::Blue => (&self.config.blue_bot_token, &self.config.blue_chat_id),
        };
        match (token.as_deref(), chat_id.as_deref()) {
            (Some(t), Some(c)) if !t.is_empty() && !c.is_empty() => Some((t, c)),
            _ => None,
        }
    }

    pub async fn send(&self, channel: Channel, text: &str) -> Delivery {
        self.send_with_keyboard(channel, text, None).await
    }

    pub async fn send_with_keyboard(
        &self,
        channel: Channel,
        text: &str,
        keyboard: Option<Value>,
    ) -> Delivery {
        if !self.config.enabled {
            return Delivery::failed("Telegram disabled");
        }

        let Some((token, chat_id)) = self.credentials(channel) else {
            return Delivery::failed("Telegram credentials missing");
        };

        let url = format!("https://api.telegram.org/bot{}/sendMessage", token);
        let mut params = vec![
            ("chat_id".to_string(), chat_id.to_string()),
            ("text".to_string(), text.to_string()),
            ("parse_mode".to_string(), "HTML".to_string()),
        ];
        if let Some(kb) = &keyboard {
            params.push((
                "reply_markup".to_string(),
                json!({ "inline_keyboard": kb }).to_string(),
            ));
        }

        // Primary transport: form-encoded POST.
        match self.client.post(&url).form(&params).send().await {
            Ok(response) => Self::interpret(response).await,
            Err(e) => {
                warn!("Telegram primary transport failed: {}, retrying via fallback", e);
                self.send_fallback(&url, chat_id, text, keyboard).await
            }
        }
    }

    /// One fallback attempt with a JSON body; no further retries.
    async fn send_fallback(
        &self,
        url: &str,
        chat_id: &str,
        text: &str,
        keyboard: Option<Value>,
    ) -> Delivery {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
        });
        if let Some(kb) = keyboard {
            body["reply_markup"] = json!({ "inline_keyboard": kb });
        }

        match self.fallback_client.post(url).json(&body).send().await {
            Ok(response) => Self::interpret(response).await,
            Err(e) => Delivery::failed(format!("fallback transport failed: {}", e)),
        }
    }

    async fn interpret(response: reqwest::Response) -> Delivery {
        let status = response.status();
        let body: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => return Delivery::failed(format!("invalid response: {}", e)),
        };

        if body["ok"].as_bool().unwrap_or(false) {
            debug!("Telegram message delivered");
            Delivery::sent()
        } else {
            let description = body["description"].as_str().unwrap_or("Unknown response");
            Delivery::failed(format!("HTTP {}: {}", status, description))
        }
    }

    // ---- message builders ---------------------------------------------

    pub async fn notify_startup(&self, bind: &str, port: u16) -> Delivery {
        let message = format!(
            "🤖 <b>Signal Bot Started</b>\n\n\
             🌐 Listening: {}:{}\n\
             ✅ Status: Running",
            bind, port
        );
        self.send(Channel::Default, &message).await
    }

    pub async fn notify_shutdown(&self) -> Delivery {
        let message = "🛑 <b>Signal Bot Stopped</b>".to_string();
        self.send(Channel::Default, &message).await
    }

    /// Processing errors go to the admin channel.
    pub async fn notify_error(&self, context: &str, error: &str) -> Delivery {
        let message = format!(
            "🚨 <b>Bot Error Alert</b>\n\n\
             📍 <b>Context:</b> {}\n\
             ❌ <b>Error:</b> {}\n\
             ⏰ <b>Time:</b> {} UTC",
            context,
            html_escape(error),
            Utc::now().format("%Y-%m-%d %H:%M:%S")
        );
        self.send(Channel::Admin, &message).await
    }

    pub async fn trading_signal_alert(
        &self,
        symbol: &str,
        side: Side,
        prices: &ResolvedPrices,
        leverage: u32,
    ) -> Delivery {
        let mut message = format!(
            "🚨 <b>TRADING SIGNAL ALERT</b>\n\n\
             <b>Symbol:</b> {}\n\
             <b>Side:</b> {} {}\n\
             <b>Leverage:</b> {}x\n\n\
             <b>📊 Entry Points:</b>\n",
            clean_symbol(symbol),
            side,
            side_icon(side),
            leverage
        );

        let entry_labels = ["Market", "Entry 2", "Entry 3"];
        for (label, entry) in entry_labels.iter().zip(prices.entries.iter()) {
            if let Some(price) = entry {
                message.push_str(&format!("{}: ${:.2}\n", label, price));
            }
        }

        message.push_str("\n<b>🎯 Targets:</b>\n");
        for (i, target) in prices.take_profits.iter().enumerate() {
            if let Some(price) = target {
                message.push_str(&format!("TP{}: ${:.2}\n", i + 1, price));
            }
        }

        message.push_str(&format!("\n<b>🛑 Stop Loss:</b> ${:.2}\n", prices.stop_loss));
        message.push_str(&format!(
            "\n⏰ <i>{} UTC</i>",
            Utc::now().format("%Y-%m-%d %H:%M:%S")
        ));

        self.send(Channel::Default, &message).await
    }

    pub async fn fvg_alert(
        &self,
        symbol: &str,
        side: Side,
        kind: SignalKind,
        entry: &str,
        cross_bars_ago: &str,
        t3_distance: &str,
        t3_lines: &str,
    ) -> Delivery {
        let header = if kind == SignalKind::FvgTouch {
            "♒ FVG Box Touched"
        } else {
            "🔀 LNL Cross Signal"
        };

        let message = format!(
            "<b>{}</b>\n\n\
             ====================\n\
             <b>Symbol:</b> {}\n\
             <b>Side:</b> {} {}\n\n\
             <b>Entry:</b> ${}\n\
             <b>Cross Since:</b> {} Bars ago\n\
             <b>T3 Distance:</b> {}%\n\
             <b>T3 Lines Status:</b> {}",
            header,
            symbol,
            side,
            side_icon(side),
            entry,
            cross_bars_ago,
            t3_distance,
            t3_lines
        );

        self.send(route(kind), &message).await
    }

    pub async fn hit_cross_alert(
        &self,
        symbol: &str,
        side: Side,
        levels: &str,
        prices: &str,
    ) -> Delivery {
        let bars = fvg_depth_bar(levels);
        let formatted_prices = prices.replace(" | ", "\n");
        let depth = level_depth(levels);

        let message = format!(
            "<b>💥 FVG Price Hit Alert</b>\n\n\
             <b>Symbol:</b> {}\n\
             <b>Side:</b> {} {}\n\n\
             <b>FVG Hit Depth:</b> {}\n\n\
             <b>Triggers:</b> {}\n\n\
             <i>Consider 5-minute timeframe</i>\n\n\
             {}\n",
            symbol,
            side,
            side_icon(side),
            depth,
            formatted_prices,
            bars
        );

        self.send(Channel::Default, &message).await
    }

    pub async fn baseline_alert(&self, symbol: &str, side: Side, entry: &str) -> Delivery {
        let message = format!(
            "<b>⚔️🤝 Cross Pattern Hit Alert</b>\n\n\
             <b>Symbol:</b> {}\n\
             <b>Side:</b> {} {}\n\n\
             <b>Entry:</b> {}\n",
            symbol,
            side,
            side_icon(side),
            entry.replace(" | ", "\n")
        );
        self.send(Channel::Default, &message).await
    }

    pub async fn ichimoku_alert(
        &self,
        symbol: &str,
        side: Side,
        entry: &str,
        kind: SignalKind,
    ) -> Delivery {
        let phase = if kind == SignalKind::IchimokuAfterCross {
            "Cross Passed"
        } else {
            "Cross Ahead"
        };

        let message = format!(
            "<b>🔀 ICHI Cross Alert</b>\n\n\
             <b>Symbol:</b> {}\n\
             <b>Side:</b> {} {}\n\n\
             <b>Type:</b> {}\n\n\
             <b>Entry:</b> {}\n",
            symbol,
            side,
            side_icon(side),
            phase,
            entry.replace(" | ", "\n")
        );
        self.send(route(kind), &message).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn adaptive_alert(
        &self,
        kind: SignalKind,
        symbol: &str,
        side: Side,
        entry: &str,
        candle_size: &str,
        distance_to_t3: &str,
        candle_position: &str,
        distance_to_trend_start: &str,
    ) -> Delivery {
        let trend_age: i64 = distance_to_trend_start
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect::<String>()
            .parse()
            .unwrap_or(0);
        let trend_icon = if trend_age == 0 { "💠" } else { "" };

        let message = format!(
            "🚨 SSL/RSI ADAPTIVE ALERT\n\n\
             Symbol: <b>{}</b>\n\
             Side: {} {}\n\
             Entry: {}\n\n\
             📊 Candle Data:\n\
             ====================\n\
             Size: {}\n\
             Distance to T3: {}\n\
             Position: {}\n\
             Trend Start: {} candles ago {}\n",
            clean_symbol(symbol),
            side,
            side_icon(side),
            entry,
            candle_size,
            distance_to_t3,
            candle_position,
            distance_to_trend_start,
            trend_icon
        );

        self.send(route(kind), &message).await
    }

    /// Watchlist trigger: price reached the stored entry level. Ships with
    /// URL buttons pointing at the trade form.
    #[allow(clippy::too_many_arguments)]
    pub async fn price_alert(
        &self,
        symbol: &str,
        entry_type: &str,
        target_price: f64,
        current_price: f64,
        side: Side,
        margin_amount: f64,
        watchlist_id: i64,
    ) -> Delivery {
        let direction_emoji = if side.is_long() { "📈" } else { "📉" };
        let entry_label = entry_type.replace('_', " ").to_uppercase();

        let message = format!(
            "🚨 <b>Price Alert Triggered!</b>\n\n\
             {} <b>{}</b> ({})\n\
             🎯 Target: ${}\n\
             💰 Current: ${}\n\
             📊 Direction: {}\n\
             💵 Margin: ${}\n\
             🆔 Watch: {}",
            direction_emoji, symbol, entry_label, target_price, current_price, side,
            margin_amount, watchlist_id
        );

        let plain = clean_symbol(symbol);
        let keyboard = json!([[
            {
                "text": format!("{} Open {}", direction_emoji, side),
                "url": format!(
                    "https://bingx.com/en-us/futures/{}?side={}&price={}",
                    plain, side, current_price
                )
            }
        ]]);

        self.send_with_keyboard(Channel::Default, &message, Some(keyboard)).await
    }

    pub async fn order_filled(
        &self,
        symbol: &str,
        side: &str,
        quantity: f64,
        fill_price: f64,
        leverage: i64,
    ) -> Delivery {
        let side_emoji = if side == "BUY" { "📈" } else { "📉" };
        let message = format!(
            "✅ <b>Order Filled!</b>\n\n\
             {} <b>{}</b>\n\
             💰 Size: ${}\n\
             💵 Fill Price: ${}\n\
             ⚡ Leverage: {}x\n\
             🎯 Side: {}",
            side_emoji, symbol, quantity, fill_price, leverage, side
        );
        self.send(Channel::Default, &message).await
    }

    pub async fn order_cancelled(
        &self,
        symbol: &str,
        side: &str,
        quantity: f64,
        price: Option<f64>,
    ) -> Delivery {
        let message = format!(
            "🎯 <b>Order Cancelled</b>\n\n\
             ❌ <b>{}</b>\n\
             💰 Size: ${}\n\
             💵 Price: ${}\n\
             🎯 Side: {}",
            symbol,
            quantity,
            price.unwrap_or(0.0),
            side
        );
        self.send(Channel::Default, &message).await
    }

    pub async fn limit_order_ready(
        &self,
        symbol: &str,
        side: &str,
        entry_price: f64,
        current_price: f64,
        quantity: f64,
        leverage: i64,
    ) -> Delivery {
        let message = format!(
            "⚠️ <b>Limit Order Ready</b>\n\n\
             Symbol: {}\n\
             Side: {}\n\
             Entry Price: {}\n\
             Current Price: {}\n\
             Quantity: {}\n\
             Leverage: {}x\n\n\
             Execute this order manually in the app.",
            symbol, side, entry_price, current_price, quantity, leverage
        );
        self.send(Channel::Default, &message).await
    }

    pub async fn auto_executed(
        &self,
        symbol: &str,
        side: &str,
        entry_price: f64,
        executed_price: f64,
        quantity: f64,
        leverage: i64,
    ) -> Delivery {
        let message = format!(
            "🤖 <b>Auto Executed</b>\n\n\
             Symbol: {}\n\
             Side: {}\n\
             Entry Price: {}\n\
             Executed at: {}\n\
             Quantity: {}\n\
             Leverage: {}x",
            symbol, side, entry_price, executed_price, quantity, leverage
        );
        self.send(Channel::Default, &message).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn stop_loss_triggered(
        &self,
        symbol: &str,
        side: &str,
        entry_price: f64,
        stop_loss: f64,
        close_price: f64,
        pnl_percent: f64,
        leverage: f64,
    ) -> Delivery {
        let message = format!(
            "🔴 <b>Stop Loss Triggered</b>\n\n\
             Symbol: {}\n\
             Side: {}\n\
             Entry Price: {}\n\
             Stop Loss: {}\n\
             Close Price: {}\n\
             P&L: {:.2}%\n\
             Leverage: {}x",
            symbol, side, entry_price, stop_loss, close_price, pnl_percent, leverage
        );
        self.send(Channel::Default, &message).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn target_reached(
        &self,
        symbol: &str,
        side: &str,
        entry_price: f64,
        current_price: f64,
        pnl_percent: f64,
        target_percent: f64,
        leverage: f64,
        auto_closed: bool,
    ) -> Delivery {
        let message = if auto_closed {
            format!(
                "🟢 <b>Target Reached - Auto Closed</b>\n\n\
                 Symbol: {}\n\
                 Side: {}\n\
                 Entry Price: {}\n\
                 Close Price: {}\n\
                 P&L: {:.2}%\n\
                 Target: {}%\n\
                 Leverage: {}x",
                symbol, side, entry_price, current_price, pnl_percent, target_percent, leverage
            )
        } else {
            format!(
                "🎯 <b>Target Reached</b>\n\n\
                 Symbol: {}\n\
                 Side: {}\n\
                 Entry Price: {}\n\
                 Current Price: {}\n\
                 P&L: {:.2}%\n\
                 Target: {}%\n\
                 Leverage: {}x\n\n\
                 Close this position manually in the app.",
                symbol, side, entry_price, current_price, pnl_percent, target_percent, leverage
            )
        };
        self.send(Channel::Default, &message).await
    }

    pub async fn emergency_stop(
        &self,
        symbol: &str,
        side: &str,
        entry_price: f64,
        close_price: f64,
        pnl_percent: f64,
        leverage: f64,
    ) -> Delivery {
        let message = format!(
            "🚨 <b>Emergency Stop Loss</b>\n\n\
             Symbol: {}\n\
             Side: {}\n\
             Entry Price: {}\n\
             Close Price: {}\n\
             P&L: {:.2}%\n\
             Leverage: {}x\n\n\
             Position closed to prevent further losses.",
            symbol, side, entry_price, close_price, pnl_percent, leverage
        );
        self.send(Channel::Default, &message).await
    }

    pub async fn pnl_milestone(
        &self,
        symbol: &str,
        side: &str,
        milestone: &Milestone,
        pnl_amount: f64,
    ) -> Delivery {
        let (emoji, direction) = match milestone.kind {
            MilestoneKind::Profit => ("💰", "PROFIT"),
            MilestoneKind::Loss => ("📉", "LOSS"),
        };

        let message = format!(
            "💰 <b>{} Milestone Reached!</b>\n\n\
             {} <b>{}</b> ({})\n\
             🎯 Milestone: {}%\n\
             📊 Current P&L: {:.2}%\n\
             💵 P&L Amount: ${:.2}",
            direction, emoji, symbol, side, milestone.level, milestone.current_percent, pnl_amount
        );
        self.send(Channel::Default, &message).await
    }

    pub async fn balance_changed(&self, change: &BalanceChange) -> Delivery {
        let (emoji, word) = match change.direction {
            ChangeDirection::Increase => ("📈", "increased"),
            ChangeDirection::Decrease => ("📉", "decreased"),
        };

        let message = format!(
            "💰 <b>Balance Alert</b>\n\n\
             {} Account balance {} by {:.2}%\n\
             📊 Previous: ${:.2}\n\
             📊 Current: ${:.2}\n\
             💵 Change: ${:.2}",
            emoji, word, change.percent, change.old_total, change.new_total, change.delta
        );
        self.send(Channel::Default, &message).await
    }
}

fn side_icon(side: Side) -> &'static str {
    if side.is_long() {
        "🟩"
    } else {
        "🟥"
    }
}

fn clean_symbol(symbol: &str) -> String {
    symbol.replace("-USDT", "")
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// FVG depth bar for H/M/L hit levels.
fn fvg_depth_bar(levels: &str) -> &'static str {
    let levels = levels.to_uppercase();

    const BAR_H: &str = "🟧🟧⬜⬜⬜⬜⬜⬜";
    const BAR_M: &str = "⬜⬜🟨🟨⬜⬜⬜⬜";
    const BAR_HM: &str = "🟧🟧🟨🟨⬜⬜⬜⬜";
    const BAR_L: &str = "⬜⬜⬜⬜🟩🟩⬜⬜";
    const BAR_HML: &str = "🟧🟧🟨🟨🟩🟩⬜⬜";
    const BAR_FULL: &str = "🟧🟧🟨🟨🟩🟩🟦🟪";

    if levels.len() > 3 {
        return BAR_FULL;
    }
    match levels.as_str() {
        "H" => BAR_H,
        "M" => BAR_M,
        "HM" => BAR_HM,
        "L" => BAR_L,
        "HML" | "ML" => BAR_HML,
        other => {
            // Fallback: infer by distinct level characters.
            let mut seen = [false; 3];
            for c in other.chars() {
                match c {
                    'H' => seen[0] = true,
                    'M' => seen[1] = true,
                    'L' => seen[2] = true,
                    _ => {}
                }
            }
            match seen.iter().filter(|s| **s).count() {
                n if n >= 3 => BAR_HML,
                2 => BAR_HM,
                _ => BAR_H,
            }
        }
    }
}

/// "HML" -> "25%, 50%, 75%".
fn level_depth(levels: &str) -> String {
    let parts: Vec<&str> = levels
        .to_uppercase()
        .chars()
        .filter_map(|c| match c {
            'H' => Some("25%"),
            'M' => Some("50%"),
            'L' => Some("75%"),
            _ => None,
        })
        .collect();
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_bar_mapping() {
        assert_eq!(fvg_depth_bar("H"), "🟧🟧⬜⬜⬜⬜⬜⬜");
        assert_eq!(fvg_depth_bar("hm"), "🟧🟧🟨🟨⬜⬜⬜⬜");
        assert_eq!(fvg_depth_bar("HML"), "🟧🟧🟨🟨🟩🟩⬜⬜");
        assert_eq!(fvg_depth_bar("ML"), "🟧🟧🟨🟨🟩🟩⬜⬜");
        assert_eq!(fvg_depth_bar("HMLX"), "🟧🟧🟨🟨🟩🟩🟦🟪");
    }

    #[test]
    fn test_level_depth_formatting() {
        assert_eq!(level_depth("HML"), "25%, 50%, 75%");
        assert_eq!(level_depth("H"), "25%");
        assert_eq!(level_depth("ml"), "50%, 75%");
    }

    #[test]
    fn test_channel_routing() {
        assert_eq!(route(SignalKind::InTrend), Channel::Admin);
        assert_eq!(route(SignalKind::IchimokuAfterCross), Channel::Admin);
        assert_eq!(route(SignalKind::UpTrend), Channel::Blue);
        assert_eq!(route(SignalKind::Fvg), Channel::Fvg);
        assert_eq!(route(SignalKind::LnlSignal), Channel::Fvg);
        assert_eq!(route(SignalKind::TradingSignal), Channel::Default);
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("a < b & c > d"), "a &lt; b &amp; c &gt; d");
    }

    #[tokio::test]
    async fn test_disabled_notifier_degrades_to_failure_record() {
        let notifier = TelegramNotifier::new(TelegramConfig {
            enabled: false,
            bot_token: Some("t".to_string()),
            chat_id: Some("c".to_string()),
            admin_bot_token: None,
            admin_chat_id: None,
            fvg_bot_token: None,
            fvg_chat_id: None,
            blue_bot_token: None,
            blue_chat_id: None,
        });
        let delivery = notifier.send(Channel::Default, "hello").await;
        assert!(!delivery.ok);
        assert_eq!(delivery.detail, "Telegram disabled");
    }

    #[tokio::test]
    async fn test_missing_credentials_degrade_to_failure_record() {
        let notifier = TelegramNotifier::new(TelegramConfig {
            enabled: true,
            bot_token: None,
            chat_id: None,
            admin_bot_token: None,
            admin_chat_id: None,
            fvg_bot_token: None,
            fvg_chat_id: None,
            blue_bot_token: None,
            blue_chat_id: None,
        });
        let delivery = notifier.send(Channel::Admin, "hello").await;
        assert!(!delivery.ok);
        assert_eq!(delivery.detail, "Telegram credentials missing");
    }
}
