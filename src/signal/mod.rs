use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Parse the side field of an incoming payload. Charting tools are not
    /// consistent about the vocabulary, so the buy/sell and up/down synonyms
    /// are accepted too.
    pub fn parse(raw: &str) -> Result<Self, SignalError> {
        match raw.trim().to_uppercase().as_str() {
            "LONG" | "BUY" | "UP" => Ok(Side::Long),
            "SHORT" | "SELL" | "DOWN" => Ok(Side::Short),
            other => Err(SignalError::InvalidSide(other.to_string())),
        }
    }

    pub fn is_long(&self) -> bool {
        matches!(self, Side::Long)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Long => "LONG",
            Side::Short => "SHORT",
        }
    }

    /// Order side that opens a position in this direction.
    pub fn order_side(&self) -> &'static str {
        match self {
            Side::Long => "BUY",
            Side::Short => "SELL",
        }
    }

    /// Order side that closes a position in this direction.
    pub fn closing_side(&self) -> &'static str {
        match self {
            Side::Long => "SELL",
            Side::Short => "BUY",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified signal type of an incoming webhook payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    TradingSignal,
    Fvg,
    FvgTouch,
    LnlSignal,
    TriggerCross,
    T3Ssl,
    IchimokuBeforeCross,
    IchimokuAfterCross,
    InTrend,
    UpTrend,
}

impl SignalKind {
    pub fn parse(raw: &str) -> Result<Self, SignalError> {
        match raw.trim().to_uppercase().as_str() {
            "TRADING_SIGNAL" => Ok(SignalKind::TradingSignal),
            "FVG" => Ok(SignalKind::Fvg),
            "FVGTOUCH" => Ok(SignalKind::FvgTouch),
            "LNL_SIGNAL" => Ok(SignalKind::LnlSignal),
            "TRIGGER_CROSS" => Ok(SignalKind::TriggerCross),
            "T3_SSL" => Ok(SignalKind::T3Ssl),
            "ICHIMOKU_BEFORE_CROSS" => Ok(SignalKind::IchimokuBeforeCross),
            "ICHIMOKU_AFTER_CROSS" => Ok(SignalKind::IchimokuAfterCross),
            "IN_TREND" => Ok(SignalKind::InTrend),
            "UP_TREND" => Ok(SignalKind::UpTrend),
            other => Err(SignalError::UnsupportedType(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::TradingSignal => "TRADING_SIGNAL",
            SignalKind::Fvg => "FVG",
            SignalKind::FvgTouch => "FVGTOUCH",
            SignalKind::LnlSignal => "LNL_SIGNAL",
            SignalKind::TriggerCross => "TRIGGER_CROSS",
            SignalKind::T3Ssl => "T3_SSL",
            SignalKind::IchimokuBeforeCross => "ICHIMOKU_BEFORE_CROSS",
            SignalKind::IchimokuAfterCross => "ICHIMOKU_AFTER_CROSS",
            SignalKind::InTrend => "IN_TREND",
            SignalKind::UpTrend => "UP_TREND",
        }
    }

    /// Kinds that continue into the trading-signal pipeline after their
    /// dedicated alert has been dispatched.
    pub fn continues_to_trading(&self) -> bool {
        matches!(
            self,
            SignalKind::TradingSignal
                | SignalKind::TriggerCross
                | SignalKind::IchimokuBeforeCross
                | SignalKind::IchimokuAfterCross
                | SignalKind::InTrend
                | SignalKind::UpTrend
        )
    }
}

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("Field 'side' must be 'LONG' or 'SHORT', got '{0}'")]
    InvalidSide(String),
    #[error("Unsupported signal type: {0}")]
    UnsupportedType(String),
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
    #[error("{0}")]
    Invalid(String),
}

/// A price token from an incoming payload: either an absolute price or a
/// percentage offset. A token counts as a percentage when it contains `%`
/// anywhere, so both `"2%"` and `"%2"` mean two percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceToken {
    Price(f64),
    Text(String),
}

impl PriceToken {
    /// Fractional percentage (2% -> 0.02), or None for absolute tokens.
    pub fn percentage(&self) -> Option<f64> {
        match self {
            PriceToken::Text(s) if s.contains('%') => {
                s.replace('%', "").trim().parse::<f64>().ok().map(|v| v / 100.0)
            }
            _ => None,
        }
    }

    /// Absolute price value of the token. Non-numeric text collapses to 0.0,
    /// matching the lenient coercion of the upstream tooling this feed
    /// originates from.
    pub fn as_price(&self) -> f64 {
        match self {
            PriceToken::Price(p) => *p,
            PriceToken::Text(s) => s.replace('%', "").trim().parse().unwrap_or(0.0),
        }
    }
}

/// Stop loss arrives either as a bare token or a one-element array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StopLossField {
    One(PriceToken),
    Many(Vec<PriceToken>),
}

impl StopLossField {
    pub fn first(&self) -> Option<&PriceToken> {
        match self {
            StopLossField::One(t) => Some(t),
            StopLossField::Many(v) => v.first(),
        }
    }
}

pub const MAX_ENTRIES: usize = 3;
pub const MAX_TARGETS: usize = 5;

/// Target price for a percentage offset: profit direction is up for longs
/// and down for shorts.
pub fn target_price(entry: f64, pct: f64, side: Side) -> f64 {
    match side {
        Side::Long => entry * (1.0 + pct),
        Side::Short => entry * (1.0 - pct),
    }
}

/// Stop-loss price for a percentage offset: loss direction is down for longs
/// and up for shorts.
pub fn stop_loss_price(entry: f64, pct: f64, side: Side) -> f64 {
    match side {
        Side::Long => entry * (1.0 - pct),
        Side::Short => entry * (1.0 + pct),
    }
}

/// Default entry ladder when a signal carries no entries: the current market
/// price plus a second entry `spread_pct` percent into the pullback
/// direction (below market for longs, above for shorts).
pub fn default_entries(market_price: f64, side: Side, spread_pct: f64) -> Vec<f64> {
    let factor = spread_pct / 100.0;
    let entry_2 = match side {
        Side::Long => market_price * (1.0 - factor),
        Side::Short => market_price * (1.0 + factor),
    };
    vec![market_price, entry_2]
}

/// Fully resolved price set of a trading signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPrices {
    pub entries: [Option<f64>; MAX_ENTRIES],
    pub take_profits: [Option<f64>; MAX_TARGETS],
    pub stop_loss: f64,
}

/// Resolve entry/target/stop tokens into absolute prices. Percentage tokens
/// are anchored on the first entry; entries beyond three and targets beyond
/// five are ignored.
pub fn resolve_prices(
    entries: &[PriceToken],
    targets: &[PriceToken],
    stop_loss: Option<&PriceToken>,
    side: Side,
    default_stop_pct: f64,
) -> ResolvedPrices {
    let mut resolved_entries = [None; MAX_ENTRIES];
    for (slot, token) in resolved_entries.iter_mut().zip(entries.iter()) {
        *slot = Some(token.as_price());
    }

    let anchor = resolved_entries[0].unwrap_or(0.0);

    let mut take_profits = [None; MAX_TARGETS];
    for (slot, token) in take_profits.iter_mut().zip(targets.iter()) {
        *slot = Some(match token.percentage() {
            Some(pct) => target_price(anchor, pct, side),
            None => token.as_price(),
        });
    }

    let stop_loss = match stop_loss {
        Some(token) => match token.percentage() {
            Some(pct) => stop_loss_price(anchor, pct, side),
            None => token.as_price(),
        },
        None => stop_loss_price(anchor, default_stop_pct / 100.0, side),
    };

    ResolvedPrices {
        entries: resolved_entries,
        take_profits,
        stop_loss,
    }
}

/// Leveraged unrealized P&L as a percentage of margin.
pub fn pnl_percent(entry_price: f64, current_price: f64, side: Side, leverage: f64) -> f64 {
    if entry_price == 0.0 {
        return 0.0;
    }
    let price_change = match side {
        Side::Long => (current_price - entry_price) / entry_price,
        Side::Short => (entry_price - current_price) / entry_price,
    };
    price_change * leverage * 100.0
}

/// Percentage range over which the pending-order progress value ramps up.
pub const PROGRESS_RANGE_PCT: f64 = 5.0;

/// Progress toward a pending entry as a 0..=100 value: zero while the price
/// is 5% or further away, scaling linearly to 100 as the distance closes.
/// Symmetric for long and short entries.
pub fn entry_progress(current_price: f64, target_price: f64) -> f64 {
    if current_price <= 0.0 {
        return 0.0;
    }
    let distance_pct = ((target_price - current_price) / current_price * 100.0).abs();
    if distance_pct >= PROGRESS_RANGE_PCT {
        return 0.0;
    }
    ((PROGRESS_RANGE_PCT - distance_pct) / PROGRESS_RANGE_PCT * 100.0).clamp(0.0, 100.0)
}

/// Minimum balance movement that warrants a notification.
pub const BALANCE_NOTIFY_THRESHOLD_PCT: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeDirection {
    Increase,
    Decrease,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BalanceChange {
    pub direction: ChangeDirection,
    pub percent: f64,
    pub old_total: f64,
    pub new_total: f64,
    pub delta: f64,
}

/// Compare two balance snapshots; Some when the move is at least 5% in
/// either direction.
pub fn balance_change(old_total: f64, new_total: f64) -> Option<BalanceChange> {
    if old_total == 0.0 {
        return None;
    }
    let percent = (new_total - old_total) / old_total * 100.0;
    if percent.abs() < BALANCE_NOTIFY_THRESHOLD_PCT {
        return None;
    }
    Some(BalanceChange {
        direction: if percent > 0.0 {
            ChangeDirection::Increase
        } else {
            ChangeDirection::Decrease
        },
        percent: percent.abs(),
        old_total,
        new_total,
        delta: new_total - old_total,
    })
}

pub const PROFIT_MILESTONES: [f64; 3] = [10.0, 25.0, 50.0];
pub const LOSS_MILESTONES: [f64; 3] = [-10.0, -25.0, -50.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MilestoneKind {
    Profit,
    Loss,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Milestone {
    pub kind: MilestoneKind,
    pub level: f64,
    pub current_percent: f64,
}

/// First P&L milestone newly crossed between two sync cycles. A milestone
/// fires only on the cycle whose update moves the percentage across it, so
/// each level notifies once per crossing.
pub fn crossed_milestone(old_percent: f64, new_percent: f64) -> Option<Milestone> {
    for level in PROFIT_MILESTONES {
        if old_percent < level && new_percent >= level {
            return Some(Milestone {
                kind: MilestoneKind::Profit,
                level,
                current_percent: new_percent,
            });
        }
    }
    for level in LOSS_MILESTONES {
        if old_percent > level && new_percent <= level {
            return Some(Milestone {
                kind: MilestoneKind::Loss,
                level: level.abs(),
                current_percent: new_percent,
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pct(s: &str) -> PriceToken {
        PriceToken::Text(s.to_string())
    }

    #[test]
    fn test_long_targets_and_stop() {
        // entries=[45000, 44500], targets=["2%","4%"], stop=["3%"], LONG
        let entries = vec![PriceToken::Price(45000.0), PriceToken::Price(44500.0)];
        let targets = vec![pct("2%"), pct("4%")];
        let stop = pct("3%");

        let resolved = resolve_prices(&entries, &targets, Some(&stop), Side::Long, 5.0);

        assert_eq!(resolved.entries[0], Some(45000.0));
        assert_eq!(resolved.entries[1], Some(44500.0));
        assert_eq!(resolved.entries[2], None);
        assert!((resolved.take_profits[0].unwrap() - 45900.0).abs() < 1e-6);
        assert!((resolved.take_profits[1].unwrap() - 46800.0).abs() < 1e-6);
        assert!((resolved.stop_loss - 43650.0).abs() < 1e-6);
    }

    #[test]
    fn test_short_stop_moves_up() {
        let entries = vec![PriceToken::Price(45000.0)];
        let targets = vec![pct("2%")];
        let stop = pct("3%");

        let resolved = resolve_prices(&entries, &targets, Some(&stop), Side::Short, 5.0);

        assert!((resolved.stop_loss - 46350.0).abs() < 1e-6);
        // Short targets move down.
        assert!((resolved.take_profits[0].unwrap() - 44100.0).abs() < 1e-6);
    }

    #[test]
    fn test_percent_sign_position_is_irrelevant() {
        assert_eq!(pct("%2").percentage(), Some(0.02));
        assert_eq!(pct("2%").percentage(), Some(0.02));
        assert_eq!(pct("2.5%").percentage(), Some(0.025));
        assert_eq!(PriceToken::Price(45000.0).percentage(), None);
    }

    #[test]
    fn test_absolute_tokens_pass_through() {
        let entries = vec![PriceToken::Price(100.0)];
        let targets = vec![PriceToken::Price(110.0), pct("107")];
        let resolved = resolve_prices(&entries, &targets, None, Side::Long, 5.0);
        assert_eq!(resolved.take_profits[0], Some(110.0));
        assert_eq!(resolved.take_profits[1], Some(107.0));
        // Default stop loss is 5% below entry for longs.
        assert!((resolved.stop_loss - 95.0).abs() < 1e-9);
    }

    #[test]
    fn test_excess_entries_and_targets_ignored() {
        let entries: Vec<PriceToken> = (0..5).map(|i| PriceToken::Price(100.0 + i as f64)).collect();
        let targets: Vec<PriceToken> = (0..7).map(|_| pct("1%")).collect();
        let resolved = resolve_prices(&entries, &targets, None, Side::Long, 5.0);
        assert!(resolved.entries.iter().all(|e| e.is_some()));
        assert!(resolved.take_profits.iter().all(|t| t.is_some()));
        // Arrays are capped at 3 and 5.
        assert_eq!(resolved.entries.len(), MAX_ENTRIES);
        assert_eq!(resolved.take_profits.len(), MAX_TARGETS);
    }

    #[test]
    fn test_default_entries_spread() {
        let long = default_entries(50000.0, Side::Long, 2.0);
        assert_eq!(long[0], 50000.0);
        assert!((long[1] - 49000.0).abs() < 1e-6);
        let short = default_entries(50000.0, Side::Short, 2.0);
        assert_eq!(short[0], 50000.0);
        assert!((short[1] - 51000.0).abs() < 1e-6);
    }

    #[test]
    fn test_side_synonyms() {
        assert_eq!(Side::parse("long").unwrap(), Side::Long);
        assert_eq!(Side::parse("Buy").unwrap(), Side::Long);
        assert_eq!(Side::parse("SELL").unwrap(), Side::Short);
        assert_eq!(Side::parse("down").unwrap(), Side::Short);
        assert!(Side::parse("sideways").is_err());
    }

    #[test]
    fn test_pnl_percent_leveraged() {
        // +1% price move at 10x = +10%
        assert!((pnl_percent(100.0, 101.0, Side::Long, 10.0) - 10.0).abs() < 1e-9);
        // Same move is -10% for a short.
        assert!((pnl_percent(100.0, 101.0, Side::Short, 10.0) + 10.0).abs() < 1e-9);
        assert_eq!(pnl_percent(0.0, 101.0, Side::Long, 10.0), 0.0);
    }

    #[test]
    fn test_entry_progress_bounds() {
        // 5% away or more: no progress yet.
        assert_eq!(entry_progress(100.0, 95.0), 0.0);
        assert_eq!(entry_progress(100.0, 90.0), 0.0);
        assert_eq!(entry_progress(100.0, 105.0), 0.0);
        // At the target: full bar.
        assert!((entry_progress(100.0, 100.0) - 100.0).abs() < 1e-9);
        // Halfway through the 5% range: 50%.
        assert!((entry_progress(100.0, 97.5) - 50.0).abs() < 1e-9);
        // Symmetric above and below.
        assert!((entry_progress(100.0, 102.5) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_balance_change_threshold() {
        assert!(balance_change(1000.0, 1049.0).is_none());
        let up = balance_change(1000.0, 1050.0).unwrap();
        assert_eq!(up.direction, ChangeDirection::Increase);
        assert!((up.percent - 5.0).abs() < 1e-9);
        let down = balance_change(1000.0, 900.0).unwrap();
        assert_eq!(down.direction, ChangeDirection::Decrease);
        assert!((down.delta + 100.0).abs() < 1e-9);
        assert!(balance_change(0.0, 500.0).is_none());
    }

    #[test]
    fn test_milestone_fires_once_per_crossing() {
        // Crossing 10% fires.
        let m = crossed_milestone(8.0, 12.0).unwrap();
        assert_eq!(m.kind, MilestoneKind::Profit);
        assert_eq!(m.level, 10.0);
        // Staying above it does not re-fire.
        assert!(crossed_milestone(12.0, 14.0).is_none());
        // Next level up fires separately.
        let m = crossed_milestone(14.0, 26.0).unwrap();
        assert_eq!(m.level, 25.0);
        // Loss side mirrors.
        let m = crossed_milestone(-8.0, -11.0).unwrap();
        assert_eq!(m.kind, MilestoneKind::Loss);
        assert_eq!(m.level, 10.0);
        assert!(crossed_milestone(-11.0, -12.0).is_none());
    }

    #[test]
    fn test_signal_kind_routing() {
        assert!(SignalKind::parse("TRIGGER_CROSS").unwrap().continues_to_trading());
        assert!(SignalKind::parse("IN_TREND").unwrap().continues_to_trading());
        assert!(!SignalKind::parse("FVG").unwrap().continues_to_trading());
        assert!(!SignalKind::parse("T3_SSL").unwrap().continues_to_trading());
        assert!(SignalKind::parse("SOMETHING_ELSE").is_err());
    }
}
