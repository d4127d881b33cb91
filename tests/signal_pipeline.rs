use bingx_signal_bot::config::TradingConfig;
use bingx_signal_bot::signal::{self, PriceToken, Side, StopLossField};
use bingx_signal_bot::storage::{NewSignal, Store};
use bingx_signal_bot::webhook::{
    build_trading_plan, classify, validate_import, validate_required, ImportRequest,
    SignalPayload,
};

fn webhook_body(json: &str) -> SignalPayload {
    serde_json::from_str(json).expect("payload parses")
}

#[test]
fn test_webhook_payload_to_plan() {
    // A typical charting-tool alert: mixed numeric and percentage tokens.
    let payload = webhook_body(
        r#"{
            "symbol": "btcusdt",
            "side": "LONG",
            "leverage": 10,
            "entries": [45000, 44500],
            "targets": ["2%", "4%"],
            "stop_loss": ["3%"]
        }"#,
    );

    validate_required(&payload).expect("symbol and side present");
    assert_eq!(
        classify(&payload).unwrap(),
        bingx_signal_bot::signal::SignalKind::TradingSignal
    );

    let plan = build_trading_plan(&payload, None, &TradingConfig::default()).unwrap();
    assert_eq!(plan.symbol, "BTCUSDT");
    assert_eq!(plan.leverage, 10);
    assert!((plan.resolved.take_profits[0].unwrap() - 45900.0).abs() < 1e-6);
    assert!((plan.resolved.take_profits[1].unwrap() - 46800.0).abs() < 1e-6);
    assert!((plan.resolved.stop_loss - 43650.0).abs() < 1e-6);
}

#[test]
fn test_minimal_payload_gets_market_defaults() {
    // No entries/targets/stop: everything defaults off the market price.
    let payload = webhook_body(
        r#"{ "symbol": "ETHUSDT", "side": "long", "type": "TRADING_SIGNAL" }"#,
    );

    let plan = build_trading_plan(&payload, Some(2000.0), &TradingConfig::default()).unwrap();

    assert_eq!(plan.leverage, 6);
    assert_eq!(plan.resolved.entries[0], Some(2000.0));
    assert!((plan.resolved.entries[1].unwrap() - 1960.0).abs() < 1e-9); // -2%
    assert!((plan.resolved.take_profits[0].unwrap() - 2040.0).abs() < 1e-9); // +2%
    assert!((plan.resolved.stop_loss - 1900.0).abs() < 1e-9); // -5%
}

#[test]
fn test_non_trading_payload_requires_type() {
    let payload = webhook_body(r#"{ "symbol": "BTCUSDT", "side": "LONG" }"#);
    assert!(validate_required(&payload).is_err());

    let payload = webhook_body(
        r#"{ "symbol": "BTCUSDT", "side": "LONG", "type": "T3_SSL", "entry": "45000" }"#,
    );
    assert!(validate_required(&payload).is_ok());
    assert_eq!(
        classify(&payload).unwrap(),
        bingx_signal_bot::signal::SignalKind::T3Ssl
    );
}

#[tokio::test]
async fn test_import_flow_persists_resolved_prices() {
    let store = Store::connect("sqlite::memory:").await.unwrap();

    let request = ImportRequest {
        symbol: "BTC-USDT".to_string(),
        side: "SHORT".to_string(),
        leverage: 6,
        entries: vec![PriceToken::Price(45000.0)],
        targets: vec![PriceToken::Text("2%".to_string())],
        stop_loss: StopLossField::Many(vec![PriceToken::Text("3%".to_string())]),
        external_signal_id: Some("ext-1".to_string()),
        confidence_score: Some(7.5),
        notes: None,
        risk_reward_ratio: None,
    };

    let side = validate_import(&request).unwrap();
    assert_eq!(side, Side::Short);

    let resolved = signal::resolve_prices(
        &request.entries,
        &request.targets,
        request.stop_loss.first(),
        side,
        5.0,
    );

    let id = store
        .insert_signal(&NewSignal {
            symbol: "BTCUSDT".to_string(),
            side: side.as_str().to_string(),
            entry_market_price: resolved.entries[0],
            entry_2: resolved.entries[1],
            entry_3: resolved.entries[2],
            take_profits: resolved.take_profits,
            stop_loss: Some(resolved.stop_loss),
            leverage: request.leverage,
            source_name: "JSON Import".to_string(),
            external_signal_id: request.external_signal_id.clone(),
            confidence_score: request.confidence_score.unwrap_or(0.0),
            notes: None,
            risk_reward_ratio: 0.0,
            auto_created: true,
        })
        .await
        .unwrap();

    let row = store.signal(id).await.unwrap().unwrap();
    assert_eq!(row.side, "SHORT");
    // Short: target 2% below entry, stop 3% above.
    assert!((row.take_profit_1.unwrap() - 44100.0).abs() < 1e-6);
    assert!((row.stop_loss.unwrap() - 46350.0).abs() < 1e-6);
    assert_eq!(row.external_signal_id.as_deref(), Some("ext-1"));
    assert_eq!(row.status, "ACTIVE");
}

#[test]
fn test_progress_matches_documented_scale() {
    // 5% or more away: 0. Linear ramp to 100 at the target.
    assert_eq!(signal::entry_progress(100.0, 94.0), 0.0);
    assert!((signal::entry_progress(100.0, 96.0) - 20.0).abs() < 1e-9);
    assert!((signal::entry_progress(100.0, 99.0) - 80.0).abs() < 1e-9);
    assert!((signal::entry_progress(100.0, 100.0) - 100.0).abs() < 1e-9);
    // Same scale when the entry sits above the market (short entries).
    assert!((signal::entry_progress(100.0, 104.0) - 20.0).abs() < 1e-9);
}
