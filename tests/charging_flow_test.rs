//! End-to-end charging scenarios over the full router/session/store stack.

mod common;

use common::{Harness, TestCharger};
use rust_decimal::Decimal;
use serde_json::json;
use voltra_csms::domain::charging_session::SessionStatus;
use voltra_csms::domain::repositories::RepositoryProvider;
use voltra_csms::support::ocpp_frame::OcppFrame;

fn result_payload(frame: OcppFrame) -> serde_json::Value {
    match frame {
        OcppFrame::CallResult { payload, .. } => payload,
        other => panic!("expected CallResult, got {:?}", other),
    }
}

#[tokio::test]
async fn happy_path_charge() {
    let harness = Harness::start().await;
    harness.seed_tag("T1").await;
    harness
        .seed_priced_charge_point("CP-001", Decimal::new(270000, 2))
        .await;

    let mut charger = TestCharger::connect(&harness, "CP-001").await;
    charger.boot("V", "M").await;

    // Connector becomes Available
    charger
        .send_call(
            "m-status",
            "StatusNotification",
            json!({"connectorId": 1, "status": "Available", "errorCode": "NoError"}),
        )
        .await;
    charger.recv_frame().await;

    // Charger starts a transaction
    charger
        .send_call(
            "m-start",
            "StartTransaction",
            json!({
                "connectorId": 1,
                "idTag": "T1",
                "meterStart": 1000,
                "timestamp": "2025-01-01T00:00:00Z"
            }),
        )
        .await;
    let start = result_payload(charger.recv_frame().await);
    assert_eq!(start["idTagInfo"]["status"], "Accepted");
    let transaction_id = start["transactionId"].as_i64().unwrap() as i32;
    assert_eq!(transaction_id, 1);

    // One meter sample at 1500 Wh
    charger
        .send_call(
            "m-meter",
            "MeterValues",
            json!({
                "connectorId": 1,
                "transactionId": transaction_id,
                "meterValue": [{
                    "timestamp": "2025-01-01T00:02:30Z",
                    "sampledValue": [{
                        "value": "1500",
                        "measurand": "Energy.Active.Import.Register",
                        "unit": "Wh"
                    }]
                }]
            }),
        )
        .await;
    charger.recv_frame().await;

    // Stop at 1500 Wh
    charger
        .send_call(
            "m-stop",
            "StopTransaction",
            json!({
                "transactionId": transaction_id,
                "meterStop": 1500,
                "timestamp": "2025-01-01T00:05:00Z"
            }),
        )
        .await;
    let stop = result_payload(charger.recv_frame().await);
    assert_eq!(stop["idTagInfo"]["status"], "Accepted");

    // Store state: one completed session, correct meters, settled order
    let session = harness
        .repos
        .sessions()
        .find_by_transaction("CP-001", transaction_id)
        .await
        .unwrap()
        .expect("session exists");
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.meter_start, 1000);
    assert_eq!(session.meter_stop, Some(1500));
    assert_eq!(session.energy_kwh(), Some(Decimal::new(500, 3))); // 0.5 kWh

    let samples = harness
        .repos
        .meter_values()
        .find_for_session(session.id)
        .await
        .unwrap();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].session_id, session.id);
    assert_eq!(samples[0].value_wh, 1500);

    let order = harness
        .repos
        .orders()
        .find_by_session(session.id)
        .await
        .unwrap()
        .expect("order settled");
    // 0.5 kWh × 2700.00 COP = 1350.00 COP
    assert_eq!(order.total_amount, Decimal::new(135000, 2));
}

#[tokio::test]
async fn duplicate_delivery_yields_identical_result_and_single_session() {
    let harness = Harness::start().await;
    harness.seed_tag("T1").await;

    let mut charger = TestCharger::connect(&harness, "CP-001").await;
    charger.boot("V", "M").await;

    let payload = json!({
        "connectorId": 1,
        "idTag": "T1",
        "meterStart": 0,
        "timestamp": "2025-01-01T00:00:00Z"
    });
    charger.send_call("m-42", "StartTransaction", payload.clone()).await;
    let first = charger.recv_text().await;

    // Same messageId delivered again (MQTT QoS 1 redelivery)
    charger.send_call("m-42", "StartTransaction", payload).await;
    let second = charger.recv_text().await;

    assert_eq!(first, second, "replay must be byte-identical");

    let active = harness
        .repos
        .sessions()
        .find_active_for_charge_point("CP-001")
        .await
        .unwrap();
    assert_eq!(active.len(), 1, "exactly one session created");
}

#[tokio::test]
async fn reconnect_mid_transaction_finalizes_existing_session() {
    let harness = Harness::start().await;
    harness.seed_tag("T1").await;

    let mut charger = TestCharger::connect(&harness, "CP-001").await;
    charger.boot("V", "M").await;

    charger
        .send_call(
            "m-start",
            "StartTransaction",
            json!({"connectorId": 1, "idTag": "T1", "meterStart": 2000, "timestamp": "2025-01-01T00:00:00Z"}),
        )
        .await;
    let start = result_payload(charger.recv_frame().await);
    let transaction_id = start["transactionId"].as_i64().unwrap() as i32;

    // Connection drops; the session stays active
    charger.disconnect().await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let active = harness
        .repos
        .sessions()
        .find_active_for_charge_point("CP-001")
        .await
        .unwrap();
    assert_eq!(active.len(), 1);

    // Charger reconnects and stops the old transaction
    charger.reconnect(&harness).await;
    charger
        .send_call(
            "m-stop",
            "StopTransaction",
            json!({"transactionId": transaction_id, "meterStop": 2500, "timestamp": "2025-01-01T00:10:00Z"}),
        )
        .await;
    let stop = result_payload(charger.recv_frame().await);
    assert_eq!(stop["idTagInfo"]["status"], "Accepted");

    let session = harness
        .repos
        .sessions()
        .find_by_transaction("CP-001", transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.meter_stop, Some(2500));

    // No second session was created
    let all = harness
        .repos
        .sessions()
        .find_recent(10)
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn second_start_on_same_connector_is_concurrent_tx() {
    let harness = Harness::start().await;
    harness.seed_tag("T1").await;
    harness.seed_tag("T2").await;

    let mut charger = TestCharger::connect(&harness, "CP-001").await;
    charger.boot("V", "M").await;

    charger
        .send_call(
            "m-1",
            "StartTransaction",
            json!({"connectorId": 1, "idTag": "T1", "meterStart": 0, "timestamp": "2025-01-01T00:00:00Z"}),
        )
        .await;
    let first = result_payload(charger.recv_frame().await);
    assert_eq!(first["idTagInfo"]["status"], "Accepted");

    // A different messageId (outside the dedup hit) racing onto the same
    // connector
    charger
        .send_call(
            "m-2",
            "StartTransaction",
            json!({"connectorId": 1, "idTag": "T2", "meterStart": 5, "timestamp": "2025-01-01T00:00:01Z"}),
        )
        .await;
    let second = result_payload(charger.recv_frame().await);
    assert_eq!(second["idTagInfo"]["status"], "ConcurrentTx");

    let active = harness
        .repos
        .sessions()
        .find_active_for_charge_point("CP-001")
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id_tag, "T1");
}

#[tokio::test]
async fn double_stop_is_accepted_without_mutation() {
    let harness = Harness::start().await;
    harness.seed_tag("T1").await;

    let mut charger = TestCharger::connect(&harness, "CP-001").await;
    charger.boot("V", "M").await;

    charger
        .send_call(
            "m-start",
            "StartTransaction",
            json!({"connectorId": 1, "idTag": "T1", "meterStart": 100, "timestamp": "2025-01-01T00:00:00Z"}),
        )
        .await;
    let tx = result_payload(charger.recv_frame().await)["transactionId"]
        .as_i64()
        .unwrap() as i32;

    charger
        .send_call(
            "m-stop-1",
            "StopTransaction",
            json!({"transactionId": tx, "meterStop": 600, "timestamp": "2025-01-01T00:05:00Z"}),
        )
        .await;
    assert_eq!(
        result_payload(charger.recv_frame().await)["idTagInfo"]["status"],
        "Accepted"
    );

    // Stop again with a different meter value: Accepted, nothing changes
    charger
        .send_call(
            "m-stop-2",
            "StopTransaction",
            json!({"transactionId": tx, "meterStop": 999, "timestamp": "2025-01-01T00:06:00Z"}),
        )
        .await;
    assert_eq!(
        result_payload(charger.recv_frame().await)["idTagInfo"]["status"],
        "Accepted"
    );

    let session = harness
        .repos
        .sessions()
        .find_by_transaction("CP-001", tx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.meter_stop, Some(600));
}

#[tokio::test]
async fn unauthorized_tag_is_rejected() {
    let harness = Harness::start().await;

    let mut charger = TestCharger::connect(&harness, "CP-001").await;
    charger.boot("V", "M").await;

    charger
        .send_call(
            "m-start",
            "StartTransaction",
            json!({"connectorId": 1, "idTag": "UNKNOWN", "meterStart": 0, "timestamp": "2025-01-01T00:00:00Z"}),
        )
        .await;
    let response = result_payload(charger.recv_frame().await);
    assert_eq!(response["idTagInfo"]["status"], "Invalid");
    assert_eq!(response["transactionId"], 0);

    let active = harness
        .repos
        .sessions()
        .find_active_for_charge_point("CP-001")
        .await
        .unwrap();
    assert!(active.is_empty());
}

#[tokio::test]
async fn malformed_frame_is_discarded_without_closing() {
    let harness = Harness::start().await;
    let mut charger = TestCharger::connect(&harness, "CP-001").await;
    charger.boot("V", "M").await;

    // One piece of garbage is tolerated
    charger.send_raw("this is not json").await;

    // The channel still works
    charger.send_call("m-hb", "Heartbeat", json!({})).await;
    let frame = charger.recv_frame().await;
    assert!(frame.is_call_result());
}

#[tokio::test]
async fn unknown_action_gets_not_implemented() {
    let harness = Harness::start().await;
    let mut charger = TestCharger::connect(&harness, "CP-001").await;
    charger.boot("V", "M").await;

    charger.send_call("m-x", "MakeCoffee", json!({})).await;
    match charger.recv_frame().await {
        OcppFrame::CallError {
            message_id,
            error_code,
            ..
        } => {
            assert_eq!(message_id, "m-x");
            assert_eq!(error_code, "NotImplemented");
        }
        other => panic!("expected CallError, got {:?}", other),
    }
}
