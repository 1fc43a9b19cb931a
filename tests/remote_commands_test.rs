//! Server-initiated command scenarios: remote start/stop correlation,
//! offline rejection and the in-flight serialization rule.

mod common;

use common::{Harness, TestCharger};
use serde_json::json;
use voltra_csms::support::ocpp_frame::OcppFrame;

fn call_parts(frame: OcppFrame) -> (String, String, serde_json::Value) {
    match frame {
        OcppFrame::Call {
            message_id,
            action,
            payload,
        } => (message_id, action, payload),
        other => panic!("expected Call, got {:?}", other),
    }
}

#[tokio::test]
async fn remote_start_round_trip() {
    let harness = Harness::start().await;
    harness.seed_tag("T1").await;

    let mut charger = TestCharger::connect(&harness, "CP-001").await;
    charger.boot("V", "M").await;

    // Operator asks for a remote start; the charger answers Accepted
    let control = harness.control.clone();
    let api_call =
        tokio::spawn(async move { control.remote_start("CP-001", "T1", Some(1)).await });

    let (message_id, action, payload) = call_parts(charger.recv_frame().await);
    assert_eq!(action, "RemoteStartTransaction");
    assert_eq!(payload["idTag"], "T1");
    assert_eq!(payload["connectorId"], 1);

    charger.send_result(&message_id, json!({"status": "Accepted"})).await;

    let status = api_call.await.unwrap().unwrap();
    assert_eq!(status, "Accepted");
}

#[tokio::test]
async fn remote_start_offline_sends_nothing() {
    let harness = Harness::start().await;

    let err = harness
        .control
        .remote_start("CP-002", "T1", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        voltra_csms::support::errors::DomainError::ChargerOffline(_)
    ));
}

#[tokio::test]
async fn remote_stop_resolves_sole_active_transaction() {
    let harness = Harness::start().await;
    harness.seed_tag("T1").await;

    let mut charger = TestCharger::connect(&harness, "CP-001").await;
    charger.boot("V", "M").await;

    charger
        .send_call(
            "m-start",
            "StartTransaction",
            json!({"connectorId": 1, "idTag": "T1", "meterStart": 0, "timestamp": "2025-01-01T00:00:00Z"}),
        )
        .await;
    let started = charger.recv_frame().await;
    let tx_id = match started {
        OcppFrame::CallResult { payload, .. } => payload["transactionId"].as_i64().unwrap(),
        other => panic!("expected CallResult, got {:?}", other),
    };

    // No transaction id given: the unique active one is resolved
    let control = harness.control.clone();
    let api_call = tokio::spawn(async move { control.remote_stop("CP-001", None).await });

    let (message_id, action, payload) = call_parts(charger.recv_frame().await);
    assert_eq!(action, "RemoteStopTransaction");
    assert_eq!(payload["transactionId"].as_i64().unwrap(), tx_id);

    charger.send_result(&message_id, json!({"status": "Accepted"})).await;
    assert_eq!(api_call.await.unwrap().unwrap(), "Accepted");
}

#[tokio::test]
async fn commands_serialize_one_in_flight_per_charger() {
    let harness = Harness::start().await;

    let mut charger = TestCharger::connect(&harness, "CP-001").await;
    charger.boot("V", "M").await;

    let control_a = harness.control.clone();
    let first = tokio::spawn(async move {
        control_a
            .reset("CP-001", voltra_csms::application::commands::ResetKind::Soft)
            .await
    });

    // First command hits the wire
    let (first_id, action, _) = call_parts(charger.recv_frame().await);
    assert_eq!(action, "Reset");

    let control_b = harness.control.clone();
    let second = tokio::spawn(async move {
        control_b.unlock_connector("CP-001", 1).await
    });
    tokio::task::yield_now().await;

    // Answer the first; only then may the second frame appear
    charger.send_result(&first_id, json!({"status": "Accepted"})).await;
    assert_eq!(first.await.unwrap().unwrap(), "Accepted");

    let (second_id, action, _) = call_parts(charger.recv_frame().await);
    assert_eq!(action, "UnlockConnector");
    charger
        .send_result(&second_id, json!({"status": "Unlocked"}))
        .await;
    assert_eq!(second.await.unwrap().unwrap(), "Unlocked");
}

#[tokio::test]
async fn charger_call_error_propagates_to_caller() {
    let harness = Harness::start().await;

    let mut charger = TestCharger::connect(&harness, "CP-001").await;
    charger.boot("V", "M").await;

    let control = harness.control.clone();
    let api_call = tokio::spawn(async move { control.unlock_connector("CP-001", 3).await });

    let (message_id, _, _) = call_parts(charger.recv_frame().await);
    let error = OcppFrame::error_response(message_id, "NotSupported", "no such connector");
    charger.send_raw(&error.serialize()).await;

    let err = api_call.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        voltra_csms::support::errors::DomainError::Validation(_)
    ));
}

#[tokio::test]
async fn disconnect_cancels_pending_command() {
    let harness = Harness::start().await;

    let mut charger = TestCharger::connect(&harness, "CP-001").await;
    charger.boot("V", "M").await;

    let control = harness.control.clone();
    let api_call = tokio::spawn(async move {
        control
            .reset("CP-001", voltra_csms::application::commands::ResetKind::Hard)
            .await
    });

    // The call is on the wire; the charger vanishes instead of answering
    let _ = call_parts(charger.recv_frame().await);
    charger.disconnect().await;

    let err = api_call.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        voltra_csms::support::errors::DomainError::ChargerDisconnected(_)
    ));
}
