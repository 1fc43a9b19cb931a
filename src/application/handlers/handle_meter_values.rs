//! MeterValues handler

use rust_ocpp::v1_6::messages::meter_values::{MeterValuesRequest, MeterValuesResponse};
use rust_ocpp::v1_6::types::{Measurand, UnitOfMeasure};
use serde_json::Value;
use tracing::info;

use super::{internal, to_result_payload, SessionContext};
use crate::application::codec::CodecError;
use crate::application::events::{Event, MeterValuesEvent};
use crate::application::services::MeterReading;

/// Pull the energy register (Wh) out of one meterValue entry. Prefers
/// Energy.Active.Import.Register (converting kWh), falls back to the first
/// numeric sample.
fn extract_energy_wh(sampled: &[rust_ocpp::v1_6::types::SampledValue]) -> Option<f64> {
    let mut fallback = None;
    for sample in sampled {
        let Ok(value) = sample.value.parse::<f64>() else {
            continue;
        };
        let measurand = sample
            .measurand
            .clone()
            .unwrap_or(Measurand::EnergyActiveImportRegister);
        match measurand {
            Measurand::EnergyActiveImportRegister => {
                let wh = match sample.unit.as_ref() {
                    Some(UnitOfMeasure::KWh) => value * 1000.0,
                    _ => value,
                };
                return Some(wh);
            }
            _ => {
                if fallback.is_none() {
                    fallback = Some(value);
                }
            }
        }
    }
    fallback
}

pub async fn handle_meter_values(
    ctx: &mut SessionContext,
    req: MeterValuesRequest,
) -> Result<Value, CodecError> {
    info!(
        charge_point_id = ctx.charge_point_id.as_str(),
        connector_id = req.connector_id,
        transaction_id = ?req.transaction_id,
        entries = req.meter_value.len(),
        "MeterValues"
    );

    let mut readings = Vec::with_capacity(req.meter_value.len());
    let mut latest_energy = None;
    for entry in &req.meter_value {
        let Some(energy_wh) = extract_energy_wh(&entry.sampled_value) else {
            continue;
        };
        latest_energy = Some(energy_wh);
        readings.push(MeterReading {
            connector_id: Some(req.connector_id),
            timestamp: entry.timestamp,
            value_wh: energy_wh as i32,
            sampled_value: serde_json::to_value(&entry.sampled_value).ok(),
        });
    }

    ctx.charging
        .record_meter_values(&ctx.store_id, req.transaction_id, readings)
        .await
        .map_err(internal)?;

    ctx.event_bus.publish(Event::MeterValuesReceived(MeterValuesEvent {
        charge_point_id: ctx.store_id.clone(),
        connector_id: req.connector_id,
        transaction_id: req.transaction_id,
        energy_wh: latest_energy,
        timestamp: req
            .meter_value
            .first()
            .map(|mv| mv.timestamp)
            .unwrap_or_else(chrono::Utc::now),
    }));

    to_result_payload(&MeterValuesResponse {})
}
