//! MeterValues handler.

use rust_ocpp::v1_6::messages::meter_values::{MeterValuesRequest, MeterValuesResponse};
use rust_ocpp::v1_6::types::{Measurand, MeterValue};
use serde_json::Value;
use tracing::{info, warn};

use super::{parse_payload, HandlerError, OcppHandler};
use crate::domain::MeterReading;

/// Wire name of a serializable OCPP enum ("Energy.Active.Import.Register"
/// and friends).
fn wire_label<T: serde::Serialize + std::fmt::Debug>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(Value::String(s)) => s,
        _ => format!("{:?}", value),
    }
}

/// Flatten OCPP meter value samples into domain readings. A sample with no
/// measurand defaults to the energy register, per OCPP 1.6.
pub(crate) fn collect_readings(
    transaction_id: i32,
    connector_id: u32,
    meter_values: &[MeterValue],
) -> Vec<MeterReading> {
    let mut readings = Vec::new();
    for meter_value in meter_values {
        for sampled in &meter_value.sampled_value {
            let measurand = sampled
                .measurand
                .clone()
                .unwrap_or(Measurand::EnergyActiveImportRegister);
            readings.push(MeterReading {
                transaction_id,
                connector_id,
                measurand: wire_label(&measurand),
                value: sampled.value.clone(),
                unit: sampled.unit.as_ref().map(wire_label),
                context: sampled.context.as_ref().map(wire_label),
                timestamp: meter_value.timestamp,
            });
        }
    }
    readings
}

pub(crate) async fn handle_meter_values(
    handler: &OcppHandler,
    payload: &Value,
) -> Result<Value, HandlerError> {
    let req: MeterValuesRequest = parse_payload("MeterValues", payload)?;

    info!(
        charge_point_id = handler.charge_point_id.as_str(),
        connector_id = req.connector_id,
        transaction_id = ?req.transaction_id,
        samples = req.meter_value.len(),
        "MeterValues"
    );

    let readings = collect_readings(
        req.transaction_id.unwrap_or(0),
        req.connector_id,
        &req.meter_value,
    );

    // The station always gets an empty success payload; persistence
    // problems are a server-side concern.
    if let Err(e) = handler
        .service
        .record_meter_values(&handler.charge_point_id, req.transaction_id, readings)
        .await
    {
        warn!(
            charge_point_id = handler.charge_point_id.as_str(),
            transaction_id = ?req.transaction_id,
            error = %e,
            "Failed to persist meter values"
        );
    }

    Ok(serde_json::to_value(&MeterValuesResponse {}).unwrap_or_default())
}
