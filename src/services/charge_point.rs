//! Charge point business logic: admission, status upkeep, authorization
//! classification, and the charging-session state machine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::domain::{
    ChargePoint, ChargingSession, ConnectorStatus, IdTagStatus, MeterReading, StationStatus,
    STOP_REASON_ZOMBIE,
};
use crate::shared::errors::{DomainError, DomainResult};
use crate::storage::Storage;

/// Outcome of a StartTransaction attempt.
#[derive(Debug)]
pub enum SessionStart {
    /// A new session was created; its id is the transactionId.
    Accepted(ChargingSession),
    /// Domain rejection; the response carries transactionId 0.
    Rejected(IdTagStatus),
}

pub struct ChargePointService {
    storage: Arc<dyn Storage>,
}

impl ChargePointService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Whether the station identifier is known to the directory. Used for
    /// connection admission; unknown stations are turned away.
    pub async fn is_provisioned(&self, charge_point_id: &str) -> bool {
        match self.storage.find_charge_point(charge_point_id).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                warn!(charge_point_id, error = %e, "Directory lookup failed during admission");
                false
            }
        }
    }

    /// Classify a credential for authorization.
    ///
    /// Never fails: an unknown tag and any directory fault both classify
    /// as Invalid.
    pub async fn classify_id_tag(&self, id_tag: &str) -> IdTagStatus {
        match self.storage.find_id_tag(id_tag).await {
            Ok(Some(record)) => record.classify(Utc::now()),
            Ok(None) => IdTagStatus::Invalid,
            Err(e) => {
                warn!(id_tag, error = %e, "Credential lookup failed");
                IdTagStatus::Invalid
            }
        }
    }

    /// BootNotification admission and metadata upsert.
    ///
    /// Returns `None` when the identifier is not provisioned: an
    /// unregistered station cannot bootstrap itself into the directory.
    pub async fn register_station(
        &self,
        charge_point_id: &str,
        vendor: &str,
        model: &str,
        serial_number: Option<&str>,
        firmware_version: Option<&str>,
    ) -> DomainResult<Option<ChargePoint>> {
        let Some(mut cp) = self.storage.find_charge_point(charge_point_id).await? else {
            warn!(charge_point_id, "BootNotification from unprovisioned station");
            return Ok(None);
        };

        cp.vendor = Some(vendor.to_string());
        cp.model = Some(model.to_string());
        cp.serial_number = serial_number.map(String::from);
        cp.firmware_version = firmware_version.map(String::from);
        cp.set_online();
        cp.touch_heartbeat(Utc::now());

        self.storage.upsert_charge_point(cp.clone()).await?;
        info!(charge_point_id, vendor, model, "Charge point registered");
        Ok(Some(cp))
    }

    /// Best-effort heartbeat touch; the response never depends on it.
    pub async fn heartbeat(&self, charge_point_id: &str) {
        if let Err(e) = self.storage.touch_heartbeat(charge_point_id, Utc::now()).await {
            debug!(charge_point_id, error = %e, "Heartbeat touch failed");
        }
    }

    /// Station-level status from a connector-0 StatusNotification.
    pub async fn update_station_status(
        &self,
        charge_point_id: &str,
        reported: ConnectorStatus,
    ) -> DomainResult<()> {
        let status = StationStatus::from_station_report(reported);
        self.storage
            .set_station_status(charge_point_id, status)
            .await
    }

    /// Upsert a connector's status; fault details are kept only while the
    /// connector is Faulted.
    pub async fn update_connector_status(
        &self,
        charge_point_id: &str,
        connector_id: u32,
        status: ConnectorStatus,
        error_code: Option<String>,
        info: Option<String>,
        vendor_error_code: Option<String>,
    ) -> DomainResult<()> {
        let mut connector = self
            .storage
            .find_connector(charge_point_id, connector_id)
            .await?
            .unwrap_or_else(|| crate::domain::Connector::new(connector_id));

        connector.status = status;
        if status == ConnectorStatus::Faulted {
            connector.set_fault(error_code, info, vendor_error_code);
        } else {
            connector.clear_fault();
        }

        self.storage
            .upsert_connector(charge_point_id, connector)
            .await
    }

    /// Mark a station offline after its connection closed. Best-effort.
    pub async fn mark_offline(&self, charge_point_id: &str) {
        if let Err(e) = self
            .storage
            .set_station_status(charge_point_id, StationStatus::Offline)
            .await
        {
            warn!(charge_point_id, error = %e, "Failed to mark station offline");
        }
    }

    /// The StartTransaction state machine.
    ///
    /// A missing station record is a hard failure: a live connection
    /// implies a prior successful admission, so absence indicates a
    /// consistency bug upstream. Everything else resolves to a
    /// [`SessionStart`] outcome.
    pub async fn start_session(
        &self,
        charge_point_id: &str,
        connector_id: u32,
        id_tag: &str,
        meter_start: i32,
        timestamp: DateTime<Utc>,
    ) -> DomainResult<SessionStart> {
        let station = self
            .storage
            .find_charge_point(charge_point_id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "ChargePoint",
                field: "id",
                value: charge_point_id.to_string(),
            })?;

        let auth = self.classify_id_tag(id_tag).await;
        if auth != IdTagStatus::Accepted {
            info!(charge_point_id, id_tag, %auth, "StartTransaction rejected by authorization");
            return Ok(SessionStart::Rejected(auth));
        }

        let connector_ok = station
            .connector(connector_id)
            .map(|c| c.status.accepts_transaction())
            .unwrap_or(false);
        if !connector_ok {
            info!(
                charge_point_id,
                connector_id, "StartTransaction rejected: connector missing or unusable"
            );
            return Ok(SessionStart::Rejected(IdTagStatus::Invalid));
        }

        // Zombie-session guard: a stale Active session on this connector
        // means its StopTransaction never arrived (abrupt reset). Close it
        // with a placeholder stop value before admitting the new one.
        if let Some(mut stale) = self
            .storage
            .find_active_session_for_connector(charge_point_id, connector_id)
            .await?
        {
            warn!(
                charge_point_id,
                connector_id,
                transaction_id = stale.id,
                "Force-closing zombie session before new start"
            );
            let placeholder = stale.placeholder_stop_value();
            stale.stop(placeholder, Utc::now(), Some(STOP_REASON_ZOMBIE.to_string()));
            self.storage.update_session(stale).await?;
        }

        let session = self
            .storage
            .create_session(ChargingSession::new(
                charge_point_id,
                connector_id,
                id_tag,
                meter_start,
                timestamp,
            ))
            .await?;

        info!(
            charge_point_id,
            connector_id,
            transaction_id = session.id,
            id_tag,
            meter_start,
            "Transaction started"
        );
        Ok(SessionStart::Accepted(session))
    }

    /// Finalize a session. An unknown or already-completed transaction id
    /// resolves to `Ok(None)`: stations retry stops, and a stop may race
    /// another close path, so the call is idempotent.
    pub async fn stop_session(
        &self,
        charge_point_id: &str,
        transaction_id: i32,
        meter_stop: i32,
        timestamp: DateTime<Utc>,
        reason: Option<String>,
        transaction_data: Vec<MeterReading>,
    ) -> DomainResult<Option<ChargingSession>> {
        let Some(mut session) = self
            .storage
            .find_active_session(charge_point_id, transaction_id)
            .await?
        else {
            info!(
                charge_point_id,
                transaction_id, "StopTransaction for unknown or closed session; no-op"
            );
            return Ok(None);
        };

        for reading in transaction_data {
            self.storage.append_meter_reading(reading).await?;
        }

        session.stop(meter_stop, timestamp, reason);
        self.storage.update_session(session.clone()).await?;

        info!(
            charge_point_id,
            transaction_id,
            meter_stop,
            energy_kwh = ?session.energy_kwh,
            "Transaction stopped"
        );
        Ok(Some(session))
    }

    /// Persist sampled meter readings against their active session. With
    /// no transaction id, or no matching active session, the readings are
    /// accepted and discarded.
    pub async fn record_meter_values(
        &self,
        charge_point_id: &str,
        transaction_id: Option<i32>,
        readings: Vec<MeterReading>,
    ) -> DomainResult<()> {
        let Some(transaction_id) = transaction_id else {
            debug!(charge_point_id, "MeterValues without transactionId; discarded");
            return Ok(());
        };

        let Some(mut session) = self
            .storage
            .find_active_session(charge_point_id, transaction_id)
            .await?
        else {
            debug!(
                charge_point_id,
                transaction_id, "MeterValues for unknown session; discarded"
            );
            return Ok(());
        };

        for reading in readings {
            if reading.is_energy_register() {
                if let Ok(value) = reading.value.parse::<f64>() {
                    session.observe_meter_value(value as i32);
                }
            }
            self.storage.append_meter_reading(reading).await?;
        }

        self.storage.update_session(session).await
    }
}
