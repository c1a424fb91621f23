//! Reservation business logic: ReserveNow gating and cancellation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::domain::{ConnectorStatus, Reservation};
use crate::storage::Storage;

/// Outcome of a ReserveNow attempt, mirroring the OCPP status values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    Accepted,
    Faulted,
    Occupied,
    Unavailable,
    Rejected,
}

pub struct ReservationService {
    storage: Arc<dyn Storage>,
}

impl ReservationService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Gate a reservation on the connector's current status:
    /// Unavailable → Unavailable, Faulted → Faulted, anything but
    /// Available → Occupied. Never fails; internal faults reject.
    pub async fn reserve(
        &self,
        charge_point_id: &str,
        connector_id: u32,
        reservation_id: i32,
        id_tag: &str,
        parent_id_tag: Option<String>,
        expiry_date: DateTime<Utc>,
    ) -> ReserveOutcome {
        let connector = match self
            .storage
            .find_connector(charge_point_id, connector_id)
            .await
        {
            Ok(Some(connector)) => connector,
            Ok(None) => {
                info!(charge_point_id, connector_id, "ReserveNow for unknown connector");
                return ReserveOutcome::Rejected;
            }
            Err(e) => {
                warn!(charge_point_id, connector_id, error = %e, "Connector lookup failed");
                return ReserveOutcome::Rejected;
            }
        };

        match connector.status {
            ConnectorStatus::Unavailable => return ReserveOutcome::Unavailable,
            ConnectorStatus::Faulted => return ReserveOutcome::Faulted,
            ConnectorStatus::Available => {}
            _ => return ReserveOutcome::Occupied,
        }

        let reservation = Reservation::new(
            reservation_id,
            charge_point_id,
            Some(connector_id),
            id_tag,
            parent_id_tag,
            expiry_date,
        );
        match self.storage.create_reservation(reservation).await {
            Ok(()) => {
                info!(charge_point_id, connector_id, reservation_id, "Reservation created");
                ReserveOutcome::Accepted
            }
            Err(e) => {
                warn!(charge_point_id, reservation_id, error = %e, "Failed to store reservation");
                ReserveOutcome::Rejected
            }
        }
    }

    /// Cancel a reservation. `false` when no active reservation exists for
    /// this station and id (or the store fails).
    pub async fn cancel(&self, charge_point_id: &str, reservation_id: i32) -> bool {
        let reservation = match self
            .storage
            .find_reservation(charge_point_id, reservation_id)
            .await
        {
            Ok(Some(r)) if r.is_active() => r,
            Ok(_) => {
                info!(charge_point_id, reservation_id, "CancelReservation: not found or inactive");
                return false;
            }
            Err(e) => {
                warn!(charge_point_id, reservation_id, error = %e, "Reservation lookup failed");
                return false;
            }
        };

        let mut cancelled = reservation;
        cancelled.cancel();
        match self.storage.update_reservation(cancelled).await {
            Ok(()) => {
                info!(charge_point_id, reservation_id, "Reservation cancelled");
                true
            }
            Err(e) => {
                warn!(charge_point_id, reservation_id, error = %e, "Failed to cancel reservation");
                false
            }
        }
    }
}
