//! In-memory storage, used by the binary and as the test double.

use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::Storage;
use crate::domain::{
    ChargePoint, ChargingSession, Connector, IdTag, MeterReading, Reservation, StationStatus,
};
use crate::shared::errors::{DomainError, DomainResult};

pub struct InMemoryStorage {
    charge_points: DashMap<String, ChargePoint>,
    id_tags: DashMap<String, IdTag>,
    sessions: DashMap<i32, ChargingSession>,
    meter_readings: DashMap<i32, Vec<MeterReading>>,
    reservations: DashMap<(String, i32), Reservation>,
    session_counter: AtomicI32,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            charge_points: DashMap::new(),
            id_tags: DashMap::new(),
            sessions: DashMap::new(),
            meter_readings: DashMap::new(),
            reservations: DashMap::new(),
            session_counter: AtomicI32::new(1),
        }
    }

    /// Make a station known to the directory (admission control requires
    /// this before the station may connect or boot).
    pub fn provision_charge_point(&self, id: impl Into<String>, connectors: u32) {
        let mut cp = ChargePoint::new(id);
        cp.ensure_connectors(connectors);
        self.charge_points.insert(cp.id.clone(), cp);
    }

    /// Add a credential record to the directory.
    pub fn provision_id_tag(&self, tag: IdTag) {
        self.id_tags.insert(tag.tag.clone(), tag);
    }

    /// Readings persisted for one transaction, in append order.
    pub fn readings_for(&self, transaction_id: i32) -> Vec<MeterReading> {
        self.meter_readings
            .get(&transaction_id)
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Any session by id, regardless of status.
    pub fn session(&self, id: i32) -> Option<ChargingSession> {
        self.sessions.get(&id).map(|s| s.clone())
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn find_charge_point(&self, id: &str) -> DomainResult<Option<ChargePoint>> {
        Ok(self.charge_points.get(id).map(|cp| cp.clone()))
    }

    async fn upsert_charge_point(&self, charge_point: ChargePoint) -> DomainResult<()> {
        self.charge_points
            .insert(charge_point.id.clone(), charge_point);
        Ok(())
    }

    async fn set_station_status(&self, id: &str, status: StationStatus) -> DomainResult<()> {
        let mut cp = self
            .charge_points
            .get_mut(id)
            .ok_or_else(|| DomainError::NotFound {
                entity: "ChargePoint",
                field: "id",
                value: id.to_string(),
            })?;
        cp.status = status;
        Ok(())
    }

    async fn touch_heartbeat(&self, id: &str, at: DateTime<Utc>) -> DomainResult<()> {
        if let Some(mut cp) = self.charge_points.get_mut(id) {
            cp.touch_heartbeat(at);
        }
        Ok(())
    }

    async fn list_charge_points(&self) -> DomainResult<Vec<ChargePoint>> {
        Ok(self.charge_points.iter().map(|e| e.value().clone()).collect())
    }

    async fn find_connector(
        &self,
        charge_point_id: &str,
        connector_id: u32,
    ) -> DomainResult<Option<Connector>> {
        Ok(self
            .charge_points
            .get(charge_point_id)
            .and_then(|cp| cp.connector(connector_id).cloned()))
    }

    async fn upsert_connector(
        &self,
        charge_point_id: &str,
        connector: Connector,
    ) -> DomainResult<()> {
        let mut cp = self
            .charge_points
            .get_mut(charge_point_id)
            .ok_or_else(|| DomainError::NotFound {
                entity: "ChargePoint",
                field: "id",
                value: charge_point_id.to_string(),
            })?;
        let connector_id = connector.id;
        *cp.upsert_connector(connector_id) = connector;
        Ok(())
    }

    async fn find_id_tag(&self, tag: &str) -> DomainResult<Option<IdTag>> {
        Ok(self.id_tags.get(tag).map(|t| t.clone()))
    }

    async fn create_session(&self, mut session: ChargingSession) -> DomainResult<ChargingSession> {
        session.id = self.session_counter.fetch_add(1, Ordering::SeqCst);
        self.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn update_session(&self, session: ChargingSession) -> DomainResult<()> {
        if !self.sessions.contains_key(&session.id) {
            return Err(DomainError::NotFound {
                entity: "ChargingSession",
                field: "id",
                value: session.id.to_string(),
            });
        }
        self.sessions.insert(session.id, session);
        Ok(())
    }

    async fn find_active_session(
        &self,
        charge_point_id: &str,
        transaction_id: i32,
    ) -> DomainResult<Option<ChargingSession>> {
        Ok(self
            .sessions
            .get(&transaction_id)
            .filter(|s| s.charge_point_id == charge_point_id && s.is_active())
            .map(|s| s.clone()))
    }

    async fn find_active_session_for_connector(
        &self,
        charge_point_id: &str,
        connector_id: u32,
    ) -> DomainResult<Option<ChargingSession>> {
        Ok(self
            .sessions
            .iter()
            .find(|s| {
                s.charge_point_id == charge_point_id
                    && s.connector_id == connector_id
                    && s.is_active()
            })
            .map(|s| s.clone()))
    }

    async fn append_meter_reading(&self, reading: MeterReading) -> DomainResult<()> {
        self.meter_readings
            .entry(reading.transaction_id)
            .or_default()
            .push(reading);
        Ok(())
    }

    async fn create_reservation(&self, reservation: Reservation) -> DomainResult<()> {
        let key = (reservation.charge_point_id.clone(), reservation.id);
        self.reservations.insert(key, reservation);
        Ok(())
    }

    async fn find_reservation(
        &self,
        charge_point_id: &str,
        reservation_id: i32,
    ) -> DomainResult<Option<Reservation>> {
        Ok(self
            .reservations
            .get(&(charge_point_id.to_string(), reservation_id))
            .map(|r| r.clone()))
    }

    async fn update_reservation(&self, reservation: Reservation) -> DomainResult<()> {
        let key = (reservation.charge_point_id.clone(), reservation.id);
        if !self.reservations.contains_key(&key) {
            return Err(DomainError::NotFound {
                entity: "Reservation",
                field: "id",
                value: reservation.id.to_string(),
            });
        }
        self.reservations.insert(key, reservation);
        Ok(())
    }

    async fn find_expired_reservations(
        &self,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<Reservation>> {
        Ok(self
            .reservations
            .iter()
            .filter(|r| r.is_overdue(now))
            .map(|r| r.clone())
            .collect())
    }
}
