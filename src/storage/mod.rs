//! Persistence contract for the gateway's external state collaborators.
//!
//! The protocol core only depends on this trait; what backs it (SQL, an
//! external service, the in-memory store below) is not its concern.

mod memory;

pub use memory::InMemoryStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    ChargePoint, ChargingSession, Connector, IdTag, MeterReading, Reservation, StationStatus,
};
use crate::shared::errors::DomainResult;

#[async_trait]
pub trait Storage: Send + Sync {
    // ── Station directory ──────────────────────────────────────

    async fn find_charge_point(&self, id: &str) -> DomainResult<Option<ChargePoint>>;
    async fn upsert_charge_point(&self, charge_point: ChargePoint) -> DomainResult<()>;
    async fn set_station_status(&self, id: &str, status: StationStatus) -> DomainResult<()>;
    async fn touch_heartbeat(&self, id: &str, at: DateTime<Utc>) -> DomainResult<()>;
    async fn list_charge_points(&self) -> DomainResult<Vec<ChargePoint>>;

    // ── Connector directory ────────────────────────────────────

    async fn find_connector(
        &self,
        charge_point_id: &str,
        connector_id: u32,
    ) -> DomainResult<Option<Connector>>;
    async fn upsert_connector(
        &self,
        charge_point_id: &str,
        connector: Connector,
    ) -> DomainResult<()>;

    // ── Credential directory ───────────────────────────────────

    async fn find_id_tag(&self, tag: &str) -> DomainResult<Option<IdTag>>;

    // ── Session store ──────────────────────────────────────────

    /// Persist a new session, assigning its identity. The returned session
    /// carries the assigned id (always > 0).
    async fn create_session(&self, session: ChargingSession) -> DomainResult<ChargingSession>;
    async fn update_session(&self, session: ChargingSession) -> DomainResult<()>;
    async fn find_active_session(
        &self,
        charge_point_id: &str,
        transaction_id: i32,
    ) -> DomainResult<Option<ChargingSession>>;
    async fn find_active_session_for_connector(
        &self,
        charge_point_id: &str,
        connector_id: u32,
    ) -> DomainResult<Option<ChargingSession>>;
    async fn append_meter_reading(&self, reading: MeterReading) -> DomainResult<()>;

    // ── Reservation store ──────────────────────────────────────

    async fn create_reservation(&self, reservation: Reservation) -> DomainResult<()>;
    async fn find_reservation(
        &self,
        charge_point_id: &str,
        reservation_id: i32,
    ) -> DomainResult<Option<Reservation>>;
    async fn update_reservation(&self, reservation: Reservation) -> DomainResult<()>;
    async fn find_expired_reservations(&self, now: DateTime<Utc>) -> DomainResult<Vec<Reservation>>;
}
