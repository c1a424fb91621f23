//! Charging session entity and sampled meter readings.

use chrono::{DateTime, Utc};

/// Stop reason recorded when the start-transaction handler force-closes a
/// session whose StopTransaction was never received.
pub const STOP_REASON_ZOMBIE: &str = "ZombieSessionAutoClosed";

/// Wire name of the billing-relevant measurand; every other measurand is
/// telemetry.
pub const MEASURAND_ENERGY_REGISTER: &str = "Energy.Active.Import.Register";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Completed,
}

/// One charging event from start to stop, tied to one connector and one
/// credential. At most one Active session exists per (station, connector).
#[derive(Debug, Clone)]
pub struct ChargingSession {
    /// Storage-assigned identity, doubling as the OCPP transactionId.
    /// 0 only before the session is persisted.
    pub id: i32,
    pub charge_point_id: String,
    pub connector_id: u32,
    pub id_tag: String,
    pub meter_start: i32,
    pub meter_stop: Option<i32>,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub stop_reason: Option<String>,
    /// Derived at stop time from the meter delta.
    pub energy_kwh: Option<f64>,
    /// Most recent energy-register reading, in Wh.
    pub last_meter_value: Option<i32>,
    pub status: SessionStatus,
}

impl ChargingSession {
    pub fn new(
        charge_point_id: impl Into<String>,
        connector_id: u32,
        id_tag: impl Into<String>,
        meter_start: i32,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            charge_point_id: charge_point_id.into(),
            connector_id,
            id_tag: id_tag.into(),
            meter_start,
            meter_stop: None,
            started_at,
            stopped_at: None,
            stop_reason: None,
            energy_kwh: None,
            last_meter_value: None,
            status: SessionStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Finalize the session. Energy is the meter delta in kWh.
    pub fn stop(&mut self, meter_stop: i32, stopped_at: DateTime<Utc>, reason: Option<String>) {
        self.meter_stop = Some(meter_stop);
        self.stopped_at = Some(stopped_at);
        self.stop_reason = reason;
        self.energy_kwh = Some(f64::from(meter_stop - self.meter_start) / 1000.0);
        self.status = SessionStatus::Completed;
    }

    /// Track the latest energy-register reading while the session runs.
    pub fn observe_meter_value(&mut self, value_wh: i32) {
        self.last_meter_value = Some(value_wh);
    }

    /// Best known meter value for a forced close, where the true final
    /// reading is unknown.
    pub fn placeholder_stop_value(&self) -> i32 {
        self.last_meter_value.unwrap_or(self.meter_start)
    }
}

/// A single sampled value from a MeterValues or StopTransaction payload.
#[derive(Debug, Clone)]
pub struct MeterReading {
    pub transaction_id: i32,
    pub connector_id: u32,
    pub measurand: String,
    pub value: String,
    pub unit: Option<String>,
    pub context: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl MeterReading {
    pub fn is_energy_register(&self) -> bool {
        self.measurand == MEASURAND_ENERGY_REGISTER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ChargingSession {
        ChargingSession::new("CP001", 1, "TAG1", 1000, Utc::now())
    }

    #[test]
    fn new_session_is_active_with_zero_id() {
        let s = sample();
        assert!(s.is_active());
        assert_eq!(s.id, 0);
        assert!(s.meter_stop.is_none());
        assert!(s.energy_kwh.is_none());
    }

    #[test]
    fn stop_computes_energy_from_meter_delta() {
        let mut s = sample();
        s.stop(1500, Utc::now(), None);
        assert_eq!(s.status, SessionStatus::Completed);
        assert_eq!(s.meter_stop, Some(1500));
        assert_eq!(s.energy_kwh, Some(0.5));
        assert!(s.stopped_at.is_some());
    }

    #[test]
    fn stop_records_reason() {
        let mut s = sample();
        s.stop(1000, Utc::now(), Some(STOP_REASON_ZOMBIE.to_string()));
        assert_eq!(s.stop_reason.as_deref(), Some(STOP_REASON_ZOMBIE));
        assert_eq!(s.energy_kwh, Some(0.0));
    }

    #[test]
    fn placeholder_prefers_last_observed_value() {
        let mut s = sample();
        assert_eq!(s.placeholder_stop_value(), 1000);
        s.observe_meter_value(1420);
        assert_eq!(s.placeholder_stop_value(), 1420);
    }

    #[test]
    fn energy_register_reading_is_recognized() {
        let reading = MeterReading {
            transaction_id: 1,
            connector_id: 1,
            measurand: MEASURAND_ENERGY_REGISTER.to_string(),
            value: "1234".to_string(),
            unit: Some("Wh".to_string()),
            context: None,
            timestamp: Utc::now(),
        };
        assert!(reading.is_energy_register());

        let other = MeterReading {
            measurand: "Power.Active.Import".to_string(),
            ..reading
        };
        assert!(!other.is_energy_register());
    }
}
