//! Charge point and connector entities.

use chrono::{DateTime, Utc};

/// Connector status as reported via StatusNotification (OCPP 1.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorStatus {
    Available,
    Preparing,
    Charging,
    SuspendedEV,
    SuspendedEVSE,
    Finishing,
    Reserved,
    Unavailable,
    Faulted,
}

impl Default for ConnectorStatus {
    fn default() -> Self {
        Self::Available
    }
}

impl ConnectorStatus {
    /// Whether a new charging session may start on a connector in this state.
    pub fn accepts_transaction(&self) -> bool {
        !matches!(self, Self::Faulted | Self::Unavailable | Self::Reserved)
    }
}

/// Station operational status, as tracked in the station directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationStatus {
    Online,
    Offline,
    Error,
    Maintenance,
}

impl Default for StationStatus {
    fn default() -> Self {
        Self::Offline
    }
}

impl StationStatus {
    /// Station-level status derived from a connector-0 StatusNotification.
    pub fn from_station_report(status: ConnectorStatus) -> Self {
        match status {
            ConnectorStatus::Faulted => Self::Error,
            ConnectorStatus::Unavailable => Self::Maintenance,
            _ => Self::Online,
        }
    }
}

impl std::fmt::Display for StationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Online => "Online",
            Self::Offline => "Offline",
            Self::Error => "Error",
            Self::Maintenance => "Maintenance",
        };
        write!(f, "{}", s)
    }
}

/// One physical socket on a station. Id 0 is never stored here; it denotes
/// the station itself on the wire.
#[derive(Debug, Clone)]
pub struct Connector {
    pub id: u32,
    pub status: ConnectorStatus,
    pub error_code: Option<String>,
    pub info: Option<String>,
    pub vendor_error_code: Option<String>,
}

impl Connector {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            status: ConnectorStatus::default(),
            error_code: None,
            info: None,
            vendor_error_code: None,
        }
    }

    /// Record a fault report; cleared again when the connector leaves `Faulted`.
    pub fn set_fault(
        &mut self,
        error_code: Option<String>,
        info: Option<String>,
        vendor_error_code: Option<String>,
    ) {
        self.error_code = error_code;
        self.info = info;
        self.vendor_error_code = vendor_error_code;
    }

    pub fn clear_fault(&mut self) {
        self.error_code = None;
        self.info = None;
        self.vendor_error_code = None;
    }
}

/// Charge point entity as held in the station directory.
#[derive(Debug, Clone)]
pub struct ChargePoint {
    pub id: String,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub firmware_version: Option<String>,
    pub status: StationStatus,
    pub connectors: Vec<Connector>,
    pub registered_at: DateTime<Utc>,
    pub last_heartbeat_at: Option<DateTime<Utc>>,
}

impl ChargePoint {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            vendor: None,
            model: None,
            serial_number: None,
            firmware_version: None,
            status: StationStatus::default(),
            connectors: Vec::new(),
            registered_at: Utc::now(),
            last_heartbeat_at: None,
        }
    }

    pub fn connector(&self, connector_id: u32) -> Option<&Connector> {
        self.connectors.iter().find(|c| c.id == connector_id)
    }

    pub fn connector_mut(&mut self, connector_id: u32) -> Option<&mut Connector> {
        self.connectors.iter_mut().find(|c| c.id == connector_id)
    }

    /// Insert or update a connector entry, returning a mutable reference.
    pub fn upsert_connector(&mut self, connector_id: u32) -> &mut Connector {
        if let Some(idx) = self.connectors.iter().position(|c| c.id == connector_id) {
            &mut self.connectors[idx]
        } else {
            self.connectors.push(Connector::new(connector_id));
            self.connectors.sort_by_key(|c| c.id);
            self.connector_mut(connector_id).unwrap()
        }
    }

    /// Make sure connectors 1..=count exist.
    pub fn ensure_connectors(&mut self, count: u32) {
        for id in 1..=count {
            self.upsert_connector(id);
        }
    }

    pub fn set_online(&mut self) {
        self.status = StationStatus::Online;
    }

    pub fn set_offline(&mut self) {
        self.status = StationStatus::Offline;
    }

    pub fn touch_heartbeat(&mut self, at: DateTime<Utc>) {
        self.last_heartbeat_at = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_charge_point_starts_offline() {
        let cp = ChargePoint::new("CP001");
        assert_eq!(cp.status, StationStatus::Offline);
        assert!(cp.connectors.is_empty());
        assert!(cp.last_heartbeat_at.is_none());
    }

    #[test]
    fn ensure_connectors_is_idempotent() {
        let mut cp = ChargePoint::new("CP001");
        cp.ensure_connectors(2);
        cp.ensure_connectors(2);
        assert_eq!(cp.connectors.len(), 2);
        assert!(cp.connector(1).is_some());
        assert!(cp.connector(2).is_some());
        assert!(cp.connector(3).is_none());
    }

    #[test]
    fn upsert_connector_keeps_ids_sorted() {
        let mut cp = ChargePoint::new("CP001");
        cp.upsert_connector(3);
        cp.upsert_connector(1);
        let ids: Vec<u32> = cp.connectors.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn transaction_gating_by_connector_status() {
        assert!(ConnectorStatus::Available.accepts_transaction());
        assert!(ConnectorStatus::Preparing.accepts_transaction());
        assert!(ConnectorStatus::Charging.accepts_transaction());
        assert!(!ConnectorStatus::Faulted.accepts_transaction());
        assert!(!ConnectorStatus::Unavailable.accepts_transaction());
        assert!(!ConnectorStatus::Reserved.accepts_transaction());
    }

    #[test]
    fn station_status_from_connector_zero_report() {
        assert_eq!(
            StationStatus::from_station_report(ConnectorStatus::Faulted),
            StationStatus::Error
        );
        assert_eq!(
            StationStatus::from_station_report(ConnectorStatus::Unavailable),
            StationStatus::Maintenance
        );
        assert_eq!(
            StationStatus::from_station_report(ConnectorStatus::Available),
            StationStatus::Online
        );
        assert_eq!(
            StationStatus::from_station_report(ConnectorStatus::Charging),
            StationStatus::Online
        );
    }

    #[test]
    fn fault_info_set_and_cleared() {
        let mut connector = Connector::new(1);
        connector.status = ConnectorStatus::Faulted;
        connector.set_fault(Some("GroundFailure".into()), Some("leak".into()), None);
        assert_eq!(connector.error_code.as_deref(), Some("GroundFailure"));

        connector.status = ConnectorStatus::Available;
        connector.clear_fault();
        assert!(connector.error_code.is_none());
        assert!(connector.info.is_none());
    }
}
