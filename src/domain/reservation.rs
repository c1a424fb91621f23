//! Connector reservation entity.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationStatus {
    Active,
    Cancelled,
    Expired,
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "Active",
            Self::Cancelled => "Cancelled",
            Self::Expired => "Expired",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone)]
pub struct Reservation {
    /// OCPP reservation id, scoped per station.
    pub id: i32,
    pub charge_point_id: String,
    /// `None` reserves the station as a whole.
    pub connector_id: Option<u32>,
    pub id_tag: String,
    pub parent_id_tag: Option<String>,
    pub expiry_date: DateTime<Utc>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn new(
        id: i32,
        charge_point_id: impl Into<String>,
        connector_id: Option<u32>,
        id_tag: impl Into<String>,
        parent_id_tag: Option<String>,
        expiry_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            charge_point_id: charge_point_id.into(),
            connector_id,
            id_tag: id_tag.into(),
            parent_id_tag,
            expiry_date,
            status: ReservationStatus::Active,
            created_at: Utc::now(),
        }
    }

    pub fn cancel(&mut self) {
        self.status = ReservationStatus::Cancelled;
    }

    pub fn expire(&mut self) {
        self.status = ReservationStatus::Expired;
    }

    pub fn is_active(&self) -> bool {
        self.status == ReservationStatus::Active
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && now > self.expiry_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample() -> Reservation {
        Reservation::new(7, "CP001", Some(1), "TAG1", None, Utc::now() + Duration::hours(1))
    }

    #[test]
    fn new_reservation_is_active() {
        let r = sample();
        assert!(r.is_active());
        assert!(!r.is_overdue(Utc::now()));
    }

    #[test]
    fn cancel_and_expire_transitions() {
        let mut r = sample();
        r.cancel();
        assert_eq!(r.status, ReservationStatus::Cancelled);

        let mut r = sample();
        r.expire();
        assert_eq!(r.status, ReservationStatus::Expired);
        assert!(!r.is_active());
    }

    #[test]
    fn overdue_only_while_active() {
        let mut r = Reservation::new(8, "CP001", None, "TAG1", None, Utc::now() - Duration::minutes(5));
        assert!(r.is_overdue(Utc::now()));
        r.cancel();
        assert!(!r.is_overdue(Utc::now()));
    }
}
