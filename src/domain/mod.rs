pub mod charge_point;
pub mod id_tag;
pub mod reservation;
pub mod session;

pub use charge_point::{ChargePoint, Connector, ConnectorStatus, StationStatus};
pub use id_tag::{CredentialStatus, IdTag, IdTagStatus};
pub use reservation::{Reservation, ReservationStatus};
pub use session::{ChargingSession, MeterReading, SessionStatus, MEASURAND_ENERGY_REGISTER, STOP_REASON_ZOMBIE};
