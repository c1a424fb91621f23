pub mod charge_point;
pub mod reservation;
pub mod reservation_expiry;

pub use charge_point::{ChargePointService, SessionStart};
pub use reservation::{ReservationService, ReserveOutcome};
pub use reservation_expiry::start_reservation_expiry_task;
