//! Background task that expires overdue reservations.

use std::sync::Arc;

use chrono::Utc;
use tokio::time::Duration;
use tracing::{info, warn};

use crate::shared::shutdown::ShutdownSignal;
use crate::storage::Storage;

/// Periodically mark Active reservations past their expiry as Expired.
pub fn start_reservation_expiry_task(
    storage: Arc<dyn Storage>,
    shutdown: ShutdownSignal,
    check_interval_secs: u64,
) {
    tokio::spawn(async move {
        info!(check_interval = check_interval_secs, "Reservation expiry task started");

        let mut interval = tokio::time::interval(Duration::from_secs(check_interval_secs));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = expire_overdue(&storage).await {
                        warn!(error = %e, "Reservation expiry sweep failed");
                    }
                }
                _ = shutdown.notified().wait() => {
                    info!("Reservation expiry task stopped");
                    break;
                }
            }
        }
    });
}

async fn expire_overdue(
    storage: &Arc<dyn Storage>,
) -> Result<(), crate::shared::errors::DomainError> {
    let overdue = storage.find_expired_reservations(Utc::now()).await?;
    if overdue.is_empty() {
        return Ok(());
    }

    info!(count = overdue.len(), "Expiring overdue reservations");
    for mut reservation in overdue {
        reservation.expire();
        if let Err(e) = storage.update_reservation(reservation).await {
            warn!(error = %e, "Failed to expire reservation");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Reservation, ReservationStatus};
    use crate::storage::InMemoryStorage;
    use chrono::Duration as ChronoDuration;

    #[tokio::test]
    async fn sweep_expires_only_overdue_reservations() {
        let storage = Arc::new(InMemoryStorage::new());
        storage
            .create_reservation(Reservation::new(
                1,
                "CP1",
                Some(1),
                "TAG1",
                None,
                Utc::now() - ChronoDuration::minutes(1),
            ))
            .await
            .unwrap();
        storage
            .create_reservation(Reservation::new(
                2,
                "CP1",
                Some(2),
                "TAG1",
                None,
                Utc::now() + ChronoDuration::hours(1),
            ))
            .await
            .unwrap();

        let dyn_storage: Arc<dyn Storage> = storage.clone();
        expire_overdue(&dyn_storage).await.unwrap();

        assert_eq!(
            storage.find_reservation("CP1", 1).await.unwrap().unwrap().status,
            ReservationStatus::Expired
        );
        assert_eq!(
            storage.find_reservation("CP1", 2).await.unwrap().unwrap().status,
            ReservationStatus::Active
        );
    }
}
