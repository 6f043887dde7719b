use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::auth::AuthService;
use crate::services::BookingService;

/// Every 15 minutes, on the quarter hour
pub const MAINTENANCE_SCHEDULE: &str = "0 */15 * * * *";

/// Outcome of one maintenance pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub expired_bookings: u64,
    pub purged_tokens: u64,
}

/// Periodic housekeeping: expire stale booking requests and purge dead tokens
pub struct BackgroundJobService {
    scheduler: Arc<RwLock<JobScheduler>>,
    booking_service: BookingService,
    auth_service: AuthService,
}

impl BackgroundJobService {
    pub async fn new(booking_service: BookingService, auth_service: AuthService) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| anyhow!("Failed to create job scheduler: {}", e))?;

        Ok(Self {
            scheduler: Arc::new(RwLock::new(scheduler)),
            booking_service,
            auth_service,
        })
    }

    /// Register the maintenance job and start the scheduler
    pub async fn start(&self) -> Result<()> {
        self.add_maintenance_job().await?;

        let scheduler = self.scheduler.read().await;
        scheduler
            .start()
            .await
            .map_err(|e| anyhow!("Failed to start job scheduler: {}", e))?;

        info!("Background job scheduler started");
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        let mut scheduler = self.scheduler.write().await;
        scheduler
            .shutdown()
            .await
            .map_err(|e| anyhow!("Failed to stop job scheduler: {}", e))?;

        info!("Background job scheduler stopped");
        Ok(())
    }

    async fn add_maintenance_job(&self) -> Result<()> {
        let booking_service = self.booking_service.clone();
        let auth_service = self.auth_service.clone();

        let job = Job::new_async(MAINTENANCE_SCHEDULE, move |_uuid, _l| {
            let booking_service = booking_service.clone();
            let auth_service = auth_service.clone();

            Box::pin(async move {
                match Self::run_maintenance(&booking_service, &auth_service).await {
                    Ok(report) => info!(
                        expired_bookings = report.expired_bookings,
                        purged_tokens = report.purged_tokens,
                        "maintenance pass finished"
                    ),
                    Err(e) => error!("maintenance pass failed: {}", e),
                }
            })
        })
        .map_err(|e| anyhow!("Failed to create maintenance job: {}", e))?;

        let scheduler = self.scheduler.read().await;
        scheduler
            .add(job)
            .await
            .map_err(|e| anyhow!("Failed to add maintenance job to scheduler: {}", e))?;

        info!("Added maintenance job ({})", MAINTENANCE_SCHEDULE);
        Ok(())
    }

    pub async fn run_maintenance(booking_service: &BookingService, auth_service: &AuthService) -> Result<MaintenanceReport> {
        let expired_bookings = booking_service
            .expire_stale_pending()
            .await
            .map_err(|e| anyhow!("Failed to expire pending bookings: {}", e))?;

        let purged_tokens = auth_service
            .purge_expired_tokens()
            .await
            .map_err(|e| anyhow!("Failed to purge expired tokens: {}", e))?;

        Ok(MaintenanceReport {
            expired_bookings,
            purged_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_maintenance_schedule_is_valid_cron() {
        assert!(Job::new_async(MAINTENANCE_SCHEDULE, |_uuid, _l| Box::pin(async {})).is_ok());
    }
}
