// ── Export and import ──

use boundfix_api::types::CoordinatePoint;
use tracing::{debug, info};

use super::Store;
use crate::error::CoreError;
use crate::model::Coordinate;

impl Store {
    /// Ask the service to start an export.
    ///
    /// Progress shows up in `status.export` on later polls.
    pub async fn start_export(&self) -> Result<(), CoreError> {
        self.api().export().await?;
        info!("export started");
        self.refresh_status().await;
        Ok(())
    }

    /// Queue new coordinates for resolution.
    pub async fn import_missing(&self, coordinates: &[Coordinate]) -> Result<(), CoreError> {
        if coordinates.is_empty() {
            return Ok(());
        }
        let points: Vec<CoordinatePoint> = coordinates.iter().map(CoordinatePoint::from).collect();
        self.api().import_missing(&points).await?;
        info!(count = points.len(), "missing coordinates imported");
        self.refresh_status().await;
        Ok(())
    }

    /// Out-of-band poll after a write; a failure waits for the next tick.
    async fn refresh_status(&self) {
        if let Err(e) = self.poll_status().await {
            debug!(error = %e, "status refresh failed");
        }
    }
}
