// ── Status poller ──
//
// Keeps the server-derived status fresh. Ticks are spawned independently,
// so a slow response never delays the next poll; each poll carries a
// sequence number and responses older than the last applied one are
// dropped.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::Store;
use crate::error::CoreError;
use crate::model::Status;
use crate::state::Fields;

impl Store {
    /// Fetch `/api/status` once and apply it.
    pub async fn poll_status(&self) -> Result<(), CoreError> {
        let seq = self.inner.poll_seq.fetch_add(1, Ordering::AcqRel) + 1;
        let raw = self.api().status().await?;
        self.apply_status(seq, Status::from(raw));
        Ok(())
    }

    /// Replace the status if `seq` is newer than the last applied poll.
    ///
    /// STATUS and CONFIG are only marked changed when their values differ.
    /// Selections for layers the new config no longer has are dropped.
    pub(crate) fn apply_status(&self, seq: u64, status: Status) -> bool {
        let mut applied = false;
        self.commit(|state, _| {
            if seq <= state.status_seq {
                debug!(seq, latest = state.status_seq, "dropping stale status response");
                return Fields::NONE;
            }
            applied = true;
            state.status_seq = seq;
            state.last_status_at = Some(Utc::now());

            let mut touched = Fields::NONE;
            if state.status.progress_differs(&status) {
                touched |= Fields::STATUS;
            }
            if state.status.config != status.config {
                touched |= Fields::CONFIG;
                let config = Arc::clone(&status.config);
                if state.selected.retain(|layer| config.has_layer(layer)) {
                    touched |= Fields::SELECTION;
                }
            }
            if !touched.is_empty() {
                state.status = Arc::new(status);
            }
            touched
        });
        applied
    }
}

/// Poll the status endpoint every `period` until cancelled.
pub(super) async fn status_poll_task(store: Store, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let store = store.clone();
                let cancel = cancel.clone();
                store.inner.tasks.clone().spawn(async move {
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => {}
                        result = store.poll_status() => {
                            if let Err(e) = result {
                                warn!(error = %e, "status poll failed");
                            }
                        }
                    }
                });
            }
        }
    }
    debug!("status poller stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::model::{Config, ExportStatus, Layer};

    fn store() -> Store {
        Store::new(StoreConfig::new("http://127.0.0.1:9".parse().unwrap())).unwrap()
    }

    fn status(missing: i64, layers: &[&str]) -> Status {
        Status {
            running: false,
            initialized: false,
            missing,
            export: ExportStatus::default(),
            config: Arc::new(Config {
                layers: layers
                    .iter()
                    .map(|id| Layer {
                        id: (*id).to_owned(),
                        name: (*id).to_owned(),
                        admin_levels: vec![2],
                    })
                    .collect(),
                rules: Vec::new(),
            }),
        }
    }

    #[tokio::test]
    async fn stale_status_is_discarded() {
        let store = store();

        assert!(store.apply_status(2, status(7, &["country"])));
        assert!(!store.apply_status(1, status(3, &[])));

        let state = store.state();
        assert_eq!(state.status.missing, 7);
        assert!(state.status.config.has_layer("country"));
    }

    #[tokio::test]
    async fn unchanged_status_publishes_nothing() {
        let store = store();
        assert!(store.apply_status(1, status(4, &["country"])));
        let revision = store.state().revision;

        assert!(store.apply_status(2, status(4, &["country"])));
        let state = store.state();
        assert_eq!(state.revision, revision);
        assert!(state.last_status_at.is_some());
    }

    #[tokio::test]
    async fn config_change_drops_selections_for_removed_layers() {
        let store = store();
        store.apply_status(1, status(0, &["country", "region"]));
        store.select("country", 1).unwrap();
        store.select("region", 2).unwrap();

        store.apply_status(2, status(0, &["country"]));
        let state = store.state();
        assert_eq!(state.selection_count(), 1);
        assert!(state.changed.contains(Fields::CONFIG | Fields::SELECTION));
        assert!(!state.changed.contains(Fields::STATUS));
    }
}
