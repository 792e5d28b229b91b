//! Redis-backed preference sink.
//!
//! Signals are queued as apalis jobs in Redis and handled by the preference
//! worker, so queued signals survive a restart and jobs that exhaust their
//! retries stay in Redis for inspection.

use std::sync::{Mutex, PoisonError};

use apalis::prelude::*;
use apalis_redis::RedisStorage;
use tally_common::{AppError, AppResult};
use tally_core::{PreferenceSignal, PreferenceSink};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Job storage for preference signals.
pub type PreferenceStorage = RedisStorage<PreferenceSignal>;

/// Connect to Redis and open the preference job storage.
pub async fn connect_storage(redis_url: &str) -> AppResult<PreferenceStorage> {
    let conn = apalis_redis::connect(redis_url)
        .await
        .map_err(|e| AppError::Redis(e.to_string()))?;

    info!("Connected to Redis job queue");
    Ok(RedisStorage::new(conn))
}

/// Preference sink that queues jobs for the apalis preference worker.
///
/// [`PreferenceSink::send`] never waits on Redis: each push runs on its own
/// task. [`RedisPreferenceSink::flush`] waits for pushes still in flight.
pub struct RedisPreferenceSink {
    storage: PreferenceStorage,
    pending: Mutex<JoinSet<()>>,
}

impl RedisPreferenceSink {
    /// Create a sink on an open storage.
    #[must_use]
    pub fn new(storage: PreferenceStorage) -> Self {
        Self {
            storage,
            pending: Mutex::default(),
        }
    }

    /// Queue one signal and wait until Redis has accepted it.
    pub async fn push(&self, signal: PreferenceSignal) -> AppResult<()> {
        enqueue(self.storage.clone(), signal).await
    }

    /// Wait for every push started by [`PreferenceSink::send`].
    pub async fn flush(&self) {
        let mut pending = std::mem::take(&mut *self.lock_pending());
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "Preference push task failed");
            }
        }
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, JoinSet<()>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn enqueue(mut storage: PreferenceStorage, signal: PreferenceSignal) -> AppResult<()> {
    storage
        .push(signal)
        .await
        .map(|_| ())
        .map_err(|e| AppError::Redis(format!("Failed to queue job: {e}")))
}

impl PreferenceSink for RedisPreferenceSink {
    fn send(&self, signal: PreferenceSignal) {
        let storage = self.storage.clone();
        let mut pending = self.lock_pending();

        // Reap finished pushes so the set only tracks work in flight.
        while let Some(result) = pending.try_join_next() {
            if let Err(e) = result {
                warn!(error = %e, "Preference push task failed");
            }
        }

        pending.spawn(async move {
            let user_id = signal.user_id.clone();
            let item_id = signal.item_id.clone();
            let kind = signal.kind;

            match enqueue(storage, signal).await {
                Ok(()) => debug!(%user_id, %item_id, %kind, "Queued preference job"),
                Err(e) => warn!(
                    %user_id,
                    %item_id,
                    %kind,
                    error = %e,
                    "Failed to queue preference job, dropping signal"
                ),
            }
        });
    }
}
