//! Preference worker.

use apalis::layers::retry::RetryPolicy;
use apalis::prelude::*;
use tally_common::AppResult;
use tally_common::config::RecommenderConfig;
use tally_core::{PreferenceSignal, RecommenderRef};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::preference_sink::PreferenceStorage;

/// Context for the preference worker.
#[derive(Clone)]
pub struct PreferenceContext {
    pub recommender: RecommenderRef,
}

impl PreferenceContext {
    /// Create a new preference context.
    #[must_use]
    pub const fn new(recommender: RecommenderRef) -> Self {
        Self { recommender }
    }

    /// Forward one signal to the recommender.
    pub async fn deliver(&self, job: &PreferenceSignal) -> AppResult<()> {
        self.recommender
            .record_preference(&job.user_id, &job.item_id, job.kind)
            .await
    }
}

/// Worker function for preference jobs.
///
/// # Errors
/// Returns an error if the recommender rejects the signal. The retry layer
/// runs the job again until its attempts are used up.
pub async fn preference_worker(
    job: PreferenceSignal,
    ctx: Data<PreferenceContext>,
) -> Result<(), Error> {
    match ctx.deliver(&job).await {
        Ok(()) => {
            debug!(
                user_id = %job.user_id,
                item_id = %job.item_id,
                kind = %job.kind,
                "Delivered preference signal"
            );
            Ok(())
        }
        Err(e) => {
            warn!(
                user_id = %job.user_id,
                item_id = %job.item_id,
                kind = %job.kind,
                error = %e,
                "Failed to deliver preference signal"
            );
            let e: Box<dyn std::error::Error + Send + Sync> = Box::new(e);
            Err(Error::Failed(e.into()))
        }
    }
}

/// A running preference worker.
pub struct PreferenceWorker {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl PreferenceWorker {
    /// Start the worker on the current tokio runtime.
    #[must_use]
    pub fn start(
        storage: PreferenceStorage,
        ctx: PreferenceContext,
        config: &RecommenderConfig,
    ) -> Self {
        let (stop, stopped) = oneshot::channel::<()>();
        let concurrency = config.concurrency.max(1);
        let retries = config.max_retries as usize;

        let handle = tokio::spawn(async move {
            let monitor = Monitor::new().register({
                WorkerBuilder::new("preference")
                    .concurrency(concurrency)
                    .retry(RetryPolicy::retries(retries))
                    .data(ctx)
                    .backend(storage)
                    .build_fn(preference_worker)
            });

            let shutdown = async move {
                stopped.await.ok();
                Ok::<(), std::io::Error>(())
            };
            if let Err(e) = monitor.run_with_signal(shutdown).await {
                error!(error = %e, "Preference worker failed");
            }
        });

        info!(concurrency, retries, "Preference worker started");
        Self { stop, handle }
    }

    /// Stop taking jobs and wait for the ones in progress.
    pub async fn shutdown(self) {
        self.stop.send(()).ok();
        if let Err(e) = self.handle.await {
            error!(error = %e, "Preference worker panicked");
        }
        info!("Preference worker stopped");
    }
}
