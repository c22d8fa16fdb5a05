//! Periodic catalog refresh.
//!
//! Every fetch takes a sequence number before it starts and the store only
//! accepts a catalog newer than the one applied, so a slow fetch that
//! finishes after a faster, later one is discarded. When the catalog
//! service is down and nothing has been loaded yet, the YAML seed catalog
//! is served instead.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_cron_scheduler::{Job, JobScheduler};

use aura_core::load_catalog;
use aura_gateway::CatalogSource;

use crate::error::StateError;
use crate::store::AppStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogOrigin {
    Remote,
    Seed,
    /// The fetch failed and the catalog already in the store was kept.
    Kept,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub seq: u64,
    pub origin: CatalogOrigin,
    /// False when a newer fetch had already been applied.
    pub applied: bool,
    pub count: usize,
}

pub struct CatalogRefresher<C> {
    source: C,
    store: Arc<AppStore>,
    seed_path: Option<PathBuf>,
    seq: AtomicU64,
}

impl<C: CatalogSource> CatalogRefresher<C> {
    pub fn new(source: C, store: Arc<AppStore>) -> Self {
        Self {
            source,
            store,
            seed_path: None,
            seq: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn with_seed(mut self, path: impl Into<PathBuf>) -> Self {
        self.seed_path = Some(path.into());
        self
    }

    /// Fetches the catalog and hands it to the store.
    ///
    /// # Errors
    ///
    /// [`StateError::CatalogUnavailable`] when the fetch fails, nothing has
    /// been loaded yet and no seed is configured, or
    /// [`StateError::SeedCatalog`] when the seed cannot be loaded.
    pub async fn refresh(&self) -> Result<RefreshOutcome, StateError> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;

        match self.source.fetch_products().await {
            Ok(products) => {
                let count = products.len();
                let applied = self.store.set_products(seq, products);
                tracing::info!(seq, count, applied, "catalog refreshed");
                Ok(RefreshOutcome {
                    seq,
                    origin: CatalogOrigin::Remote,
                    applied,
                    count,
                })
            }
            Err(e) => {
                let current = self.store.snapshot();
                if current.catalog_seq > 0 {
                    tracing::warn!(
                        error = %e,
                        seq,
                        "catalog fetch failed, keeping current catalog"
                    );
                    return Ok(RefreshOutcome {
                        seq,
                        origin: CatalogOrigin::Kept,
                        applied: false,
                        count: current.products.len(),
                    });
                }
                let Some(path) = &self.seed_path else {
                    return Err(StateError::CatalogUnavailable(e));
                };
                tracing::warn!(
                    error = %e,
                    seed = %path.display(),
                    "catalog fetch failed, loading seed catalog"
                );
                let seed = load_catalog(path)?;
                let count = seed.products.len();
                let applied = self.store.set_products(seq, seed.products);
                Ok(RefreshOutcome {
                    seq,
                    origin: CatalogOrigin::Seed,
                    applied,
                    count,
                })
            }
        }
    }
}

/// Starts a scheduler that refreshes the catalog every `every`.
///
/// The returned [`JobScheduler`] must be kept alive; dropping it stops the
/// job.
///
/// # Errors
///
/// Returns [`StateError::Scheduler`] if the scheduler cannot be created,
/// the job cannot be registered, or the scheduler fails to start.
pub async fn spawn_catalog_refresh<C>(
    refresher: Arc<CatalogRefresher<C>>,
    every: Duration,
) -> Result<JobScheduler, StateError>
where
    C: CatalogSource + 'static,
{
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_repeated_async(every, move |_uuid, _lock| {
        let refresher = Arc::clone(&refresher);
        Box::pin(async move {
            if let Err(e) = refresher.refresh().await {
                tracing::error!(error = %e, "scheduler: catalog refresh failed");
            }
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;
    tracing::info!(every_secs = every.as_secs(), "scheduler: catalog refresh started");
    Ok(scheduler)
}
