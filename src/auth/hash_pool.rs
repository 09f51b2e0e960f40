use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::password::{HashError, PasswordHasher};

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("hashing queue is full")]
    Busy,
    #[error(transparent)]
    Hash(#[from] HashError),
    #[error("hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Runs password hashing off the async workers with bounded concurrency.
///
/// At most `workers` hashes execute at once and at most `queue_depth` more may
/// wait; anything beyond that is shed with [`PoolError::Busy`].
#[derive(Clone)]
pub struct HashingPool {
    hasher: PasswordHasher,
    admission: Arc<Semaphore>,
    workers: Arc<Semaphore>,
}

impl HashingPool {
    pub fn new(hasher: PasswordHasher, workers: usize, queue_depth: usize) -> Self {
        let workers = workers.clamp(1, Semaphore::MAX_PERMITS);
        let admitted = workers
            .saturating_add(queue_depth)
            .min(Semaphore::MAX_PERMITS);
        Self {
            hasher,
            admission: Arc::new(Semaphore::new(admitted)),
            workers: Arc::new(Semaphore::new(workers)),
        }
    }

    pub async fn hash(&self, plain: String) -> Result<String, PoolError> {
        self.run(move |hasher| hasher.hash(&plain)).await
    }

    pub async fn verify(&self, hash: String, plain: String) -> Result<bool, PoolError> {
        self.run(move |hasher| hasher.verify(&hash, &plain)).await
    }

    async fn run<T, F>(&self, job: F) -> Result<T, PoolError>
    where
        T: Send + 'static,
        F: FnOnce(&PasswordHasher) -> Result<T, HashError> + Send + 'static,
    {
        let admitted = self.admission.clone().try_acquire_owned().map_err(|_| {
            warn!("hashing pool saturated; shedding request");
            PoolError::Busy
        })?;
        // The semaphore is never closed, so acquisition only fails on shutdown.
        let worker = self
            .workers
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Busy)?;
        debug!(
            available = self.workers.available_permits(),
            "hashing job started"
        );
        let hasher = self.hasher.clone();
        // Permits travel with the blocking job so a dropped caller cannot
        // free a slot while argon2 is still running.
        let out = tokio::task::spawn_blocking(move || {
            let _permits = (admitted, worker);
            job(&hasher)
        })
        .await??;
        Ok(out)
    }
}
