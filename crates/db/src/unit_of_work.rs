use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::repositories::{CustomerRepository, RepositoryError, SqlCustomerRepository};
use crate::session::{SharedSession, SqlSession};
use crate::DbPool;

/// A bounded scope owning one persistence session. Every write staged through
/// its repositories becomes durable together on [`UnitOfWork::complete`], or
/// not at all.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    type Customers: CustomerRepository;

    /// The customer repository bound to this unit of work. Built on first
    /// access and the same instance on every later call.
    fn customers(&self) -> &Self::Customers;

    /// Commits every staged change atomically and returns the affected row
    /// count. The staged changes are consumed either way; on failure none of
    /// them is durable.
    async fn complete(&self) -> Result<u64, RepositoryError>;

    async fn pending_changes(&self) -> usize;
}

pub struct SqlUnitOfWork {
    session: SharedSession,
    customers: OnceLock<SqlCustomerRepository>,
}

impl SqlUnitOfWork {
    /// Acquires one connection from the pool for the lifetime of the unit.
    pub async fn begin(pool: &DbPool) -> Result<Self, RepositoryError> {
        let session = SqlSession::open(pool).await?;
        debug!(event_name = "db.unit_of_work.begin", "unit of work opened");
        Ok(Self { session: Arc::new(Mutex::new(session)), customers: OnceLock::new() })
    }

    /// Hands the connection back to the pool. Staged changes that were never
    /// committed are discarded.
    pub async fn release(self) {
        let discarded = self.session.lock().await.pending_len();
        if discarded > 0 {
            warn!(
                event_name = "db.unit_of_work.discarded",
                discarded,
                "unit of work released with uncommitted changes"
            );
        }
        debug!(event_name = "db.unit_of_work.released", "unit of work released");
    }
}

#[async_trait]
impl UnitOfWork for SqlUnitOfWork {
    type Customers = SqlCustomerRepository;

    fn customers(&self) -> &SqlCustomerRepository {
        self.customers.get_or_init(|| SqlCustomerRepository::new(Arc::clone(&self.session)))
    }

    async fn complete(&self) -> Result<u64, RepositoryError> {
        let mut session = self.session.lock().await;
        let staged = session.pending_len();

        match session.flush().await {
            Ok(affected) => {
                info!(
                    event_name = "db.unit_of_work.commit",
                    staged,
                    affected,
                    "unit of work committed"
                );
                Ok(affected)
            }
            Err(error) => {
                warn!(
                    event_name = "db.unit_of_work.commit_failed",
                    staged,
                    error = %error,
                    "unit of work commit rolled back"
                );
                Err(error)
            }
        }
    }

    async fn pending_changes(&self) -> usize {
        self.session.lock().await.pending_len()
    }
}
