use std::sync::Arc;

use sqlx::pool::PoolConnection;
use sqlx::{Connection, Sqlite};
use tokio::sync::Mutex;

use clientele_core::domain::customer::Customer;

use crate::repositories::customer::apply_change;
use crate::repositories::{PendingChange, RepositoryError};
use crate::DbPool;

/// One pooled connection plus the writes staged against it.
pub struct SqlSession {
    pub(crate) conn: PoolConnection<Sqlite>,
    pub(crate) pending: Vec<PendingChange<Customer>>,
}

pub type SharedSession = Arc<Mutex<SqlSession>>;

impl SqlSession {
    pub async fn open(pool: &DbPool) -> Result<Self, RepositoryError> {
        let conn = pool.acquire().await?;
        Ok(Self { conn, pending: Vec::new() })
    }

    pub fn stage(&mut self, change: PendingChange<Customer>) {
        self.pending.push(change);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Writes every staged change inside one transaction.
    ///
    /// The staged list is drained whatever the outcome: a failure rolls the
    /// transaction back and drops the changes with it.
    pub async fn flush(&mut self) -> Result<u64, RepositoryError> {
        let changes = std::mem::take(&mut self.pending);
        if changes.is_empty() {
            return Ok(0);
        }

        let mut tx = self.conn.begin().await?;
        let mut affected = 0u64;
        for change in &changes {
            affected += apply_change(&mut *tx, change).await?;
        }
        tx.commit().await?;

        Ok(affected)
    }
}
