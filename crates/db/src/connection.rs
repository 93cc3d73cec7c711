use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use tracing::debug;

pub type DbPool = sqlx::SqlitePool;

/// Opens a pool with the pragmas every session relies on.
///
/// In-memory databases live and die with their connection, so they are pinned
/// to a single connection that is never recycled.
pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let in_memory = is_in_memory(database_url);
    let max_connections = if in_memory { 1 } else { max_connections.max(1) };

    let mut options = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)));
    if in_memory {
        options = options.min_connections(1).idle_timeout(None).max_lifetime(None);
    }

    let pool = options
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await?;

    debug!(
        event_name = "db.pool.connected",
        in_memory,
        max_connections,
        "sqlite pool established"
    );
    Ok(pool)
}

pub fn is_in_memory(database_url: &str) -> bool {
    let url = database_url.trim();
    url == ":memory:" || url.starts_with("sqlite::memory:") || url.contains("mode=memory")
}

#[cfg(test)]
mod tests {
    use super::{connect_with_settings, is_in_memory};

    #[test]
    fn recognizes_in_memory_urls() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite::memory:?cache=shared"));
        assert!(is_in_memory("sqlite://file:clientele?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite://clientele.db?mode=rwc"));
    }

    #[tokio::test]
    async fn in_memory_pool_is_pinned_to_one_connection() {
        let pool = connect_with_settings("sqlite::memory:", 8, 5).await.expect("connect");

        assert_eq!(pool.options().get_max_connections(), 1);

        pool.close().await;
    }
}
