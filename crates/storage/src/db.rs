use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use tally_core::Money;

pub type DbPool = Pool<Sqlite>;

/// Amounts are stored as whole cents; one that does not fit is an encode error.
pub(crate) fn cents(amount: Money) -> Result<i64, sqlx::Error> {
    amount
        .to_cents()
        .ok_or_else(|| sqlx::Error::Encode(format!("amount {amount} does not fit in cents").into()))
}

/// Opens (creating if needed) the database file at `path` and brings the
/// schema up to date.
pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    prepare(&pool).await?;
    Ok(pool)
}

/// Like [`create_db`] but from a connection URL such as `sqlite::memory:`.
///
/// The single connection is pinned for the life of the pool, otherwise an
/// in-memory database would vanish whenever the pool recycled it.
pub async fn connect(url: &str) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    prepare(&pool).await?;
    Ok(pool)
}

async fn prepare(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(pool)
        .await?;
    sqlx::query("PRAGMA cache_size = -32000")
        .execute(pool)
        .await?;

    run_migrations(pool).await
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ledger (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email_id TEXT,
            email_subject TEXT,
            email_date TEXT,
            merchant_name TEXT NOT NULL,
            amount_cents INTEGER NOT NULL CHECK (amount_cents >= 0),
            date TEXT NOT NULL,
            category TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            receipt_text TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_ledger_date ON ledger(date)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_ledger_email_id ON ledger(email_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS email_processing_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email_id TEXT NOT NULL UNIQUE,
            processed_at TEXT NOT NULL,
            status TEXT NOT NULL,
            error_message TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reconciliation_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            total_matches INTEGER NOT NULL DEFAULT 0,
            total_ledger_only INTEGER NOT NULL DEFAULT 0,
            total_bank_only INTEGER NOT NULL DEFAULT 0,
            total_matched_cents INTEGER NOT NULL DEFAULT 0,
            total_ledger_cents INTEGER NOT NULL DEFAULT 0,
            total_bank_cents INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_database_is_created_and_migrations_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipts.db");

        let pool = create_db(&path).await.unwrap();
        assert!(path.exists());
        pool.close().await;

        // Re-opening runs the migrations again against the existing schema.
        let pool = create_db(&path).await.unwrap();
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('ledger', 'email_processing_log', 'reconciliation_history')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn in_memory_database_keeps_schema_across_queries() {
        let pool = connect("sqlite::memory:").await.unwrap();
        for _ in 0..3 {
            let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ledger")
                .fetch_one(&pool)
                .await
                .unwrap();
            assert_eq!(n, 0);
        }
    }
}
