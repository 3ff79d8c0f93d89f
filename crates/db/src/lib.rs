//! SQLite connection pool and migration runner for bookshelf.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::Row;

pub type DbPool = sqlx::SqlitePool;

const LEDGER_TABLE: &str = "_bookshelf_migrations";

/// Schema change contributed by a module.
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("failed to open database '{url}': {source}")]
    Connect {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("migration {module}/{id} failed: {source}")]
    Migration {
        module: String,
        id: String,
        #[source]
        source: sqlx::Error,
    },

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Create a connection pool from a database URL.
///
/// In-memory databases live only as long as their connection, so they get a
/// single connection that is never reaped.
pub async fn create_pool(url: &str, max_connections: u32) -> Result<DbPool, DbError> {
    let connect_err = |source| DbError::Connect {
        url: url.to_string(),
        source,
    };

    let options = SqliteConnectOptions::from_str(url)
        .map_err(connect_err)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool_options = if is_in_memory(url) {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(max_connections.max(1))
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(connect_err)?;

    tracing::debug!(target: "bookshelf-db", url, "database pool ready");
    Ok(pool)
}

/// Private in-memory database, mostly for tests and one-off tooling.
pub async fn memory_pool() -> Result<DbPool, DbError> {
    create_pool("sqlite::memory:", 1).await
}

async fn ensure_ledger(pool: &DbPool) -> Result<(), DbError> {
    let ddl = format!(
        "CREATE TABLE IF NOT EXISTS {LEDGER_TABLE} (
            module     TEXT NOT NULL,
            id         TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (module, id)
        )"
    );
    sqlx::query(&ddl).execute(pool).await?;
    Ok(())
}

/// Migrations already recorded in the ledger, as `(module, id)` pairs.
pub async fn applied_migrations(pool: &DbPool) -> Result<Vec<(String, String)>, DbError> {
    ensure_ledger(pool).await?;

    let query = format!("SELECT module, id FROM {LEDGER_TABLE} ORDER BY module, id");
    let rows = sqlx::query(&query).fetch_all(pool).await?;

    rows.iter()
        .map(|row| -> Result<(String, String), DbError> {
            Ok((row.try_get("module")?, row.try_get("id")?))
        })
        .collect()
}

/// Apply every migration not yet in the ledger, in the order given.
///
/// Each migration runs in its own transaction together with its ledger row.
/// Returns the number of migrations applied.
pub async fn run_migrations(
    pool: &DbPool,
    migrations: &[(String, Migration)],
) -> Result<usize, DbError> {
    let applied = applied_migrations(pool).await?;
    let insert = format!("INSERT INTO {LEDGER_TABLE} (module, id) VALUES (?1, ?2)");
    let mut count = 0;

    for (module, migration) in migrations {
        if applied
            .iter()
            .any(|(m, id)| m == module && id == migration.id)
        {
            continue;
        }

        let failed = |source| DbError::Migration {
            module: module.clone(),
            id: migration.id.to_string(),
            source,
        };

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .map_err(failed)?;
        sqlx::query(&insert)
            .bind(module)
            .bind(migration.id)
            .execute(&mut *tx)
            .await
            .map_err(failed)?;
        tx.commit().await?;

        tracing::info!(
            target: "bookshelf-db",
            module = %module,
            migration = migration.id,
            "applied migration"
        );
        count += 1;
    }

    Ok(count)
}
