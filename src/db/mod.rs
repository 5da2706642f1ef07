/*
 * Responsibility
 * - Own the three named Postgres pools (writer / reader / migration)
 * - Route every acquisition: read-only unit of work -> reader replica,
 *   everything else -> writer
 * - Initialize pools once at startup from validated settings; a broken
 *   writer or reader config fails the boot, not a request
 */
use std::fmt;

use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use thiserror::Error;

pub mod settings;
pub mod tx;

use settings::{PoolSettings, SettingsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    Writer,
    Reader,
    Migration,
}

impl PoolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolKind::Writer => "writer",
            PoolKind::Reader => "reader",
            PoolKind::Migration => "migration",
        }
    }
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("failed to initialize required connection pool [{pool}]")]
    Init {
        pool: PoolKind,
        #[source]
        source: sqlx::Error,
    },
}

#[derive(Debug)]
pub struct Db {
    writer: PgPool,
    reader: PgPool,
    migration: PgPool,
}

impl Db {
    /// Build all three pools. Writer and reader are connected eagerly so a
    /// bad endpoint surfaces here; the migration pool only ever runs from
    /// operational tooling and connects on first use.
    pub async fn connect(
        settings: &settings::ConnectionSettings,
        max_connections: u32,
    ) -> Result<Self, DbError> {
        let writer = Self::eager_pool(settings.pool(PoolKind::Writer), max_connections).await?;
        let reader = Self::eager_pool(settings.pool(PoolKind::Reader), max_connections).await?;
        let migration = Self::lazy_pool(settings.pool(PoolKind::Migration))?;

        Ok(Self {
            writer,
            reader,
            migration,
        })
    }

    /// The routing decision, recomputed on every acquisition: transaction
    /// read-only state can differ between nested calls in one request, so
    /// the result is never cached.
    pub fn select(&self) -> &PgPool {
        match self.route() {
            PoolKind::Reader => &self.reader,
            _ => &self.writer,
        }
    }

    pub fn route(&self) -> PoolKind {
        if tx::is_current_transaction_read_only() {
            PoolKind::Reader
        } else {
            PoolKind::Writer
        }
    }

    pub fn migration(&self) -> &PgPool {
        &self.migration
    }

    async fn eager_pool(pool: PoolSettings, max_connections: u32) -> Result<PgPool, DbError> {
        let kind = pool.pool;
        let options = Self::connect_options(&pool)?;

        tracing::info!(
            pool = kind.as_str(),
            host = %pool.host,
            database = %pool.database,
            user = %pool.username,
            "initializing connection pool"
        );

        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|source| DbError::Init { pool: kind, source })
    }

    fn lazy_pool(pool: PoolSettings) -> Result<PgPool, DbError> {
        let options = Self::connect_options(&pool)?;
        Ok(PgPoolOptions::new().max_connections(1).connect_lazy_with(options))
    }

    fn connect_options(pool: &PoolSettings) -> Result<PgConnectOptions, DbError> {
        pool.validate()?;

        Ok(PgConnectOptions::new()
            .host(&pool.host)
            .port(pool.port_number()?)
            .username(&pool.username)
            .password(&pool.password)
            .database(&pool.database)
            .options([("search_path", pool.schema.as_str())]))
    }

    /// All pools lazy; no network touched. Test wiring only.
    #[cfg(test)]
    pub(crate) fn connect_lazy(settings: &settings::ConnectionSettings) -> Result<Self, DbError> {
        Ok(Self {
            writer: Self::lazy_pool(settings.pool(PoolKind::Writer))?,
            reader: Self::lazy_pool(settings.pool(PoolKind::Reader))?,
            migration: Self::lazy_pool(settings.pool(PoolKind::Migration))?,
        })
    }
}
