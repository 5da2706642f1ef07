/*
 * Responsibility
 * - Connection settings for the writer / reader / migration pools
 * - Per-pool resolution + validation (all six fields mandatory)
 * - SettingsProvider: where the settings come from (env vars vs. a mounted
 *   secret document), selected explicitly at startup
 */
use std::path::PathBuf;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use thiserror::Error;

use crate::db::PoolKind;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("connection pool [{pool}] field [{field}] is not defined")]
    MissingField { pool: PoolKind, field: &'static str },
    #[error("connection pool [{pool}] port is not a number")]
    InvalidPort { pool: PoolKind },
    #[error("failed to read database secret [{path}]: {source}")]
    SecretRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("database secret is not valid JSON: {0}")]
    SecretFormat(#[from] serde_json::Error),
    #[error("environment variable [{0}] is not defined")]
    MissingEnv(&'static str),
}

/// The full settings document, as provided by a secret or assembled from
/// the environment. The migration pool reuses the writer host/port with
/// its own credentials.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSettings {
    // Writer
    pub writer_host: String,
    pub writer_port: String,
    pub writer_username: String,
    pub writer_password: String,

    // Reader
    pub reader_host: String,
    pub reader_port: String,
    pub reader_username: String,
    pub reader_password: String,

    // Migration
    pub migration_username: String,
    pub migration_password: String,

    // Common
    pub database: String,
    pub schema: String,
}

/// One pool's resolved connection properties.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub pool: PoolKind,
    pub host: String,
    pub port: String,
    pub username: String,
    pub password: String,
    pub database: String,
    pub schema: String,
}

impl PoolSettings {
    /// Every field is mandatory; a blank value is a startup error, never a
    /// runtime one.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let missing = |field| SettingsError::MissingField {
            pool: self.pool,
            field,
        };

        if self.host.trim().is_empty() {
            return Err(missing("host"));
        }
        if self.port.trim().is_empty() {
            return Err(missing("port"));
        }
        if self.username.trim().is_empty() {
            return Err(missing("user"));
        }
        if self.password.trim().is_empty() {
            return Err(missing("password"));
        }
        if self.database.trim().is_empty() {
            return Err(missing("database"));
        }
        if self.schema.trim().is_empty() {
            return Err(missing("schema"));
        }
        Ok(())
    }

    pub fn port_number(&self) -> Result<u16, SettingsError> {
        self.port
            .trim()
            .parse()
            .map_err(|_| SettingsError::InvalidPort { pool: self.pool })
    }
}

impl ConnectionSettings {
    /// Resolve the properties for one pool. Validation is the caller's call
    /// (`PoolSettings::validate`), so resolution itself never fails.
    pub fn pool(&self, kind: PoolKind) -> PoolSettings {
        let (host, port, username, password) = match kind {
            PoolKind::Writer => (
                &self.writer_host,
                &self.writer_port,
                &self.writer_username,
                &self.writer_password,
            ),
            PoolKind::Reader => (
                &self.reader_host,
                &self.reader_port,
                &self.reader_username,
                &self.reader_password,
            ),
            // Migrations run against the writer instance under their own role.
            PoolKind::Migration => (
                &self.writer_host,
                &self.writer_port,
                &self.migration_username,
                &self.migration_password,
            ),
        };

        PoolSettings {
            pool: kind,
            host: host.clone(),
            port: port.clone(),
            username: username.clone(),
            password: password.clone(),
            database: self.database.clone(),
            schema: self.schema.clone(),
        }
    }

    /// Parse a secret document. Accepts raw JSON or a base64-encoded JSON
    /// payload (the shape secret managers hand out as binary).
    pub fn from_secret_document(raw: &str) -> Result<Self, SettingsError> {
        let trimmed = raw.trim();
        if trimmed.starts_with('{') {
            return Ok(serde_json::from_str(trimmed)?);
        }

        let decoded = BASE64
            .decode(trimmed.as_bytes())
            .map_err(|_| SettingsError::SecretFormat(serde::de::Error::custom("not base64")))?;
        Ok(serde_json::from_slice(&decoded)?)
    }

    /// Assemble from discrete environment variables (localdev): a single
    /// database instance serves writer, reader and migration.
    pub fn from_env() -> Result<Self, SettingsError> {
        fn required(key: &'static str) -> Result<String, SettingsError> {
            std::env::var(key).map_err(|_| SettingsError::MissingEnv(key))
        }

        let host = required("AURORA_HOST")?;
        let port = required("AURORA_PORT")?;
        let username = required("AURORA_USERNAME")?;
        let password = required("AURORA_PASSWORD")?;
        let database = required("AURORA_DATABASE")?;
        let schema = required("AURORA_SCHEMA")?;

        Ok(Self {
            writer_host: host.clone(),
            writer_port: port.clone(),
            writer_username: username.clone(),
            writer_password: password.clone(),
            reader_host: host,
            reader_port: port,
            reader_username: username.clone(),
            reader_password: password.clone(),
            migration_username: username,
            migration_password: password,
            database,
            schema,
        })
    }
}

/// Where connection settings come from. Chosen by explicit configuration
/// (`DB_SETTINGS_PROVIDER`), not by what happens to be present.
#[derive(Debug, Clone)]
pub enum SettingsProvider {
    /// Discrete AURORA_* environment variables (localdev).
    Env,
    /// A mounted secret document: raw or base64-encoded camelCase JSON.
    SecretFile { path: PathBuf },
}

impl SettingsProvider {
    pub fn provide(&self) -> Result<ConnectionSettings, SettingsError> {
        match self {
            SettingsProvider::Env => ConnectionSettings::from_env(),
            SettingsProvider::SecretFile { path } => {
                let raw =
                    std::fs::read_to_string(path).map_err(|source| SettingsError::SecretRead {
                        path: path.display().to_string(),
                        source,
                    })?;
                ConnectionSettings::from_secret_document(&raw)
            }
        }
    }
}

/// Test fixture shared by the db module tests.
#[cfg(test)]
pub(crate) fn sample() -> ConnectionSettings {
    ConnectionSettings {
        writer_host: "writer.db.internal".into(),
        writer_port: "5432".into(),
        writer_username: "app_rw".into(),
        writer_password: "writer-secret".into(),
        reader_host: "reader.db.internal".into(),
        reader_port: "5433".into(),
        reader_username: "app_ro".into(),
        reader_password: "reader-secret".into(),
        migration_username: "app_migrate".into(),
        migration_password: "migration-secret".into(),
        database: "backend".into(),
        schema: "core".into(),
    }
}
