use deadpool_postgres::{
    Config as PgConfig, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime as PoolRuntime,
    SslMode as PgSslMode,
};
use tokio::runtime::Runtime;
use tokio_postgres::NoTls;

use crate::backend::{Connector, TxOptions};
use crate::config::{DbConfig, SslMode};
use crate::error::DbiError;
use crate::translation::PlaceholderStyle;

use super::transaction::PostgresTx;

/// Postgres connections from a `deadpool-postgres` pool, driven by a runtime owned by the
/// connector so that every call can block.
///
/// Calls must not be made from inside another tokio runtime.
pub struct PostgresConnector {
    runtime: Runtime,
    pool: Pool,
}

fn pg_ssl_mode(mode: SslMode) -> PgSslMode {
    match mode {
        SslMode::Disable => PgSslMode::Disable,
        SslMode::Allow | SslMode::Prefer => PgSslMode::Prefer,
        SslMode::Require | SslMode::VerifyCa | SslMode::VerifyFull => PgSslMode::Require,
    }
}

impl PostgresConnector {
    /// Build the pool described by `config` and check that a connection can be made.
    ///
    /// # Errors
    /// Returns `DbiError::ConfigError` for missing fields or an unreadable password, and
    /// `DbiError::ConnectionError` if the runtime or pool cannot be created or the server
    /// does not answer.
    pub fn connect(config: &DbConfig) -> Result<Self, DbiError> {
        config.validate()?;

        let mut pg_config = PgConfig::new();
        pg_config.dbname = Some(config.name.clone());
        pg_config.user = Some(config.user.clone());
        pg_config.password = config.resolve_password()?;
        pg_config.host = Some(config.host().to_string());
        pg_config.port = Some(config.port());
        pg_config.ssl_mode = Some(pg_ssl_mode(config.ssl_mode()));
        pg_config.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        if config.max_open_conns > 0 {
            pg_config.pool = Some(PoolConfig::new(config.max_open_conns));
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("sql-dbi-postgres")
            .enable_all()
            .build()
            .map_err(|e| {
                DbiError::ConnectionError(format!("Failed to start Postgres runtime: {e}"))
            })?;

        let pool = pg_config
            .create_pool(Some(PoolRuntime::Tokio1), NoTls)
            .map_err(|e| {
                DbiError::ConnectionError(format!("Failed to create Postgres pool: {e}"))
            })?;

        let connector = Self { runtime, pool };
        connector.ping()?;
        tracing::debug!(
            host = config.host(),
            port = config.port(),
            dbname = %config.name,
            "postgres pool ready"
        );
        Ok(connector)
    }

    /// # Errors
    /// Returns `DbiError` if no pooled connection answers `SELECT 1`.
    pub fn ping(&self) -> Result<(), DbiError> {
        self.runtime.block_on(async {
            let client = self.pool.get().await?;
            client.simple_query("SELECT 1").await?;
            Ok::<(), DbiError>(())
        })
    }

    /// Close the pool; outstanding connections are dropped when returned.
    pub fn close(&self) {
        self.pool.close();
    }
}

impl Connector for PostgresConnector {
    type Tx<'c> = PostgresTx<'c>;

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Postgres
    }

    fn begin(&self, options: &TxOptions) -> Result<PostgresTx<'_>, DbiError> {
        let client = self.runtime.block_on(self.pool.get())?;
        PostgresTx::begin(&self.runtime, client, options)
    }
}
