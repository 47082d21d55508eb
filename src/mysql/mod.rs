// ABOUTME: MySQL connection handling for table enumeration
// ABOUTME: Builds client options from the run target and exposes a lazy table source

pub mod reader;

use crate::runner::TableSource;
use crate::target::DatabaseTarget;
use anyhow::{Context, Result};
use mysql_async::{Conn, Opts, OptsBuilder};
use std::future::Future;
use std::pin::Pin;

/// Client options for a target, with the database selected
pub fn connection_opts(target: &DatabaseTarget) -> Opts {
    OptsBuilder::default()
        .ip_or_hostname(target.host())
        .tcp_port(target.port())
        .user(Some(target.user()))
        .pass(Some(target.password()))
        .db_name(Some(target.database()))
        .into()
}

/// Connect to the target's MySQL server
///
/// # Errors
///
/// Returns error if the server is unreachable or rejects the credentials.
///
/// # Examples
///
/// ```no_run
/// # use inline_dumper::mysql::connect;
/// # use inline_dumper::target::DatabaseTarget;
/// # async fn example() -> anyhow::Result<()> {
/// let target = DatabaseTarget::new("127.0.0.1", 3306, "root", "root", "shop")?;
/// let conn = connect(&target).await?;
/// # Ok(())
/// # }
/// ```
pub async fn connect(target: &DatabaseTarget) -> Result<Conn> {
    tracing::info!(
        "Connecting to MySQL at {}:{} as '{}'",
        target.host(),
        target.port(),
        target.user()
    );

    let conn = Conn::new(connection_opts(target)).await.with_context(|| {
        format!(
            "Failed to connect to MySQL database '{}' at {}:{}",
            target.database(),
            target.host(),
            target.port()
        )
    })?;

    tracing::debug!("Successfully connected to MySQL");

    Ok(conn)
}

/// Enumerates base tables over a connection opened only when asked
///
/// A run that reuses a saved list never touches the database.
#[derive(Debug, Clone)]
pub struct MySqlTableSource {
    target: DatabaseTarget,
}

impl MySqlTableSource {
    pub fn new(target: DatabaseTarget) -> Self {
        Self { target }
    }
}

impl TableSource for MySqlTableSource {
    fn list_tables(&mut self) -> Pin<Box<dyn Future<Output = Result<Vec<String>>> + '_>> {
        let fut = async move {
            let mut conn = connect(&self.target).await?;
            let tables = reader::list_base_tables(&mut conn, self.target.database()).await?;

            if let Err(e) = conn.disconnect().await {
                tracing::warn!("Failed to close MySQL connection cleanly: {}", e);
            }

            Ok::<_, anyhow::Error>(tables)
        };

        Box::pin(fut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_opts_from_target() {
        let target = DatabaseTarget::new("db.internal", 3307, "backup", "s3cret", "shop").unwrap();
        let opts = connection_opts(&target);

        assert_eq!(opts.ip_or_hostname(), "db.internal");
        assert_eq!(opts.tcp_port(), 3307);
        assert_eq!(opts.user(), Some("backup"));
        assert_eq!(opts.pass(), Some("s3cret"));
        assert_eq!(opts.db_name(), Some("shop"));
    }

    #[tokio::test]
    async fn test_list_tables_unreachable_server_fails() {
        // Port 1 on localhost is never a MySQL server
        let target = DatabaseTarget::new("127.0.0.1", 1, "root", "root", "shop").unwrap();
        let mut source = MySqlTableSource::new(target);

        let result = source.list_tables().await;
        assert!(result.is_err());
    }
}
