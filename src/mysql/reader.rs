// ABOUTME: MySQL catalog introspection for the tables to dump
// ABOUTME: Lists base tables only; views and other objects are skipped

use crate::error::DumpError;
use anyhow::Result;
use mysql_async::{prelude::*, Conn, Row};
use std::collections::HashSet;

/// Catalog query listing the current database's base tables with their type
pub const BASE_TABLES_QUERY: &str = "SHOW FULL TABLES WHERE Table_type = 'BASE TABLE'";

const BASE_TABLE_TYPE: &str = "BASE TABLE";

/// List all base tables in the connection's current database
///
/// Returns names in the order the server reports them.
///
/// # Errors
///
/// - [`DumpError::Query`] if the catalog query fails
/// - [`DumpError::Scan`] if a row does not decode as `(name, type)` strings
///
/// # Examples
///
/// ```no_run
/// # use inline_dumper::mysql::{connect, reader::list_base_tables};
/// # use inline_dumper::target::DatabaseTarget;
/// # async fn example() -> anyhow::Result<()> {
/// let target = DatabaseTarget::new("127.0.0.1", 3306, "root", "root", "shop")?;
/// let mut conn = connect(&target).await?;
/// let tables = list_base_tables(&mut conn, "shop").await?;
/// println!("Found {} tables", tables.len());
/// # Ok(())
/// # }
/// ```
pub async fn list_base_tables(conn: &mut Conn, database: &str) -> Result<Vec<String>> {
    tracing::info!("Listing base tables from MySQL database '{}'", database);

    let rows: Vec<Row> = conn
        .query(BASE_TABLES_QUERY)
        .await
        .map_err(|source| DumpError::Query {
            database: database.to_string(),
            source,
        })?;

    let mut decoded = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        let pair = mysql_async::from_row_opt::<(String, String)>(row).map_err(|e| {
            DumpError::Scan {
                row: index,
                message: e.to_string(),
            }
        })?;
        decoded.push(pair);
    }

    let tables = collect_base_tables(decoded);

    tracing::info!("Found {} table(s) in database '{}'", tables.len(), database);

    Ok(tables)
}

/// Keep `BASE TABLE` rows, in order, dropping repeated names
pub fn collect_base_tables<I>(rows: I) -> Vec<String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut seen = HashSet::new();
    let mut tables = Vec::new();

    for (name, table_type) in rows {
        if !table_type.eq_ignore_ascii_case(BASE_TABLE_TYPE) {
            tracing::debug!("Skipping '{}' ({})", name, table_type);
            continue;
        }
        if seen.insert(name.clone()) {
            tables.push(name);
        }
    }

    tables
}
