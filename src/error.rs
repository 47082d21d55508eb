// ABOUTME: Error taxonomy for table enumeration, list persistence and dump execution
// ABOUTME: Variants are wrapped in anyhow at the failure site so callers can downcast

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum DumpError {
    /// File create/read/write or directory creation failure
    Io {
        operation: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    /// The catalog query could not be executed
    Query {
        database: String,
        source: mysql_async::Error,
    },
    /// A catalog row could not be decoded into (name, type)
    Scan { row: usize, message: String },
    /// The dump pipeline could not be spawned or exited non-zero
    Execution {
        table: String,
        command: String,
        status: Option<i32>,
        output: String,
    },
    /// A database or table name that cannot be used as a file name
    InvalidName {
        kind: &'static str,
        name: String,
        reason: &'static str,
    },
    /// A table list that violates uniqueness
    InvalidList { path: PathBuf, message: String },
}

impl DumpError {
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DumpError::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub fn is_execution(&self) -> bool {
        matches!(self, DumpError::Execution { .. })
    }
}

impl fmt::Display for DumpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DumpError::Io {
                operation,
                path,
                source,
            } => write!(f, "IO error: failed to {} {}: {}", operation, path.display(), source),
            DumpError::Query { database, source } => write!(
                f,
                "Query error: failed to list tables of database '{}': {}",
                database, source
            ),
            DumpError::Scan { row, message } => {
                write!(f, "Scan error: cannot decode table row {}: {}", row, message)
            }
            DumpError::Execution {
                table,
                command,
                status,
                output,
            } => {
                match status {
                    Some(code) => write!(
                        f,
                        "Dump execution error for table '{}': command `{}` exited with status {}",
                        table, command, code
                    )?,
                    None => write!(
                        f,
                        "Dump execution error for table '{}': command `{}` did not complete",
                        table, command
                    )?,
                }
                let output = output.trim();
                if !output.is_empty() {
                    write!(f, ", output: {}", output)?;
                }
                Ok(())
            }
            DumpError::InvalidName { kind, name, reason } => {
                write!(f, "Invalid {} name '{}': {}", kind, name, reason)
            }
            DumpError::InvalidList { path, message } => {
                write!(f, "Invalid table list {}: {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for DumpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DumpError::Io { source, .. } => Some(source),
            DumpError::Query { source, .. } => Some(source),
            _ => None,
        }
    }
}
