// ABOUTME: Run-wide inputs: connection target, dump options, and output file layout
// ABOUTME: All three are built once before a run and never change during it

use crate::error::DumpError;
use crate::utils::validate_object_name;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3306;
pub const DEFAULT_USER: &str = "root";
pub const DEFAULT_PASSWORD: &str = "root";
pub const DEFAULT_DATABASE: &str = "db";

/// Connection parameters for the database being dumped
///
/// The password is only ever handed to the MySQL client and to the dump
/// process environment. It is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseTarget {
    host: String,
    port: u16,
    user: String,
    password: String,
    database: String,
}

impl DatabaseTarget {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Result<Self, DumpError> {
        let database = database.into();
        validate_object_name("database", &database)?;

        Ok(Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            database,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn database(&self) -> &str {
        &self.database
    }
}

impl fmt::Debug for DatabaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

/// Per-run switches for the dump pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpOptions {
    /// Pipe dump output through the compressor into `<table>.sql.gz`
    pub compress: bool,
    /// Record an MD5 line per artifact in `<database>.checksums`
    pub generate_checksums: bool,
    /// `--column-statistics=0`, needed when a MySQL 8 client dumps an older server
    pub disable_column_statistics: bool,
    /// `--skip-lock-tables`
    pub skip_lock_tables: bool,
    /// `--no-data`
    pub structure_only: bool,
}

/// Where a run's files live relative to an output root
///
/// ```text
/// <root>/<database>.list
/// <root>/<database>.checksums
/// <root>/<database>/<table>.sql[.gz]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
    database: String,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>, database: &str) -> Self {
        Self {
            root: root.into(),
            database: database.to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn list_path(&self) -> PathBuf {
        self.root.join(format!("{}.list", self.database))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(format!("{}.checksums", self.database))
    }

    pub fn dump_dir(&self) -> PathBuf {
        self.root.join(&self.database)
    }

    /// Root-relative artifact path, always `/`-separated so manifests are portable
    pub fn artifact_relative_path(&self, table: &str, compress: bool) -> String {
        let extension = if compress { "sql.gz" } else { "sql" };
        format!("{}/{}.{}", self.database, table, extension)
    }

    pub fn artifact_path(&self, table: &str, compress: bool) -> PathBuf {
        let extension = if compress { "sql.gz" } else { "sql" };
        self.dump_dir().join(format!("{}.{}", table, extension))
    }
}
