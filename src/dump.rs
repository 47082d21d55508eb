// ABOUTME: Wrapper for the mysqldump command to export one table per file
// ABOUTME: Handles command construction, credential passing, compression piping, and checksums

use crate::checksum::{file_checksum, ChecksumManifest};
use crate::error::DumpError;
use crate::target::{DatabaseTarget, DumpOptions, OutputLayout};
use crate::utils::{output_temp_file, validate_object_name};
use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output, Stdio};

/// Environment variable the MySQL client tools read the password from
pub const PASSWORD_ENV: &str = "MYSQL_PWD";

/// Arguments that make the compressor act as a stdin-to-stdout filter
const COMPRESS_ARGS: &[&str] = &["-c"];

/// External programs used by the dump pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpTool {
    pub dump_program: String,
    pub compress_program: String,
}

impl Default for DumpTool {
    fn default() -> Self {
        Self {
            dump_program: "mysqldump".to_string(),
            compress_program: "gzip".to_string(),
        }
    }
}

impl DumpTool {
    /// Programs that must be installed for a run with these options
    pub fn required_programs(&self, options: &DumpOptions) -> Vec<&str> {
        let mut programs = vec![self.dump_program.as_str()];
        if options.compress {
            programs.push(self.compress_program.as_str());
        }
        programs
    }
}

/// A fully-resolved dump invocation for one table
///
/// The argument order is fixed so the rendered command is stable:
/// base flags, connection flags, database and table, then the optional
/// flags in the order `--column-statistics=0`, `--skip-lock-tables`,
/// `--no-data`. The password is never part of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpCommand {
    program: String,
    args: Vec<String>,
}

impl DumpCommand {
    pub fn new(
        program: &str,
        target: &DatabaseTarget,
        table: &str,
        options: &DumpOptions,
    ) -> Self {
        let mut args = vec![
            "--compact".to_string(),
            "--skip-extended-insert".to_string(),
            format!("--host={}", target.host()),
            format!("--port={}", target.port()),
            format!("--user={}", target.user()),
            target.database().to_string(),
            table.to_string(),
        ];

        if options.disable_column_statistics {
            args.push("--column-statistics=0".to_string());
        }
        if options.skip_lock_tables {
            args.push("--skip-lock-tables".to_string());
        }
        if options.structure_only {
            args.push("--no-data".to_string());
        }

        Self {
            program: program.to_string(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Process builder with the password visible only to the child
    fn to_process(&self, password: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).env(PASSWORD_ENV, password);
        cmd
    }
}

impl fmt::Display for DumpCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// A table dump that completed successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpArtifact {
    pub table: String,
    /// Root-relative path as written to the checksum manifest
    pub relative_path: String,
    pub path: PathBuf,
    pub checksum: Option<String>,
}

/// Dumps single tables into an [`OutputLayout`]
#[derive(Debug, Clone)]
pub struct TableDumper {
    layout: OutputLayout,
    tool: DumpTool,
}

impl TableDumper {
    pub fn new(layout: OutputLayout, tool: DumpTool) -> Self {
        Self { layout, tool }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn tool(&self) -> &DumpTool {
        &self.tool
    }

    /// Dump one table to `<database>/<table>.sql[.gz]`
    ///
    /// Output goes to a temp file in the dump directory. When checksums are
    /// enabled its digest is appended to `checksums` before the file is
    /// renamed into place, so an artifact only appears once every process in
    /// the pipeline exited with status zero and its manifest line is written.
    /// If the final rename fails the manifest keeps a line for a missing file.
    ///
    /// # Errors
    ///
    /// - [`DumpError::Io`] if the directory, temp file, manifest or artifact cannot be written
    /// - [`DumpError::Execution`] if a process cannot be spawned or exits non-zero
    /// - [`DumpError::InvalidName`] if the table name cannot be a file name
    pub fn dump_table<W: Write>(
        &self,
        target: &DatabaseTarget,
        table: &str,
        options: &DumpOptions,
        checksums: Option<&mut ChecksumManifest<W>>,
    ) -> Result<DumpArtifact> {
        validate_object_name("table", table)?;

        let checksums = match (options.generate_checksums, checksums) {
            (true, None) => {
                return Err(anyhow!(
                    "Checksum generation is enabled but no checksum manifest is open"
                ))
            }
            (true, Some(sink)) => Some(sink),
            (false, _) => None,
        };

        let dump_dir = self.layout.dump_dir();
        ensure_dump_dir(&dump_dir)?;

        let command = DumpCommand::new(&self.tool.dump_program, target, table, options);
        let path = self.layout.artifact_path(table, options.compress);
        let relative_path = self.layout.artifact_relative_path(table, options.compress);

        tracing::debug!("Dumping table '{}' to {}", table, path.display());

        let tmp = output_temp_file(&dump_dir)?;
        let output = tmp
            .as_file()
            .try_clone()
            .map_err(|e| DumpError::io("open", tmp.path(), e))?;

        if options.compress {
            self.run_compressed(&command, target, table, output)?;
        } else {
            run_plain(&command, target, table, output)?;
        }

        let checksum = match checksums {
            Some(manifest) => {
                let digest = file_checksum(tmp.path())
                    .with_context(|| format!("Failed to checksum dump of table '{}'", table))?;
                manifest.append(&digest, &relative_path)?;
                tracing::debug!("{} {}", digest, relative_path);
                Some(digest)
            }
            None => None,
        };

        tmp.persist(&path)
            .map_err(|e| DumpError::io("persist", &path, e.error))?;

        Ok(DumpArtifact {
            table: table.to_string(),
            relative_path,
            path,
            checksum,
        })
    }

    /// `dump | compressor -c > output`, without a shell in between
    fn run_compressed(
        &self,
        command: &DumpCommand,
        target: &DatabaseTarget,
        table: &str,
        output: File,
    ) -> Result<()> {
        let rendered = format!(
            "{} | {} {}",
            command,
            self.tool.compress_program,
            COMPRESS_ARGS.join(" ")
        );

        let mut dump = command
            .to_process(target.password())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(table, &rendered, command.program(), e))?;

        let dump_stdout = dump
            .stdout
            .take()
            .ok_or_else(|| anyhow!("Dump process for table '{}' has no stdout", table))?;

        let compressor = Command::new(&self.tool.compress_program)
            .args(COMPRESS_ARGS)
            .stdin(Stdio::from(dump_stdout))
            .stdout(Stdio::from(output))
            .stderr(Stdio::piped())
            .spawn();

        let compressor = match compressor {
            Ok(child) => child,
            Err(e) => {
                let _ = dump.kill();
                let _ = dump.wait();
                return Err(spawn_error(table, &rendered, &self.tool.compress_program, e).into());
            }
        };

        // The compressor drains the dump's stdout while we collect the dump's stderr
        wait_pipeline(
            table,
            &rendered,
            || dump.wait_with_output(),
            || compressor.wait_with_output(),
        )
    }
}

/// Reap both pipeline stages, then report the first failure
///
/// The compressor is waited even when waiting on the dump fails.
fn wait_pipeline<D, C>(table: &str, rendered: &str, wait_dump: D, wait_compressor: C) -> Result<()>
where
    D: FnOnce() -> std::io::Result<Output>,
    C: FnOnce() -> std::io::Result<Output>,
{
    let dump_output = wait_dump();
    let compress_output = wait_compressor();

    let dump_output = dump_output.map_err(|e| wait_error(table, rendered, e))?;
    let compress_output = compress_output.map_err(|e| wait_error(table, rendered, e))?;

    check_status(table, rendered, dump_output.status, &dump_output.stderr)?;
    check_status(
        table,
        rendered,
        compress_output.status,
        &compress_output.stderr,
    )
}

/// `dump > output`
fn run_plain(
    command: &DumpCommand,
    target: &DatabaseTarget,
    table: &str,
    output: File,
) -> Result<()> {
    let rendered = command.to_string();

    let child = command
        .to_process(target.password())
        .stdin(Stdio::null())
        .stdout(Stdio::from(output))
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(table, &rendered, command.program(), e))?;

    let result = child
        .wait_with_output()
        .map_err(|e| wait_error(table, &rendered, e))?;

    check_status(table, &rendered, result.status, &result.stderr)
}

fn ensure_dump_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }

    fs::create_dir_all(dir).map_err(|e| DumpError::io("create directory", dir, e))?;
    tracing::debug!("Created dump directory {}", dir.display());
    Ok(())
}

fn check_status(table: &str, command: &str, status: ExitStatus, stderr: &[u8]) -> Result<()> {
    if status.success() {
        return Ok(());
    }

    Err(DumpError::Execution {
        table: table.to_string(),
        command: command.to_string(),
        status: status.code(),
        output: String::from_utf8_lossy(stderr).into_owned(),
    }
    .into())
}

fn spawn_error(table: &str, command: &str, program: &str, e: std::io::Error) -> DumpError {
    DumpError::Execution {
        table: table.to_string(),
        command: command.to_string(),
        status: None,
        output: format!("failed to start '{}': {}. Is it installed and on PATH?", program, e),
    }
}

fn wait_error(table: &str, command: &str, e: std::io::Error) -> DumpError {
    DumpError::Execution {
        table: table.to_string(),
        command: command.to_string(),
        status: None,
        output: format!("failed waiting for process: {}", e),
    }
}
