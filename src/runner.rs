// ABOUTME: Run controller tying list resolution, confirmation, and per-table dumps together
// ABOUTME: Sequential and fail-fast; the operator and the database sit behind small traits

use crate::checksum::ChecksumManifest;
use crate::dump::{DumpArtifact, TableDumper};
use crate::table_list::{TableList, TableListStore};
use crate::target::{DatabaseTarget, DumpOptions};
use crate::utils::format_duration;
use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::{Duration, Instant};

// Live enumeration of the tables to dump
pub trait TableSource {
    fn list_tables(&mut self) -> Pin<Box<dyn Future<Output = Result<Vec<String>>> + '_>>;
}

// Yes/no questions put to the operator
pub trait Prompter {
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool>;
}

/// How to treat an existing `<database>.list`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListPolicy {
    /// Ask the operator whether to reuse it
    #[default]
    Ask,
    /// Reuse it without asking; the file must exist
    Reuse,
    /// Always enumerate again and overwrite it
    Refresh,
}

/// Where the table list of a run came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOrigin {
    Reused,
    Enumerated,
}

#[derive(Debug)]
pub enum RunOutcome {
    /// The operator declined; nothing beyond the list file was written
    Aborted { tables: TableList },
    Completed(RunReport),
}

#[derive(Debug)]
pub struct RunReport {
    pub artifacts: Vec<DumpArtifact>,
    pub list_origin: ListOrigin,
    pub manifest: Option<PathBuf>,
    /// Wall-clock time of the dump phase only
    pub elapsed: Duration,
}

pub struct Runner {
    target: DatabaseTarget,
    options: DumpOptions,
    dumper: TableDumper,
    store: TableListStore,
    list_policy: ListPolicy,
    assume_yes: bool,
}

impl Runner {
    pub fn new(target: DatabaseTarget, options: DumpOptions, dumper: TableDumper) -> Self {
        let store = TableListStore::new(dumper.layout());
        Self {
            target,
            options,
            dumper,
            store,
            list_policy: ListPolicy::default(),
            assume_yes: false,
        }
    }

    pub fn with_list_policy(mut self, policy: ListPolicy) -> Self {
        self.list_policy = policy;
        self
    }

    /// Skip the proceed confirmation
    pub fn assume_yes(mut self, yes: bool) -> Self {
        self.assume_yes = yes;
        self
    }

    pub fn store(&self) -> &TableListStore {
        &self.store
    }

    pub async fn run(
        &self,
        source: &mut dyn TableSource,
        prompter: &mut dyn Prompter,
    ) -> Result<RunOutcome> {
        let (tables, origin) = self.resolve_table_list(source, prompter).await?;

        if !self.confirm_proceed(&tables, prompter)? {
            println!("Dump process aborted.");
            return Ok(RunOutcome::Aborted { tables });
        }

        let report = self.dump_all(&tables, origin)?;
        Ok(RunOutcome::Completed(report))
    }

    /// Reuse the saved list or enumerate and persist a fresh one
    pub async fn resolve_table_list(
        &self,
        source: &mut dyn TableSource,
        prompter: &mut dyn Prompter,
    ) -> Result<(TableList, ListOrigin)> {
        let list_path = self.store.path().display().to_string();

        let reuse = match self.list_policy {
            ListPolicy::Refresh => false,
            ListPolicy::Reuse => {
                if !self.store.exists() {
                    bail!(
                        "List file {} does not exist; run without --reuse-list to create it",
                        list_path
                    );
                }
                true
            }
            ListPolicy::Ask => {
                self.store.exists()
                    && prompter.confirm(
                        &format!(
                            "List file {} already exists. Do you want to use it?",
                            list_path
                        ),
                        false,
                    )?
            }
        };

        if reuse {
            let tables = self.store.load()?;
            return Ok((tables, ListOrigin::Reused));
        }

        let names = source.list_tables().await.with_context(|| {
            format!(
                "Failed to enumerate tables of database '{}'",
                self.target.database()
            )
        })?;
        let tables = TableList::new(names).with_context(|| {
            format!(
                "Database '{}' returned a table name that cannot be dumped to a file",
                self.target.database()
            )
        })?;

        self.store
            .save(&tables)
            .with_context(|| format!("Failed to save table list to {}", list_path))?;

        Ok((tables, ListOrigin::Enumerated))
    }

    fn confirm_proceed(&self, tables: &TableList, prompter: &mut dyn Prompter) -> Result<bool> {
        println!("# Tables: \n{}", tables.inline());
        println!("# Total tables: {}", tables.len());

        if tables.is_empty() {
            tracing::warn!(
                "⚠ No base tables to dump in database '{}'",
                self.target.database()
            );
        }

        if self.assume_yes {
            return Ok(true);
        }

        prompter.confirm(
            "Do you want to proceed with the dump process based on the selected list?",
            false,
        )
    }

    /// Dump every table in list order, stopping at the first failure
    pub fn dump_all(&self, tables: &TableList, origin: ListOrigin) -> Result<RunReport> {
        let manifest_path = self.dumper.layout().manifest_path();
        let mut manifest = if self.options.generate_checksums {
            Some(ChecksumManifest::create(&manifest_path)?)
        } else {
            None
        };

        let progress = ProgressBar::new(tables.len() as u64);
        if let Ok(style) = ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}") {
            progress.set_style(style);
        }

        let start = Instant::now();
        let mut artifacts = Vec::with_capacity(tables.len());

        for (index, table) in tables.iter().enumerate() {
            tracing::info!(" - {} ({}/{})", table, index + 1, tables.len());
            progress.set_message(table.to_string());

            let artifact = self
                .dumper
                .dump_table(&self.target, table, &self.options, manifest.as_mut())
                .with_context(|| format!("Failed to dump table {}", table));

            match artifact {
                Ok(artifact) => artifacts.push(artifact),
                Err(e) => {
                    progress.abandon();
                    return Err(e);
                }
            }

            progress.inc(1);
        }

        let elapsed = start.elapsed();
        progress.finish_and_clear();

        if let Some(manifest) = manifest {
            tracing::info!(
                "✓ Wrote {} checksum(s) to {}",
                manifest.entries(),
                manifest.path().display()
            );
            manifest.finish()?;
        }

        tracing::info!(
            "✓ Dumped {} table(s) in {}",
            artifacts.len(),
            format_duration(elapsed)
        );

        Ok(RunReport {
            artifacts,
            list_origin: origin,
            manifest: self.options.generate_checksums.then_some(manifest_path),
            elapsed,
        })
    }
}
