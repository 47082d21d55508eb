// ABOUTME: CLI entry point for inline-dumper
// ABOUTME: Parses flags, resolves run settings, and drives the per-table dump

use clap::Parser;
use inline_dumper::config::{load_config_file, DumperConfig, OptionsConfig, ToolsConfig};
use inline_dumper::dump::TableDumper;
use inline_dumper::error::DumpError;
use inline_dumper::interactive::{
    resolve_settings, DialoguerPrompter, NonInteractive, SettingsPrompter,
};
use inline_dumper::mysql::MySqlTableSource;
use inline_dumper::runner::{ListPolicy, RunOutcome, Runner};
use inline_dumper::target::OutputLayout;
use inline_dumper::utils::{check_required_tools, format_duration};
use std::path::PathBuf;
use std::process::ExitCode;

/// Environment variable holding the database password
const PASSWORD_ENV_VAR: &str = "DUMPER_PASSWORD";

#[derive(Parser)]
#[command(name = "inline-dumper", version)]
#[command(about = "Dump every MySQL table to its own file", long_about = None)]
struct Cli {
    /// TOML profile with connection settings and dump options
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    #[arg(long)]
    user: Option<String>,
    #[arg(short = 'd', long)]
    database: Option<String>,
    /// Directory receiving the list, manifest, and per-table dumps
    #[arg(short = 'o', long)]
    output_dir: Option<PathBuf>,
    /// Compress each dump with gzip
    #[arg(long)]
    compress: bool,
    /// Write an MD5 manifest of every dump file
    #[arg(long)]
    checksums: bool,
    #[arg(long)]
    disable_column_statistics: bool,
    #[arg(long)]
    skip_lock_tables: bool,
    /// Dump only table structure without data
    #[arg(long)]
    no_data: bool,
    /// Reuse the saved table list without asking
    #[arg(long, conflicts_with = "refresh_list")]
    reuse_list: bool,
    /// Enumerate tables again and overwrite the saved list
    #[arg(long)]
    refresh_list: bool,
    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,
    /// Never prompt; unset values take their defaults
    #[arg(long)]
    no_input: bool,
    #[arg(long)]
    dump_program: Option<String>,
    #[arg(long)]
    compress_program: Option<String>,
}

impl Cli {
    /// Command-line values as a config layer that overrides the file
    fn overrides(&self) -> DumperConfig {
        let any_option = self.compress
            || self.checksums
            || self.disable_column_statistics
            || self.skip_lock_tables
            || self.no_data;

        DumperConfig {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            database: self.database.clone(),
            output_dir: self.output_dir.clone(),
            options: any_option.then(|| OptionsConfig {
                compress: self.compress.then_some(true),
                checksums: self.checksums.then_some(true),
                disable_column_statistics: self.disable_column_statistics.then_some(true),
                skip_lock_tables: self.skip_lock_tables.then_some(true),
                no_data: self.no_data.then_some(true),
            }),
            tools: ToolsConfig {
                dump: self.dump_program.clone(),
                compress: self.compress_program.clone(),
            },
        }
    }

    fn list_policy(&self) -> ListPolicy {
        if self.reuse_list {
            ListPolicy::Reuse
        } else if self.refresh_list {
            ListPolicy::Refresh
        } else {
            ListPolicy::Ask
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging - default to INFO level if RUST_LOG not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = if cli.no_input {
        run(cli, &mut NonInteractive).await
    } else {
        run(cli, &mut DialoguerPrompter::new()).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(DumpError::Execution { table, .. }) = e.downcast_ref::<DumpError>() {
                tracing::error!("Dump stopped at table '{}'", table);
            }
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run<P: SettingsPrompter>(cli: Cli, prompter: &mut P) -> anyhow::Result<()> {
    println!("# Inline DB dumper");

    let file_config = match &cli.config {
        Some(path) => load_config_file(path)?,
        None => DumperConfig::default(),
    };
    let config = file_config.merge(cli.overrides());
    let password = std::env::var(PASSWORD_ENV_VAR).ok();

    let settings = resolve_settings(config, password, prompter)?;

    check_required_tools(&settings.tool.required_programs(&settings.options))?;

    let layout = OutputLayout::new(settings.output_dir, settings.target.database());
    let dumper = TableDumper::new(layout, settings.tool);
    let mut source = MySqlTableSource::new(settings.target.clone());
    let runner = Runner::new(settings.target, settings.options, dumper)
        .with_list_policy(cli.list_policy())
        .assume_yes(cli.yes);

    match runner.run(&mut source, prompter).await? {
        RunOutcome::Aborted { .. } => {}
        RunOutcome::Completed(report) => {
            println!("# Dump process completed.");
            if let Some(manifest) = &report.manifest {
                println!("# Checksums: {}", manifest.display());
            }
            println!("# Dump execution time: {}", format_duration(report.elapsed));
        }
    }

    Ok(())
}
