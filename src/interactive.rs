// ABOUTME: Terminal prompts that fill in whatever the command line and config left unset
// ABOUTME: Provides the dialoguer-backed prompter and a non-interactive fallback

use crate::config::{DumperConfig, OptionsConfig};
use crate::dump::DumpTool;
use crate::runner::Prompter;
use crate::target::{
    DatabaseTarget, DumpOptions, DEFAULT_DATABASE, DEFAULT_HOST, DEFAULT_PASSWORD, DEFAULT_PORT,
    DEFAULT_USER,
};
use anyhow::{Context, Result};
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password};
use std::path::PathBuf;

/// Free-text questions on top of the yes/no ones the runner asks
pub trait SettingsPrompter: Prompter {
    fn input(&mut self, prompt: &str, default: &str) -> Result<String>;

    /// Hidden input; an empty answer yields `default`
    fn secret(&mut self, prompt: &str, default: &str) -> Result<String>;
}

/// Prompts on the controlling terminal
pub struct DialoguerPrompter {
    theme: ColorfulTheme,
}

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for DialoguerPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for DialoguerPrompter {
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool> {
        Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact()
            .context("Failed to read confirmation")
    }
}

impl SettingsPrompter for DialoguerPrompter {
    fn input(&mut self, prompt: &str, default: &str) -> Result<String> {
        let answer: String = Input::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default.to_string())
            .interact_text()
            .with_context(|| format!("Failed to read answer to '{}'", prompt))?;
        Ok(answer.trim().to_string())
    }

    fn secret(&mut self, prompt: &str, default: &str) -> Result<String> {
        let answer = Password::with_theme(&self.theme)
            .with_prompt(format!("{} (default: {})", prompt, default))
            .allow_empty_password(true)
            .interact()
            .context("Failed to read password")?;

        if answer.is_empty() {
            Ok(default.to_string())
        } else {
            Ok(answer)
        }
    }
}

/// Answers every question with its default, for `--no-input` runs
#[derive(Debug, Default)]
pub struct NonInteractive;

impl Prompter for NonInteractive {
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool> {
        tracing::debug!("No input: '{}' -> {}", prompt, default);
        Ok(default)
    }
}

impl SettingsPrompter for NonInteractive {
    fn input(&mut self, _prompt: &str, default: &str) -> Result<String> {
        Ok(default.to_string())
    }

    fn secret(&mut self, _prompt: &str, default: &str) -> Result<String> {
        Ok(default.to_string())
    }
}

/// Everything a run needs, after flags, config, and prompts are combined
#[derive(Debug)]
pub struct RunSettings {
    pub target: DatabaseTarget,
    pub options: DumpOptions,
    pub output_dir: PathBuf,
    pub tool: DumpTool,
}

/// Resolve the run settings, asking only for what `config` leaves unset
///
/// `config` is the file profile with command-line overrides already merged
/// in. The password never comes from `config`; it is `password` when given,
/// otherwise prompted for.
///
/// # Errors
///
/// Returns error if a prompt cannot be read, the port is not a number in
/// `1..=65535`, or the database name cannot be used as a directory name.
pub fn resolve_settings(
    config: DumperConfig,
    password: Option<String>,
    prompter: &mut dyn SettingsPrompter,
) -> Result<RunSettings> {
    let host = match config.host {
        Some(host) => host,
        None => prompter.input("Enter database host", DEFAULT_HOST)?,
    };
    let user = match config.user {
        Some(user) => user,
        None => prompter.input("Enter database user", DEFAULT_USER)?,
    };
    let password = match password {
        Some(password) => password,
        None => prompter.secret("Enter database password", DEFAULT_PASSWORD)?,
    };
    let port = match config.port {
        Some(port) => port,
        None => parse_port(&prompter.input("Enter database port", &DEFAULT_PORT.to_string())?)?,
    };
    let database = match config.database {
        Some(database) => database,
        None => prompter.input("Enter database name", DEFAULT_DATABASE)?,
    };

    let target = DatabaseTarget::new(host, port, user, password, database)
        .context("Invalid database target")?;

    let options = match config.options {
        Some(options) => options_from_config(options),
        None => prompt_options(prompter)?,
    };

    let mut tool = DumpTool::default();
    if let Some(dump) = config.tools.dump {
        tool.dump_program = dump;
    }
    if let Some(compress) = config.tools.compress {
        tool.compress_program = compress;
    }

    tracing::debug!("Resolved target {:?} with {:?}", target, options);

    Ok(RunSettings {
        target,
        options,
        output_dir: config.output_dir.unwrap_or_else(|| PathBuf::from(".")),
        tool,
    })
}

fn parse_port(raw: &str) -> Result<u16> {
    let port: u16 = raw
        .trim()
        .parse()
        .with_context(|| format!("Invalid port '{}': expected a number from 1 to 65535", raw))?;
    if port == 0 {
        anyhow::bail!("Invalid port '0': expected a number from 1 to 65535");
    }
    Ok(port)
}

/// Options not mentioned anywhere are off
fn options_from_config(options: OptionsConfig) -> DumpOptions {
    DumpOptions {
        compress: options.compress.unwrap_or(false),
        generate_checksums: options.checksums.unwrap_or(false),
        disable_column_statistics: options.disable_column_statistics.unwrap_or(false),
        skip_lock_tables: options.skip_lock_tables.unwrap_or(false),
        structure_only: options.no_data.unwrap_or(false),
    }
}

fn prompt_options(prompter: &mut dyn SettingsPrompter) -> Result<DumpOptions> {
    let mut options = DumpOptions {
        compress: prompter.confirm("Enable gzip compression for SQL dump files?", false)?,
        generate_checksums: prompter.confirm(
            "Generate checksums file with MD5 checksum of each file dumped?",
            false,
        )?,
        ..DumpOptions::default()
    };

    if prompter.confirm(
        "Do you want to provide extra configuration for mysqldump?",
        false,
    )? {
        options.disable_column_statistics =
            prompter.confirm("Disable column statistics in mysqldump?", false)?;
        options.skip_lock_tables = prompter.confirm("Skip locking tables during dump?", false)?;
        options.structure_only =
            prompter.confirm("Dump only table structure without data?", false)?;
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolsConfig;
    use std::collections::VecDeque;

    /// Replays canned answers and records every question asked
    #[derive(Default)]
    struct Scripted {
        inputs: VecDeque<String>,
        confirms: VecDeque<bool>,
        asked: Vec<String>,
    }

    impl Scripted {
        fn new(inputs: &[&str], confirms: &[bool]) -> Self {
            Self {
                inputs: inputs.iter().map(|s| s.to_string()).collect(),
                confirms: confirms.iter().copied().collect(),
                asked: Vec::new(),
            }
        }
    }

    impl Prompter for Scripted {
        fn confirm(&mut self, prompt: &str, _default: bool) -> Result<bool> {
            self.asked.push(prompt.to_string());
            self.confirms
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("unexpected question: {}", prompt))
        }
    }

    impl SettingsPrompter for Scripted {
        fn input(&mut self, prompt: &str, default: &str) -> Result<String> {
            self.asked.push(prompt.to_string());
            let answer = self
                .inputs
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("unexpected question: {}", prompt))?;
            Ok(if answer.is_empty() {
                default.to_string()
            } else {
                answer
            })
        }

        fn secret(&mut self, prompt: &str, default: &str) -> Result<String> {
            self.input(prompt, default)
        }
    }

    fn full_config() -> DumperConfig {
        DumperConfig {
            host: Some("db.internal".into()),
            port: Some(3307),
            user: Some("backup".into()),
            database: Some("shop".into()),
            output_dir: Some(PathBuf::from("/var/backups")),
            options: Some(OptionsConfig {
                compress: Some(true),
                ..OptionsConfig::default()
            }),
            tools: ToolsConfig::default(),
        }
    }

    #[test]
    fn test_no_input_takes_defaults() {
        let settings =
            resolve_settings(DumperConfig::default(), None, &mut NonInteractive).unwrap();

        assert_eq!(settings.target.host(), DEFAULT_HOST);
        assert_eq!(settings.target.port(), DEFAULT_PORT);
        assert_eq!(settings.target.user(), DEFAULT_USER);
        assert_eq!(settings.target.password(), DEFAULT_PASSWORD);
        assert_eq!(settings.target.database(), DEFAULT_DATABASE);
        assert_eq!(settings.options, DumpOptions::default());
        assert_eq!(settings.output_dir, PathBuf::from("."));
        assert_eq!(settings.tool, DumpTool::default());
    }

    #[test]
    fn test_prompts_in_order_with_extra_options() {
        let mut prompter = Scripted::new(
            &["", "admin", "", "3310", "shop"],
            &[true, false, true, true, false, true],
        );

        let settings = resolve_settings(DumperConfig::default(), None, &mut prompter).unwrap();

        assert_eq!(settings.target.host(), DEFAULT_HOST);
        assert_eq!(settings.target.user(), "admin");
        assert_eq!(settings.target.password(), DEFAULT_PASSWORD);
        assert_eq!(settings.target.port(), 3310);
        assert_eq!(settings.target.database(), "shop");
        assert_eq!(
            settings.options,
            DumpOptions {
                compress: true,
                generate_checksums: false,
                disable_column_statistics: true,
                skip_lock_tables: false,
                structure_only: true,
            }
        );

        assert_eq!(prompter.asked.len(), 11);
        assert_eq!(prompter.asked[0], "Enter database host");
        assert_eq!(prompter.asked[2], "Enter database password");
        assert_eq!(
            prompter.asked[7],
            "Do you want to provide extra configuration for mysqldump?"
        );
    }

    #[test]
    fn test_declining_extra_configuration_skips_sub_questions() {
        let mut prompter = Scripted::new(&["", "", "", "", ""], &[false, true, false]);

        let settings = resolve_settings(DumperConfig::default(), None, &mut prompter).unwrap();

        assert!(settings.options.generate_checksums);
        assert!(!settings.options.skip_lock_tables);
        assert!(prompter.confirms.is_empty());
        assert_eq!(prompter.asked.len(), 8);
    }

    #[test]
    fn test_configured_values_are_not_prompted() {
        let mut prompter = Scripted::new(&[], &[]);

        let settings =
            resolve_settings(full_config(), Some("s3cret".into()), &mut prompter).unwrap();

        assert!(prompter.asked.is_empty());
        assert_eq!(settings.target.host(), "db.internal");
        assert_eq!(settings.target.port(), 3307);
        assert_eq!(settings.target.password(), "s3cret");
        assert_eq!(settings.output_dir, PathBuf::from("/var/backups"));
        assert!(settings.options.compress);
        assert!(!settings.options.generate_checksums);
    }

    #[test]
    fn test_tool_overrides_apply() {
        let mut config = full_config();
        config.tools = ToolsConfig {
            dump: Some("/opt/mysql/bin/mysqldump".into()),
            compress: Some("pigz".into()),
        };

        let settings = resolve_settings(config, Some("pw".into()), &mut NonInteractive).unwrap();

        assert_eq!(settings.tool.dump_program, "/opt/mysql/bin/mysqldump");
        assert_eq!(settings.tool.compress_program, "pigz");
    }

    #[test]
    fn test_invalid_port_answer_fails() {
        let mut prompter = Scripted::new(&["", "", "", "not-a-port"], &[]);

        let err = resolve_settings(DumperConfig::default(), None, &mut prompter).unwrap_err();
        assert!(err.to_string().contains("Invalid port 'not-a-port'"));
    }

    #[test]
    fn test_parse_port_bounds() {
        assert_eq!(parse_port(" 3306 ").unwrap(), 3306);
        assert!(parse_port("0").is_err());
        assert!(parse_port("65536").is_err());
    }

    #[test]
    fn test_unusable_database_name_fails() {
        let mut config = full_config();
        config.database = Some("../etc".into());

        let err = resolve_settings(config, Some("pw".into()), &mut NonInteractive).unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid database name"));
    }
}
