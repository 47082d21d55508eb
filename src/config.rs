// ABOUTME: Parses optional TOML profile files describing a dump run
// ABOUTME: Merges file values with command-line overrides; passwords are never accepted

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Values a run can take from a profile file or the command line
///
/// Every field is optional; anything left unset is prompted for or
/// defaulted later. There is deliberately no password field, and unknown
/// keys are rejected, so a profile containing `password = ...` fails to load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DumperConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub database: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub options: Option<OptionsConfig>,
    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionsConfig {
    pub compress: Option<bool>,
    pub checksums: Option<bool>,
    pub disable_column_statistics: Option<bool>,
    pub skip_lock_tables: Option<bool>,
    pub no_data: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsConfig {
    pub dump: Option<String>,
    pub compress: Option<String>,
}

impl DumperConfig {
    /// Layer `overrides` on top of `self`; set fields in `overrides` win
    pub fn merge(self, overrides: DumperConfig) -> DumperConfig {
        DumperConfig {
            host: overrides.host.or(self.host),
            port: overrides.port.or(self.port),
            user: overrides.user.or(self.user),
            database: overrides.database.or(self.database),
            output_dir: overrides.output_dir.or(self.output_dir),
            options: match (self.options, overrides.options) {
                (Some(base), Some(top)) => Some(base.merge(top)),
                (base, top) => top.or(base),
            },
            tools: ToolsConfig {
                dump: overrides.tools.dump.or(self.tools.dump),
                compress: overrides.tools.compress.or(self.tools.compress),
            },
        }
    }
}

impl OptionsConfig {
    pub fn merge(self, overrides: OptionsConfig) -> OptionsConfig {
        OptionsConfig {
            compress: overrides.compress.or(self.compress),
            checksums: overrides.checksums.or(self.checksums),
            disable_column_statistics: overrides
                .disable_column_statistics
                .or(self.disable_column_statistics),
            skip_lock_tables: overrides.skip_lock_tables.or(self.skip_lock_tables),
            no_data: overrides.no_data.or(self.no_data),
        }
    }
}

pub fn load_config_file(path: &Path) -> Result<DumperConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let parsed: DumperConfig = toml::from_str(&raw)
        .with_context(|| format!("Failed to parse TOML config at {}", path.display()))?;

    tracing::debug!("Loaded config file {}", path.display());

    Ok(parsed)
}
