// ABOUTME: Utility functions for validation and operator-facing formatting
// ABOUTME: Provides required tool checks, file-name safety checks, and duration rendering

use crate::error::DumpError;
use anyhow::{bail, Result};
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;
use which::which;

/// Mode of persisted lists and dump artifacts
#[cfg(unix)]
pub const OUTPUT_FILE_MODE: u32 = 0o644;

/// Check that the external programs a run depends on are available
///
/// Every entry in `tools` is looked up on `PATH` (or used as-is when it is a
/// path). All missing tools are reported at once.
///
/// # Errors
///
/// Returns an error with installation instructions if any tool is missing.
///
/// # Examples
///
/// ```no_run
/// # use inline_dumper::utils::check_required_tools;
/// # use anyhow::Result;
/// # fn example() -> Result<()> {
/// check_required_tools(&["mysqldump", "gzip"])?;
/// # Ok(())
/// # }
/// ```
pub fn check_required_tools(tools: &[&str]) -> Result<()> {
    let mut missing = Vec::new();

    for tool in tools {
        if which(tool).is_err() {
            missing.push(*tool);
        }
    }

    if !missing.is_empty() {
        bail!(
            "Missing required tools: {}\n\
             \n\
             Please install the MySQL client tools and gzip:\n\
             - Ubuntu/Debian: sudo apt-get install default-mysql-client gzip\n\
             - macOS: brew install mysql-client\n\
             - RHEL/CentOS: sudo yum install mysql gzip",
            missing.join(", ")
        );
    }

    Ok(())
}

/// Validate that a database or table name can be used as a single file name
///
/// Names end up as path components (`<db>/<table>.sql`, `<db>.list`), so
/// anything that would escape the output directory or produce an unusable
/// path is rejected. MySQL allows far more characters than a strict
/// identifier check would, so only path-significant input is refused.
///
/// # Errors
///
/// Returns [`DumpError::InvalidName`] if the name:
/// - Is empty or whitespace-only
/// - Is `.` or `..`
/// - Contains `/`, `\` or a control character
/// - Starts with `-`, which the dump tool would read as an option
///
/// # Examples
///
/// ```
/// # use inline_dumper::utils::validate_object_name;
/// assert!(validate_object_name("table", "order_items").is_ok());
/// assert!(validate_object_name("table", "order-items 2024").is_ok());
/// assert!(validate_object_name("table", "../etc/passwd").is_err());
/// assert!(validate_object_name("database", "").is_err());
/// ```
pub fn validate_object_name(kind: &'static str, name: &str) -> Result<(), DumpError> {
    let invalid = |reason| DumpError::InvalidName {
        kind,
        name: name.to_string(),
        reason,
    };

    if name.trim().is_empty() {
        return Err(invalid("name cannot be empty"));
    }

    if name == "." || name == ".." {
        return Err(invalid("name cannot be a relative directory reference"));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(invalid("name cannot contain path separators"));
    }

    if name.chars().any(|c| c.is_control()) {
        return Err(invalid("name cannot contain control characters"));
    }

    if name.starts_with('-') {
        return Err(invalid("name cannot start with '-'"));
    }

    Ok(())
}

/// Create a temp file in `dir` to be persisted over a run output
///
/// Outputs are readable by group and others (`0644`) like any freshly
/// created file, rather than the owner-only mode temp files start with.
pub fn output_temp_file(dir: &Path) -> Result<NamedTempFile, DumpError> {
    let tmp =
        NamedTempFile::new_in(dir).map_err(|e| DumpError::io("create temp file in", dir, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(OUTPUT_FILE_MODE))
            .map_err(|e| DumpError::io("set permissions on", tmp.path(), e))?;
    }

    Ok(tmp)
}

/// Format an elapsed duration for the end-of-run report
///
/// # Examples
///
/// ```
/// # use std::time::Duration;
/// # use inline_dumper::utils::format_duration;
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_secs(125)), "2m 5.00s");
/// assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5.00s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    // Round to centiseconds first so 59.999s carries into the minute
    let centis = (duration.as_millis() + 5) / 10;
    let seconds = format!("{}.{:02}s", (centis % 6_000) / 100, centis % 100);

    if centis < 6_000 {
        seconds
    } else if centis < 360_000 {
        format!("{}m {}", centis / 6_000, seconds)
    } else {
        format!("{}h {}m {}", centis / 360_000, (centis % 360_000) / 6_000, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_required_tools() {
        // Passes where a shell is installed, which is every supported platform
        #[cfg(unix)]
        assert!(check_required_tools(&["sh"]).is_ok());

        let result = check_required_tools(&["definitely-not-a-real-dump-tool"]);
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("Missing required tools"));
        assert!(err_msg.contains("definitely-not-a-real-dump-tool"));
    }

    #[test]
    fn test_validate_object_name_valid() {
        assert!(validate_object_name("table", "users").is_ok());
        assert!(validate_object_name("table", "UserData").is_ok());
        assert!(validate_object_name("table", "order-items").is_ok());
        assert!(validate_object_name("table", "with space").is_ok());
        assert!(validate_object_name("table", "a.b").is_ok());
        assert!(validate_object_name("database", "shop_2024").is_ok());
    }

    #[test]
    fn test_validate_object_name_invalid() {
        let invalid = vec!["", "   ", ".", "..", "../etc", "a/b", "a\\b", "a\nb", "a\x00b"];

        for name in invalid {
            let result = validate_object_name("table", name);
            assert!(result.is_err(), "Name should be rejected: {:?}", name);
        }
    }

    #[test]
    fn test_validate_object_name_reports_kind() {
        let err = validate_object_name("database", "a/b").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid database name 'a/b': name cannot contain path separators"
        );
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(0)), "0.00s");
        assert_eq!(format_duration(Duration::from_millis(59_990)), "59.99s");
        assert_eq!(format_duration(Duration::from_secs(60)), "1m 0.00s");
        assert_eq!(format_duration(Duration::from_millis(61_250)), "1m 1.25s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h 0m 0.00s");
        assert_eq!(format_duration(Duration::from_secs(7322)), "2h 2m 2.00s");
    }

    #[test]
    fn test_format_duration_rounding_carries_into_next_unit() {
        assert_eq!(format_duration(Duration::from_millis(59_999)), "1m 0.00s");
        assert_eq!(format_duration(Duration::from_millis(119_999)), "2m 0.00s");
        assert_eq!(format_duration(Duration::from_millis(3_599_996)), "1h 0m 0.00s");
        assert_eq!(format_duration(Duration::from_millis(1_004)), "1.00s");
        assert_eq!(format_duration(Duration::from_millis(1_005)), "1.01s");
    }

    #[test]
    fn test_validate_object_name_rejects_option_lookalikes() {
        for name in ["-archive", "--result-file=x", "-"] {
            let err = validate_object_name("table", name).unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("Invalid table name '{}': name cannot start with '-'", name)
            );
        }
        assert!(validate_object_name("table", "archive-2024").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_output_temp_file_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let tmp = output_temp_file(dir.path()).unwrap();
        let mode = tmp.as_file().metadata().unwrap().permissions().mode();

        assert_eq!(mode & 0o777, OUTPUT_FILE_MODE);
    }
}
