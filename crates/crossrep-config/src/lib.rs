//! Configuration discovery and loading
//!
//! The topology is described by an `appsettings.json` document. It is found
//! with [`find_config_file`], read with [`load`] and checked with
//! [`validate`] before anything touches the control plane.

pub mod error;
pub mod validate;

pub use error::*;
pub use validate::validate;

use crossrep_core::ProjectConfig;
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file directly
pub const CONFIG_PATH_ENV: &str = "CROSSREP_CONFIG_PATH";

/// Subscription used when the file leaves `general.subscriptionId` empty
pub const SUBSCRIPTION_ENV: &str = "AZURE_SUBSCRIPTION_ID";

const CANDIDATES: [&str; 2] = ["appsettings.local.json", "appsettings.json"];

/// Locate the configuration file
///
/// Search order:
/// 1. `CROSSREP_CONFIG_PATH`
/// 2. current directory: appsettings.local.json, appsettings.json
/// 3. `./.crossrep/`, same order
/// 4. `<config dir>/crossrep/appsettings.json`
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!(
            "{} points at {}, which does not exist",
            CONFIG_PATH_ENV,
            path.display()
        );
    }

    let current_dir = std::env::current_dir()?;

    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let local_dir = current_dir.join(".crossrep");
    if local_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = local_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("crossrep").join("appsettings.json");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// Read and decode a configuration file
///
/// An empty `general.subscriptionId` is filled from `AZURE_SUBSCRIPTION_ID`.
pub fn load(path: &Path) -> Result<ProjectConfig> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut project = parse(&content).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    if project.general.subscription_id.trim().is_empty() {
        if let Ok(subscription) = std::env::var(SUBSCRIPTION_ENV) {
            project.general.subscription_id = subscription;
        }
    }

    tracing::debug!(
        "Loaded {} account(s) from {}",
        project.accounts.len(),
        path.display()
    );
    Ok(project)
}

/// Load from an explicit path, or discover the file when none is given
pub fn load_project(path: Option<&Path>) -> Result<(PathBuf, ProjectConfig)> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };
    let project = load(&path)?;
    Ok((path, project))
}

pub fn parse(content: &str) -> std::result::Result<ProjectConfig, serde_json::Error> {
    serde_json::from_str(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    const MINIMAL: &str = r#"{ "general": { "subscriptionId": "sub" }, "accounts": [] }"#;

    /// Run `f` inside `dir` with `CROSSREP_CONFIG_PATH` unset
    fn in_dir<F: FnOnce()>(dir: &Path, f: F) {
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir).unwrap();
        temp_env::with_var_unset(CONFIG_PATH_ENV, f);
        std::env::set_current_dir(original_dir).unwrap();
    }

    #[test]
    #[serial]
    fn test_find_config_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("appsettings.json"), MINIMAL).unwrap();

        in_dir(temp_dir.path(), || {
            let path = find_config_file().unwrap();
            assert!(path.ends_with("appsettings.json"));
        });
    }

    #[test]
    #[serial]
    fn test_local_file_takes_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("appsettings.json"), MINIMAL).unwrap();
        fs::write(temp_dir.path().join("appsettings.local.json"), MINIMAL).unwrap();

        in_dir(temp_dir.path(), || {
            let path = find_config_file().unwrap();
            assert!(path.ends_with("appsettings.local.json"));
        });
    }

    #[test]
    #[serial]
    fn test_find_config_in_local_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let local_dir = temp_dir.path().join(".crossrep");
        fs::create_dir(&local_dir).unwrap();
        fs::write(local_dir.join("appsettings.json"), MINIMAL).unwrap();

        in_dir(temp_dir.path(), || {
            let path = find_config_file().unwrap();
            assert!(path.ends_with(".crossrep/appsettings.json"));
        });
    }

    #[test]
    #[serial]
    fn test_env_var_wins() {
        let temp_dir = tempfile::tempdir().unwrap();
        let custom = temp_dir.path().join("custom.json");
        fs::write(&custom, MINIMAL).unwrap();
        fs::write(temp_dir.path().join("appsettings.json"), MINIMAL).unwrap();

        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(temp_dir.path()).unwrap();
        temp_env::with_var(CONFIG_PATH_ENV, Some(custom.as_os_str()), || {
            assert_eq!(find_config_file().unwrap(), custom);
        });
        std::env::set_current_dir(original_dir).unwrap();
    }

    #[test]
    #[serial]
    fn test_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();

        in_dir(temp_dir.path(), || {
            assert!(matches!(
                find_config_file(),
                Err(ConfigError::ConfigFileNotFound)
            ));
        });
    }

    #[test]
    #[serial]
    fn test_load_fills_subscription_from_env() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("appsettings.json");
        fs::write(&path, r#"{ "general": { "shouldCleanUp": "false" } }"#).unwrap();

        temp_env::with_var(SUBSCRIPTION_ENV, Some("from-env"), || {
            let project = load(&path).unwrap();
            assert_eq!(project.general.subscription_id, "from-env");
            assert!(!project.general.should_cleanup);
        });
    }

    #[test]
    #[serial]
    fn test_file_subscription_is_kept() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("appsettings.json");
        fs::write(&path, MINIMAL).unwrap();

        temp_env::with_var(SUBSCRIPTION_ENV, Some("from-env"), || {
            assert_eq!(load(&path).unwrap().general.subscription_id, "sub");
        });
    }

    #[test]
    fn test_load_reports_path_on_bad_json() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("appsettings.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
        assert!(err.to_string().contains("appsettings.json"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load(Path::new("/nonexistent/appsettings.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
