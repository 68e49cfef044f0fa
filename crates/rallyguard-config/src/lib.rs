pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable pointing directly at a config file
pub const CONFIG_PATH_ENV: &str = "RALLYGUARD_CONFIG";

const CANDIDATES: [&str; 2] = ["rallyguard.local.yaml", "rallyguard.yaml"];

/// rallyguard settings
///
/// Every field has a default, so an empty or missing config file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// clouds.yaml entry passed as `--os-cloud`
    pub cloud: Option<String>,

    /// Path or name of the openstack CLI
    pub openstack_bin: String,

    /// Directory shared with the metrics exporter and dashboard
    pub results_dir: PathBuf,

    /// Name prefix of scenario-created resources
    pub scenario_prefix: String,

    /// Name prefix of context-created resources
    pub context_prefix: String,

    /// Upper bound for a single cloud API call
    pub call_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cloud: None,
            openstack_bin: "openstack".to_string(),
            results_dir: PathBuf::from("/results"),
            scenario_prefix: "s_rally_".to_string(),
            context_prefix: "c_rally_".to_string(),
            call_timeout_secs: 120,
        }
    }
}

impl Settings {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Read settings from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Apply `RESULTS_DIR`, `OS_CLOUD` and `RALLYGUARD_CALL_TIMEOUT_SECS`
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(dir) = std::env::var("RESULTS_DIR")
            && !dir.is_empty()
        {
            self.results_dir = PathBuf::from(dir);
        }

        if let Ok(cloud) = std::env::var("OS_CLOUD")
            && !cloud.is_empty()
        {
            self.cloud = Some(cloud);
        }

        if let Ok(value) = std::env::var("RALLYGUARD_CALL_TIMEOUT_SECS") {
            self.call_timeout_secs = match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "RALLYGUARD_CALL_TIMEOUT_SECS".to_string(),
                        value,
                    });
                }
            };
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.call_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "call_timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

/// Locate the rallyguard config file
///
/// Search order:
/// 1. `RALLYGUARD_CONFIG` (must exist when set)
/// 2. Current directory: rallyguard.local.yaml, rallyguard.yaml
/// 3. ~/.config/rallyguard/rallyguard.yaml
///
/// Returns `Ok(None)` when no file exists; defaults apply then.
pub fn find_config_file() -> Result<Option<PathBuf>> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(&config_path);
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(ConfigError::FileNotFound(config_path));
    }

    let current_dir = std::env::current_dir()?;
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("rallyguard").join("rallyguard.yaml");
        if global_config.exists() {
            return Ok(Some(global_config));
        }
    }

    Ok(None)
}

/// Load settings from the discovered file (or defaults) plus environment
pub fn load() -> Result<Settings> {
    let mut settings = match find_config_file()? {
        Some(path) => {
            tracing::debug!("Loading config from {}", path.display());
            Settings::from_file(&path)?
        }
        None => {
            tracing::debug!("No config file found, using defaults");
            Settings::default()
        }
    };
    settings.apply_env_overrides()?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    const ENV_KEYS: [&str; 4] = [
        CONFIG_PATH_ENV,
        "RESULTS_DIR",
        "OS_CLOUD",
        "RALLYGUARD_CALL_TIMEOUT_SECS",
    ];

    /// Restores the working directory on drop, also when a test panics
    struct CwdGuard {
        original: PathBuf,
    }

    impl CwdGuard {
        fn enter(dir: &Path) -> Self {
            let original = std::env::current_dir().unwrap();
            std::env::set_current_dir(dir).unwrap();
            Self { original }
        }
    }

    impl Drop for CwdGuard {
        fn drop(&mut self) {
            let _ = std::env::set_current_dir(&self.original);
        }
    }

    /// Run `f` with every rallyguard variable unset and cwd at `dir`
    fn in_clean_env<F: FnOnce()>(dir: &Path, f: F) {
        let _cwd = CwdGuard::enter(dir);
        temp_env::with_vars_unset(ENV_KEYS, f);
    }

    #[test]
    #[serial]
    fn test_cwd_restored_after_panic() {
        let original = std::env::current_dir().unwrap();
        let temp_dir = tempfile::tempdir().unwrap();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            in_clean_env(temp_dir.path(), || panic!("config assertion failed"));
        }));

        assert!(result.is_err());
        assert_eq!(std::env::current_dir().unwrap(), original);
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.results_dir, PathBuf::from("/results"));
        assert_eq!(settings.scenario_prefix, "s_rally_");
        assert_eq!(settings.context_prefix, "c_rally_");
        assert_eq!(settings.call_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("rallyguard.yaml");
        fs::write(&path, "cloud: devstack-admin\ncall_timeout_secs: 30\n").unwrap();

        let settings = Settings::from_file(&path).unwrap();

        assert_eq!(settings.cloud.as_deref(), Some("devstack-admin"));
        assert_eq!(settings.call_timeout_secs, 30);
        assert_eq!(settings.scenario_prefix, "s_rally_");
    }

    #[test]
    fn test_empty_file_is_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("rallyguard.yaml");
        fs::write(&path, "\n").unwrap();

        assert_eq!(Settings::from_file(&path).unwrap(), Settings::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("rallyguard.yaml");
        fs::write(&path, "scenario_prefx: s_\n").unwrap();

        assert!(matches!(
            Settings::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    #[serial]
    fn test_find_config_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("rallyguard.yaml"), "cloud: a\n").unwrap();

        in_clean_env(temp_dir.path(), || {
            let found = find_config_file().unwrap().unwrap();
            assert!(found.ends_with("rallyguard.yaml"));
        });
    }

    #[test]
    #[serial]
    fn test_local_file_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("rallyguard.yaml"), "cloud: shared\n").unwrap();
        fs::write(temp_dir.path().join("rallyguard.local.yaml"), "cloud: mine\n").unwrap();

        in_clean_env(temp_dir.path(), || {
            let settings = load().unwrap();
            assert_eq!(settings.cloud.as_deref(), Some("mine"));
        });
    }

    #[test]
    #[serial]
    fn test_env_path_must_exist() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("missing.yaml");

        in_clean_env(temp_dir.path(), || {
            temp_env::with_var(CONFIG_PATH_ENV, Some(missing.as_os_str()), || {
                assert!(matches!(
                    find_config_file(),
                    Err(ConfigError::FileNotFound(_))
                ));
            });
        });
    }

    #[test]
    #[serial]
    fn test_env_path_wins() {
        let temp_dir = tempfile::tempdir().unwrap();
        let custom = temp_dir.path().join("custom.yaml");
        fs::write(&custom, "cloud: custom\n").unwrap();
        fs::write(temp_dir.path().join("rallyguard.yaml"), "cloud: cwd\n").unwrap();

        in_clean_env(temp_dir.path(), || {
            temp_env::with_var(CONFIG_PATH_ENV, Some(custom.as_os_str()), || {
                assert_eq!(load().unwrap().cloud.as_deref(), Some("custom"));
            });
        });
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(
            temp_dir.path().join("rallyguard.yaml"),
            "results_dir: /srv/results\ncloud: file\n",
        )
        .unwrap();

        in_clean_env(temp_dir.path(), || {
            temp_env::with_vars(
                [
                    ("RESULTS_DIR", Some("/tmp/results")),
                    ("OS_CLOUD", Some("env")),
                    ("RALLYGUARD_CALL_TIMEOUT_SECS", Some("15")),
                ],
                || {
                    let settings = load().unwrap();
                    assert_eq!(settings.results_dir, PathBuf::from("/tmp/results"));
                    assert_eq!(settings.cloud.as_deref(), Some("env"));
                    assert_eq!(settings.call_timeout_secs, 15);
                },
            );
        });
    }

    #[test]
    #[serial]
    fn test_invalid_timeout_env() {
        let temp_dir = tempfile::tempdir().unwrap();

        in_clean_env(temp_dir.path(), || {
            temp_env::with_var("RALLYGUARD_CALL_TIMEOUT_SECS", Some("0"), || {
                assert!(matches!(load(), Err(ConfigError::InvalidValue { .. })));
            });
            temp_env::with_var("RALLYGUARD_CALL_TIMEOUT_SECS", Some("soon"), || {
                assert!(matches!(load(), Err(ConfigError::InvalidValue { .. })));
            });
        });
    }

    #[test]
    #[serial]
    fn test_zero_timeout_in_file_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(
            temp_dir.path().join("rallyguard.yaml"),
            "call_timeout_secs: 0\n",
        )
        .unwrap();

        in_clean_env(temp_dir.path(), || {
            assert!(matches!(load(), Err(ConfigError::InvalidValue { .. })));
        });
    }
}
