use crate::domain::{
    config::CtrlComConfig,
    error::{CtrlComError, CtrlComResult},
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const CONFIG_DIR: &str = "ctrlcom";
const CONFIG_FILE: &str = "config.toml";
const PROJECT_CONFIG_DIR: &str = ".ctrlcom";

/// Configuration manager
///
/// Resolves a user-global config file plus an optional project-local one;
/// project controller entries are appended to the global set.
pub struct ConfigManager {
    global_config_path: PathBuf,
    project_config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create a manager resolving the standard locations
    pub fn new() -> CtrlComResult<Self> {
        let global_config_path = Self::get_global_config_path()?;
        let project_config_path = Self::find_project_config_path();

        Ok(Self {
            global_config_path,
            project_config_path,
        })
    }

    /// Create a manager over explicit paths
    pub fn with_paths(global_config_path: PathBuf, project_config_path: Option<PathBuf>) -> Self {
        Self {
            global_config_path,
            project_config_path,
        }
    }

    /// Load configuration, merging project controllers over the global set
    pub fn load_config(&self) -> CtrlComResult<CtrlComConfig> {
        let mut config = CtrlComConfig::default();

        if self.global_config_path.exists() {
            let global_config = Self::load_config_from_path(&self.global_config_path)?;
            config = global_config;
        }

        if let Some(project_path) = &self.project_config_path {
            if project_path.exists() {
                let project_config = Self::load_config_from_path(project_path)?;
                config.controllers.extend(project_config.controllers);
                debug!("Merged project configuration from {:?}", project_path);
            }
        }

        Ok(config)
    }

    /// Save configuration to the global location
    pub fn save_config(&self, config: &CtrlComConfig) -> CtrlComResult<()> {
        if let Some(parent) = self.global_config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| CtrlComError::Config {
                message: format!("Failed to create config directory: {}", e),
            })?;
        }

        Self::save_config_to_path(&self.global_config_path, config)
    }

    fn load_config_from_path(path: &Path) -> CtrlComResult<CtrlComConfig> {
        let content = fs::read_to_string(path).map_err(|e| CtrlComError::Config {
            message: format!("Failed to read config file {:?}: {}", path, e),
        })?;

        toml::from_str(&content).map_err(|e| CtrlComError::Config {
            message: format!("Failed to parse config file {:?}: {}", path, e),
        })
    }

    fn save_config_to_path(path: &Path, config: &CtrlComConfig) -> CtrlComResult<()> {
        let content = toml::to_string_pretty(config).map_err(|e| CtrlComError::Config {
            message: format!("Failed to serialize configuration: {}", e),
        })?;

        fs::write(path, content).map_err(|e| CtrlComError::Config {
            message: format!("Failed to write config file {:?}: {}", path, e),
        })
    }

    fn get_global_config_path() -> CtrlComResult<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| CtrlComError::Config {
            message: "Could not determine user configuration directory".to_string(),
        })?;
        Ok(config_dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    fn find_project_config_path() -> Option<PathBuf> {
        let candidate = Path::new(PROJECT_CONFIG_DIR).join(CONFIG_FILE);
        candidate.exists().then_some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::{ControllerConfig, LinkSettings, TransmissionMode};

    fn sample_config() -> CtrlComConfig {
        CtrlComConfig {
            controllers: vec![ControllerConfig {
                id: "bench".to_string(),
                remote_address: "192.168.100.1".to_string(),
                link: LinkSettings::new("COM3"),
                transmission: TransmissionMode::Text,
            }],
            ..CtrlComConfig::default()
        }
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let manager = ConfigManager::with_paths(path, None);

        manager.save_config(&sample_config()).unwrap();
        let loaded = manager.load_config().unwrap();

        assert_eq!(loaded.controllers.len(), 1);
        assert_eq!(loaded.controllers[0].id, "bench");
        assert_eq!(loaded.controllers[0].link.port_name, "COM3");
    }

    #[test]
    fn test_missing_files_yield_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_paths(dir.path().join("absent.toml"), None);

        let config = manager.load_config().unwrap();

        assert!(config.controllers.is_empty());
        assert_eq!(config.global.log_level, "info");
    }

    #[test]
    fn test_project_controllers_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        let global_path = dir.path().join("global.toml");
        let project_path = dir.path().join("project.toml");

        ConfigManager::with_paths(global_path.clone(), None)
            .save_config(&sample_config())
            .unwrap();

        let mut project = CtrlComConfig::default();
        project.controllers.push(ControllerConfig {
            id: "field_unit".to_string(),
            remote_address: "192.168.100.7".to_string(),
            link: LinkSettings::new("COM9"),
            transmission: TransmissionMode::Hex,
        });
        ConfigManager::save_config_to_path(&project_path, &project).unwrap();

        let manager = ConfigManager::with_paths(global_path, Some(project_path));
        let loaded = manager.load_config().unwrap();

        assert_eq!(loaded.controllers.len(), 2);
        assert_eq!(loaded.controllers[1].id, "field_unit");
    }

    #[test]
    fn test_malformed_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "controllers = 5").unwrap();

        let manager = ConfigManager::with_paths(path, None);
        let result = manager.load_config();

        assert!(matches!(result, Err(CtrlComError::Config { .. })));
    }
}
