//! Configuration file parsing and discovery

use crate::config::types::Config;
use crate::error::{ArgtreeError, ConfigError, ConfigResult};
use directories::ProjectDirs;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file names to search for
const CONFIG_FILE_NAMES: &[&str] = &["argtree.yml", "argtree.yaml"];

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "ARGTREE_CONFIG";

/// Load variables from a `.env` file in the current directory or a parent.
///
/// Returns the file loaded, if any. Variables already set are kept.
pub fn load_env_file() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => {
            log::debug!("loaded environment from {}", path.display());
            Some(path)
        }
        Err(err) if err.not_found() => None,
        Err(err) => {
            log::warn!("ignoring .env file: {}", err);
            None
        }
    }
}

/// Find the configuration file: `ARGTREE_CONFIG`, then the current and
/// parent directories, then the user configuration directory
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_ENV) {
        let path = PathBuf::from(path);
        log::debug!("using {} from {}", path.display(), CONFIG_ENV);
        return if path.is_file() {
            Ok(path)
        } else {
            Err(ConfigError::NotFound(path.display().to_string()))
        };
    }

    let current_dir = env::current_dir().map_err(|e| {
        ConfigError::Invalid(format!("Failed to get current directory: {}", e))
    })?;
    match find_config_file_from(current_dir) {
        Ok(path) => Ok(path),
        Err(ConfigError::NotFound(searched)) => match user_config_file() {
            Some(path) => Ok(path),
            None => Err(ConfigError::NotFound(searched)),
        },
        Err(err) => Err(err),
    }
}

/// Find the configuration file starting from a specific directory
pub fn find_config_file_from(start_dir: PathBuf) -> ConfigResult<PathBuf> {
    let mut current_dir = start_dir;
    let mut searched_paths = Vec::new();

    loop {
        for file_name in CONFIG_FILE_NAMES {
            let config_path = current_dir.join(file_name);
            log::trace!("looking for {}", config_path.display());

            if config_path.is_file() {
                log::debug!("found config file {}", config_path.display());
                return Ok(config_path);
            }
            searched_paths.push(config_path.display().to_string());
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => return Err(ConfigError::NotFound(searched_paths.join(", "))),
        }
    }
}

/// Configuration file in the user configuration directory, if present
pub fn user_config_file() -> Option<PathBuf> {
    let dirs = ProjectDirs::from("", "", "argtree")?;
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dirs.config_dir().join(name))
        .find(|path| path.is_file())
        .inspect(|path| log::debug!("found user config file {}", path.display()))
}

/// Parse a configuration file from a path
pub fn parse_config_file(path: &Path) -> Result<Config, ArgtreeError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        ConfigError::Invalid(format!("Failed to read {}: {}", path.display(), e))
    })?;

    parse_config(&contents)
}

/// Parse configuration from a string
pub fn parse_config(yaml: &str) -> Result<Config, ArgtreeError> {
    Ok(serde_yaml::from_str(yaml)?)
}

/// Parse configuration with automatic file discovery
pub fn parse_config_auto() -> Result<(Config, PathBuf), ArgtreeError> {
    let config_path = find_config_file()?;
    let config = parse_config_file(&config_path)?;
    Ok((config, config_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const FLOWER: &str = r#"
commands:
  - namespace: test
    resource: flower
    verb: create
"#;

    #[test]
    fn test_parse_simple_config() {
        let config = parse_config(FLOWER).unwrap();
        assert_eq!(config.commands.len(), 1);
        assert_eq!(config.commands[0].path(), "test flower create");
        assert!(config.name.is_none());
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let result = parse_config("commands: [namespace: {");
        assert!(matches!(result, Err(ArgtreeError::Yaml(_))));
    }

    #[test]
    fn test_find_config_in_current_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("argtree.yml");
        fs::write(&config_path, FLOWER).unwrap();

        let found = find_config_file_from(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(found, config_path);
    }

    #[test]
    fn test_find_yaml_extension() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("argtree.yaml");
        fs::write(&config_path, FLOWER).unwrap();

        let found = find_config_file_from(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(found, config_path);
    }

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("argtree.yml");
        let sub_dir = temp_dir.path().join("subdir");

        fs::create_dir(&sub_dir).unwrap();
        fs::write(&config_path, FLOWER).unwrap();

        let found = find_config_file_from(sub_dir).unwrap();
        assert_eq!(found, config_path);
    }

    #[test]
    fn test_config_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let result = find_config_file_from(temp_dir.path().to_path_buf());
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_parse_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("argtree.yml");
        fs::write(&config_path, "name: scw\nprofiles: [p1]\n").unwrap();

        let config = parse_config_file(&config_path).unwrap();
        assert_eq!(config.name.as_deref(), Some("scw"));
        assert_eq!(config.profiles, vec!["p1"]);
    }
}
