//! Configuration validation
//!
//! Commands declared in YAML are checked before the registry is built, so
//! a broken file is reported with the command it comes from.

use crate::args::is_valid_schema;
use crate::config::types::{CommandConfig, Config};
use crate::error::{ConfigError, Result};
use std::collections::HashSet;

/// Validate a complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    let mut paths = HashSet::new();
    for command in &config.commands {
        validate_command(command)?;
        let path = command.path();
        if !paths.insert(path.clone()) {
            return Err(ConfigError::Invalid(format!(
                "command '{}' is declared more than once",
                path
            ))
            .into());
        }
    }

    if let Some(active) = &config.active_profile {
        if !config.profiles.is_empty() && !config.profiles.contains(active) {
            return Err(ConfigError::Invalid(format!(
                "active profile '{}' is not one of the configured profiles",
                active
            ))
            .into());
        }
    }
    Ok(())
}

/// Validate a single command and its arguments
pub fn validate_command(command: &CommandConfig) -> Result<()> {
    if command.path().is_empty() {
        return Err(ConfigError::Invalid("command without namespace".to_string()).into());
    }
    for arg in &command.args {
        if !is_valid_schema(&arg.name) {
            return Err(ConfigError::InvalidArgName {
                command: command.path(),
                name: arg.name.clone(),
            }
            .into());
        }
    }
    if command.raw {
        return Ok(());
    }

    let specs = command.arg_specs();
    specs.check()?;
    specs.schema()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::error::{ArgtreeError, RegistryError};

    fn validate(yaml: &str) -> Result<()> {
        validate_config(&parse_config(yaml).unwrap())
    }

    #[test]
    fn test_validate_valid_config() {
        let result = validate(
            r#"
profiles: [p1, p2]
active-profile: p2
commands:
  - namespace: test
    resource: flower
    verb: create
    args:
      - name: name
      - name: colours.{index}
      - name: leaves.{key}.size
"#,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_invalid_arg_name() {
        let result = validate(
            r#"
commands:
  - namespace: test
    args:
      - name: name_id
"#,
        );
        assert!(matches!(
            result,
            Err(ArgtreeError::Config(ConfigError::InvalidArgName { ref name, .. })) if name == "name_id"
        ));
    }

    #[test]
    fn test_validate_duplicate_command() {
        let result = validate(
            r#"
commands:
  - namespace: test
    verb: run
  - namespace: test
    verb: run
"#,
        );
        assert!(matches!(result, Err(ArgtreeError::Config(ConfigError::Invalid(_)))));
    }

    #[test]
    fn test_validate_duplicate_arg() {
        let result = validate(
            r#"
commands:
  - namespace: test
    args:
      - name: name
      - name: name
"#,
        );
        assert!(matches!(
            result,
            Err(ArgtreeError::Registry(RegistryError::DuplicateArgSpec(_)))
        ));
    }

    #[test]
    fn test_validate_multiple_positional() {
        let result = validate(
            r#"
commands:
  - namespace: test
    args:
      - name: first
        positional: true
      - name: second
        positional: true
"#,
        );
        assert!(matches!(
            result,
            Err(ArgtreeError::Registry(RegistryError::MultiplePositional { .. }))
        ));
    }

    #[test]
    fn test_validate_conflicting_args() {
        let result = validate(
            r#"
commands:
  - namespace: test
    args:
      - name: volume
      - name: volume.size
"#,
        );
        assert!(matches!(
            result,
            Err(ArgtreeError::Registry(RegistryError::ConflictingArgSpec { .. }))
        ));
    }

    #[test]
    fn test_validate_unknown_active_profile() {
        let result = validate("profiles: [p1]\nactive-profile: p3\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_raw_command_skips_schema() {
        let result = validate(
            r#"
commands:
  - namespace: exec
    raw: true
"#,
        );
        assert!(result.is_ok());
    }
}
