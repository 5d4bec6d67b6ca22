//! Commands declared in YAML: discovery, validation and runs

mod common;

use argtree::config::{find_config_file_from, parse_config, parse_config_file, validate_config};
use argtree::error::{ArgtreeError, CommandError, ConfigError};
use argtree::runner::{complete, Commands, Context};
use common::{create_test_config, create_test_config_in_subdir, FLOWER_CONFIG};
use pretty_assertions::assert_eq;
use serde_json::json;

fn flower_commands() -> Commands {
    let config = parse_config(FLOWER_CONFIG).unwrap();
    validate_config(&config).unwrap();
    config.into_commands().unwrap()
}

fn run(line: &str) -> argtree::Result<Vec<serde_json::Value>> {
    let words: Vec<String> = line.split(' ').map(String::from).collect();
    flower_commands().run(&Context::new(), &words)
}

#[test]
fn test_discover_config_from_subdir() {
    let (_temp_dir, config_path, sub_dir) = create_test_config_in_subdir(FLOWER_CONFIG);
    let found = find_config_file_from(sub_dir).unwrap();
    assert_eq!(found, config_path);

    let config = parse_config_file(&found).unwrap();
    assert_eq!(config.name.as_deref(), Some("scw"));
    assert_eq!(config.commands.len(), 3);
}

#[test]
fn test_run_configured_command() {
    let results =
        run("test flower create name=rose-1 colours.0=blue colours.1=red leaves.top.size=S")
            .unwrap();
    assert_eq!(
        results,
        vec![json!({
            "name": "rose-1",
            "size": 1_000_000_000u64,
            "colours": ["blue", "red"],
            "leaves": {"top": {"size": "S"}},
        })]
    );
}

#[test]
fn test_run_positional_command() {
    let results = run("test flower delete hibiscus anemone with-leaves=true").unwrap();
    assert_eq!(
        results,
        vec![
            json!({"name": "hibiscus", "with-leaves": true}),
            json!({"name": "anemone", "with-leaves": true}),
        ]
    );
}

#[test]
fn test_run_raw_command() {
    let results = run("test exec pro.access_key access_key").unwrap();
    assert_eq!(results, vec![json!(["pro.access_key", "access_key"])]);
}

#[test]
fn test_configured_errors() {
    let err = run("test flower create").unwrap_err();
    assert!(matches!(
        err,
        ArgtreeError::Command(CommandError::MissingRequiredArgument(ref name)) if name == "name"
    ));

    let err = run("test flower create name=a species=tulip").unwrap_err();
    assert!(matches!(
        err,
        ArgtreeError::Command(CommandError::InvalidArgument { .. })
    ));

    let err = run("test flower create name=a petals=5").unwrap_err();
    assert_eq!(err.to_string(), "unknown argument 'petals'");
    assert!(err.hint().unwrap().starts_with("Valid arguments are: name, species"));

    let err = run("test flower create name=a colours.1=red").unwrap_err();
    assert_eq!(
        err.to_string(),
        "missing index in the array: trying to set array at index 1 before index 0"
    );

    let err = run("test flower delete").unwrap_err();
    assert_eq!(
        err.hint().as_deref(),
        Some("Try running: scw test flower delete <name>")
    );

    let err = run("test garden create").unwrap_err();
    assert!(matches!(
        err,
        ArgtreeError::Command(CommandError::UnknownCommand(_))
    ));
}

#[test]
fn test_complete_configured_commands() {
    let commands = flower_commands();
    let ctx = Context::new().with_profiles(vec!["p1".to_string(), "p2".to_string()]);
    let suggestions = complete(&ctx, &commands, &["scw", "test", "flower", "create"], "", &[]);
    assert_eq!(
        suggestions,
        vec!["colours.0=", "leaves.", "name=", "size=", "species="]
    );

    let suggestions = complete(&ctx, &commands, &["scw", "test", "flower", "delete"], "with-leaves=", &[]);
    assert_eq!(suggestions, vec!["with-leaves=false", "with-leaves=true"]);

    let suggestions = complete(&ctx, &commands, &["scw", "--profile"], "", &[]);
    assert_eq!(suggestions, vec!["p1", "p2"]);
}

#[test]
fn test_invalid_config_file() {
    let (_temp_dir, config_path) = create_test_config(
        r#"
commands:
  - namespace: test
    args:
      - name: Bad_Name
"#,
    );
    let config = parse_config_file(&config_path).unwrap();
    let err = validate_config(&config).unwrap_err();
    assert!(matches!(
        err,
        ArgtreeError::Config(ConfigError::InvalidArgName { ref command, .. }) if command == "test"
    ));
}
