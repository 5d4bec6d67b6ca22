//! Common test utilities

#![allow(dead_code)]

use argtree::args::ScalarKind;
use argtree::runner::{ArgSpec, Command, Commands};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary directory with an argtree.yml file
pub fn create_test_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("argtree.yml");
    fs::write(&config_path, content).unwrap();
    (temp_dir, config_path)
}

/// Create a test config with a subdirectory below it
pub fn create_test_config_in_subdir(content: &str) -> (TempDir, PathBuf, PathBuf) {
    let (temp_dir, config_path) = create_test_config(content);
    let sub_dir = temp_dir.path().join("subdir");
    fs::create_dir(&sub_dir).unwrap();
    (temp_dir, config_path, sub_dir)
}

/// The `test flower` commands used by the completion tests
pub fn flower_commands() -> Commands {
    Commands::new(vec![
        Command::new("test", "flower", "create")
            .arg_specs(vec![
                ArgSpec::new("name"),
                ArgSpec::new("species").enum_values([
                    "rose",
                    "violet",
                    "petunia",
                    "virginia bluebell",
                ]),
                ArgSpec::new("size")
                    .enum_values(["S", "M", "L", "XL", "XXL"])
                    .auto_complete(|_, prefix| {
                        vec![prefix.chars().filter(|c| !c.is_ascii_lowercase()).collect()]
                    }),
                ArgSpec::new("colours.{index}").enum_values(["blue", "red", "pink"]),
                ArgSpec::new("leaves.{key}.size").enum_values(["S", "M", "L", "XL", "XXL"]),
            ])
            .with_wait(),
        Command::new("test", "flower", "delete").arg_specs(vec![
            ArgSpec::new("name")
                .enum_values(["hibiscus", "anemone"])
                .positional(),
            ArgSpec::new("with-leaves").kind(ScalarKind::Bool),
        ]),
    ])
    .unwrap()
}

/// The same commands as YAML
pub const FLOWER_CONFIG: &str = r#"
name: scw
profiles: [p1, p2]
commands:
  - namespace: test
    resource: flower
    verb: create
    short: Create a flower
    wait: true
    args:
      - name: name
        required: true
      - name: species
        enum: [rose, violet, petunia]
      - name: size
        type: size
        default: 1gb
      - name: colours.{index}
        enum: [blue, red, pink]
      - name: leaves.{key}.size
        enum: [S, M, L]
  - namespace: test
    resource: flower
    verb: delete
    args:
      - name: name
        positional: true
        enum: [hibiscus, anemone]
      - name: with-leaves
        type: bool
  - namespace: test
    resource: exec
    raw: true
"#;
