//! Tests for the 'validate' command

use dumpy::config::{load_config, ConfigError};
use test_utils::{ConfigBuilder, TestContext};

#[test]
fn test_validate_valid_config() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::minimal()
            .add_database("shop", "mysql")
            .with_copy_directory("archive")
            .with_rotation("rotate", 4)
            .with_postprocessing("db1", "Bzip, TimestampRename, FileSystemCopy")
            .with_postprocessing("shop", "PrependDatabaseName, RotateFiles"),
    );

    assert!(ctx.manager().validate().is_empty());
}

#[test]
fn test_validate_without_databases() {
    let ctx = TestContext::from_builder(ConfigBuilder::new());

    let issues = ctx.manager().validate();

    assert_eq!(issues.len(), 1);
    assert!(issues[0].message.contains("No [database.<name>] sections"));
}

#[test]
fn test_validate_missing_type() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal().add_database("legacy", ""));

    let issues = ctx.manager().validate();

    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].database, "legacy");
    assert!(issues[0].message.contains("Unsupported backup type"));
}

#[test]
fn test_validate_unknown_stage() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::minimal().with_postprocessing("db1", "Bzip, Encrypt"),
    );

    let issues = ctx.manager().validate();

    assert_eq!(issues.len(), 1);
    assert!(issues[0].message.contains("Encrypt"));
}

#[test]
fn test_validate_stage_options() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::minimal()
            .with_postprocessing("db1", "FileSystemCopy, S3Copy")
            .set("S3Copy", "access_key", "AK"),
    );

    let issues = ctx.manager().validate();
    let messages: Vec<_> = issues.iter().map(|i| i.message.as_str()).collect();

    assert_eq!(issues.len(), 2, "{:?}", messages);
    assert!(messages[0].contains("FileSystemCopy"));
    assert!(messages[1].contains("secret_key"));
}

#[test]
fn test_validate_reports_invalid_values() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::minimal()
            .with_rotation("rotate", 3)
            .set("RotateFiles", "number", "three")
            .with_postprocessing("db1", "RotateFiles"),
    );

    let issues = ctx.manager().validate();

    assert_eq!(issues.len(), 1);
    assert!(issues[0].message.contains("number"));
}

#[test]
fn test_load_written_config() {
    let (path, _dir) = ConfigBuilder::minimal()
        .with_postprocessing("db1", "Bzip")
        .write();

    let config = load_config(&path).unwrap();

    assert_eq!(dumpy::config::database_names(&config), vec!["db1"]);
}

#[test]
fn test_load_malformed_config() {
    let ctx = TestContext::with_minimal_config();
    let path = ctx.create_file("broken.toml", "[database.db1\ntype = ");

    assert!(matches!(load_config(&path), Err(ConfigError::ParseError(_))));
}
