//! Tests for the 'run' command
//!
//! The run command dumps one or all configured databases and runs each dump
//! through its post-processing stages.

use dumpy::database::BackupError;
use test_utils::{fixtures, ConfigBuilder, DatabaseEntry, ResultAssertions, TestContext};

#[test]
fn test_run_without_postprocessing() {
    let ctx = TestContext::with_minimal_config();

    let path = ctx.manager().dump_database("db1").assert_ok();

    assert!(path.starts_with(ctx.path("work")));
    assert!(path.file_name().unwrap().to_string_lossy().starts_with("dumpy-"));
    let dump = std::fs::read_to_string(&path).unwrap();
    assert!(dump.starts_with("-- pg_dump db1"));
    assert!(dump.contains("CREATE TABLE accounts"));
}

#[test]
fn test_run_passes_connection_options() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::new().with_fake_dump_tools().add_database_entry(
            "shop",
            DatabaseEntry {
                name: Some("shop_production".to_string()),
                user: Some("root".to_string()),
                password: Some("s3cret".to_string()),
                host: Some("db.internal".to_string()),
                port: Some(3307),
                ..DatabaseEntry::new("mysql")
            },
        ),
    );

    let path = ctx.manager().dump_database("shop").assert_ok();

    let first_line = std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .next()
        .unwrap()
        .to_string();
    assert_eq!(
        first_line,
        "-- mysqldump -u root -ps3cret -h db.internal -P 3307 shop_production"
    );
}

#[test]
fn test_run_with_external_compressor_and_copy() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::minimal()
            .with_fake_compressor()
            .with_copy_directory("archive")
            .with_postprocessing("db1", "Bzip, PrependDatabaseName, FileSystemCopy"),
    );

    let path = ctx.manager().dump_database("db1").assert_ok();

    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("db1-dumpy-"));
    assert!(name.ends_with(".bz2"));
    assert_eq!(ctx.list_dir("archive"), vec![name]);
    // Only the final file is left in the work directory
    assert_eq!(ctx.list_dir("work").len(), 1);
}

#[test]
fn test_run_rotates_across_runs() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::minimal()
            .with_rotation("rotate", 2)
            .with_postprocessing("db1", "TimestampRename, RotateFiles")
            .set("TimestampRename", "format", "nightly"),
    );
    let manager = ctx.manager();

    for _ in 0..3 {
        manager.dump_database("db1").assert_ok();
    }

    assert_eq!(ctx.list_dir("rotate"), vec!["nightly.1", "nightly.2"]);
}

#[test]
fn test_run_uploads_to_object_store() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::minimal()
            .with_postprocessing("db1", "Bzip, S3Copy")
            .set("S3Copy", "access_key", "AK")
            .set("S3Copy", "secret_key", "SK")
            .set("S3Copy", "bucket", "nightly")
            .set("S3Copy", "prefix", "dumps/"),
    );

    let path = ctx.manager().dump_database("db1").assert_ok();

    let uploads = ctx.object_store().uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(
        uploads[0].key,
        format!("dumps/{}", path.file_name().unwrap().to_string_lossy())
    );
    assert_eq!(uploads[0].contents, std::fs::read(&path).unwrap());
}

#[test]
fn test_run_failing_dump_tool() {
    let builder = ConfigBuilder::minimal();
    let failing = fixtures::write_script(&builder.subdir("bin"), "broken-dump", fixtures::FAILING_DUMP);
    let ctx = TestContext::from_builder(
        builder
            .set("pg_dump", "path", failing.display().to_string())
            .with_postprocessing("db1", "Bzip"),
    );

    let err = ctx.manager().dump_database("db1").unwrap_err();

    assert!(matches!(
        err.downcast_ref::<BackupError>(),
        Some(BackupError::Execution { .. })
    ));
    // The temporary dump file is removed again
    assert!(ctx.list_dir("work").is_empty());
}

#[test]
fn test_run_ignoring_exit_status() {
    let builder = ConfigBuilder::minimal().with_global(|g| g.check_exit_status = false);
    let failing = fixtures::write_script(&builder.subdir("bin"), "broken-dump", fixtures::FAILING_DUMP);
    let ctx = TestContext::from_builder(builder.set("pg_dump", "path", failing.display().to_string()));

    let path = ctx.manager().dump_database("db1").assert_ok();
    assert_eq!(std::fs::read_to_string(path).unwrap(), "");
}

#[test]
fn test_run_all_isolates_failures() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::minimal()
            .add_database("legacy", "oracle")
            .add_database("shop", "mysql")
            .with_postprocessing("shop", "Bzip"),
    );

    let summary = ctx.manager().dump_all();

    let names: Vec<_> = summary.outcomes.iter().map(|o| o.database.as_str()).collect();
    assert_eq!(names, vec!["db1", "legacy", "shop"]);
    assert_eq!(summary.succeeded(), 2);

    let failed = summary.failed();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].database, "legacy");
    assert!(failed[0].error.as_deref().unwrap().contains("oracle"));

    summary.into_result().assert_err_contains("1 database(s) failed");
}

#[test]
fn test_run_summary_serializes() {
    let ctx = TestContext::with_minimal_config();

    let summary = ctx.manager().dump(&["db1".to_string(), "missing".to_string()]);
    let json = serde_json::to_string(&summary).unwrap();

    assert!(json.contains("\"database\":\"db1\""));
    assert!(json.contains("\"database\":\"missing\""));
    assert!(json.contains("Unsupported backup type"));
}

#[test]
fn test_run_refuses_locked_database() {
    let ctx = TestContext::with_minimal_config();
    let manager = ctx.manager();

    let result = dumpy::utils::locker::with_database_lock(&ctx.path("locks"), "db1", || {
        manager.dump_database("db1")
    });

    result.assert_err_contains("already being dumped");
    assert!(ctx.list_dir("work").is_empty());
}

#[test]
fn test_run_all_with_dotted_database_name() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::minimal()
            .add_database("prod.eu", "postgresql")
            .with_postprocessing("prod.eu", "PrependDatabaseName"),
    );

    let summary = ctx.manager().dump_all();

    assert!(summary.is_success(), "{:?}", summary.failed());
    let file = summary.outcomes[1].file.as_deref().unwrap();
    assert!(file
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("prod.eu-dumpy-"));
}
