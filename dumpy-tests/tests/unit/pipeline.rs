//! Post-processing chain tests with the built-in stages

use bzip2::read::BzDecoder;
use dumpy::database::BackupTarget;
use dumpy::pipeline::{Pipeline, StageRegistry, StageServices};
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use test_utils::{
    ConfigBuilder, DumpFile, MockExecutor, MockObjectStore, MockResponse, PipelineError,
    ResolutionError, Stage,
};

/// Pipeline over the builder's config with the builtin stages
fn pipeline_for(builder: &ConfigBuilder, store: &MockObjectStore) -> Pipeline {
    let config = Arc::new(builder.build());
    let services = StageServices::from_settings(dumpy::ConfigLookup::global(config.as_ref()))
        .with_object_store(Arc::new(store.clone()));
    Pipeline::new(config, StageRegistry::builtin(), services)
}

fn raw_dump(builder: &ConfigBuilder, contents: &str) -> DumpFile {
    let path = builder.subdir("work").join("dumpy-raw");
    std::fs::write(&path, contents).unwrap();
    DumpFile::open(path).unwrap()
}

fn decompress(path: &std::path::Path) -> String {
    let mut out = String::new();
    BzDecoder::new(std::fs::File::open(path).unwrap())
        .read_to_string(&mut out)
        .unwrap();
    out
}

#[test]
fn test_compress_then_copy() {
    let builder = ConfigBuilder::new()
        .add_database("db1", "postgresql")
        .with_postprocessing("db1", "Bzip, FileSystemCopy")
        .with_copy_directory("archive");
    let store = MockObjectStore::new();
    let pipeline = pipeline_for(&builder, &store);

    let file = raw_dump(&builder, "CREATE TABLE t;\n");
    let ledger = file.ledger().clone();

    let out = pipeline.run(&BackupTarget::new("db1"), file).unwrap();

    assert_eq!(out.path(), builder.work_dir().join("dumpy-raw.bz2"));
    assert!(!builder.work_dir().join("dumpy-raw").exists());
    let copy = builder.temp_dir().join("archive").join("dumpy-raw.bz2");
    assert_eq!(decompress(&copy), "CREATE TABLE t;\n");
    assert_eq!(ledger.live(), 1);
}

#[test]
fn test_full_chain_leaves_one_live_handle() {
    let builder = ConfigBuilder::new()
        .add_database("db1", "postgresql")
        .with_postprocessing(
            "db1",
            "Bzip, PrependDatabaseName, FileSystemCopy, RotateFiles, S3Copy",
        )
        .with_copy_directory("archive")
        .with_rotation("rotate", 3)
        .set("S3Copy", "access_key", "AK")
        .set("S3Copy", "secret_key", "SK")
        .set("S3Copy", "bucket", "nightly")
        .set("S3Copy", "prefix", "backups");
    let store = MockObjectStore::new();
    let pipeline = pipeline_for(&builder, &store);

    let file = raw_dump(&builder, "data");
    let ledger = file.ledger().clone();

    let out = pipeline.run(&BackupTarget::new("db1"), file).unwrap();

    assert_eq!(out.file_name(), "db1-dumpy-raw.bz2");
    assert_eq!(ledger.live(), 1);
    // Compress and PrependDatabaseName each opened a successor
    assert_eq!(ledger.opened(), 3);

    assert!(builder.temp_dir().join("archive/db1-dumpy-raw.bz2").exists());
    assert!(builder.temp_dir().join("rotate/db1-dumpy-raw.bz2.1").exists());

    let uploads = store.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].bucket, "nightly");
    assert_eq!(uploads[0].key, "backups/db1-dumpy-raw.bz2");
}

#[test]
fn test_timestamp_rename_with_database_name() {
    let builder = ConfigBuilder::new()
        .add_database("sales", "mysql")
        .with_postprocessing("sales", "TimestampRename")
        .with_insert_db_name("sales")
        .set("TimestampRename", "format", "%Y");
    let pipeline = pipeline_for(&builder, &MockObjectStore::new());

    let out = pipeline
        .run(&BackupTarget::new("sales"), raw_dump(&builder, "x"))
        .unwrap();

    let name = out.file_name();
    assert!(name.starts_with("sales-"), "unexpected name {}", name);
    assert_eq!(name.len(), "sales-".len() + 4);
}

#[test]
fn test_database_copy_override() {
    let builder = ConfigBuilder::new()
        .add_database("db1", "postgresql")
        .with_postprocessing("db1", "FileSystemCopy")
        .with_copy_directory("shared");
    let special = builder.subdir("special");
    let builder = builder.with_copy_directory_override("db1", &special);
    let pipeline = pipeline_for(&builder, &MockObjectStore::new());

    let file = raw_dump(&builder, "x");
    let id = file.id();
    let out = pipeline.run(&BackupTarget::new("db1"), file).unwrap();

    assert_eq!(out.id(), id);
    assert!(special.join("dumpy-raw").exists());
    assert!(!builder.temp_dir().join("shared/dumpy-raw").exists());
}

#[test]
fn test_fully_qualified_reference() {
    let builder = ConfigBuilder::new()
        .add_database("db1", "postgresql")
        .with_postprocessing("db1", "dumpy.stages.dbname.PrependDatabaseName");
    let pipeline = pipeline_for(&builder, &MockObjectStore::new());

    let out = pipeline
        .run(&BackupTarget::new("db1"), raw_dump(&builder, "x"))
        .unwrap();
    assert_eq!(out.file_name(), "db1-dumpy-raw");
}

#[test]
fn test_unknown_stage_in_known_namespace() {
    let builder = ConfigBuilder::new()
        .add_database("db1", "postgresql")
        .with_postprocessing("db1", "Bzip, dumpy.stages.compress.Gzip");
    let pipeline = pipeline_for(&builder, &MockObjectStore::new());

    let file = raw_dump(&builder, "x");
    let path = file.path().to_path_buf();
    let err = pipeline.run(&BackupTarget::new("db1"), file).unwrap_err();

    assert!(matches!(
        err,
        PipelineError::ProcessorResolution {
            source: ResolutionError::UnknownStage { ref name, .. },
            ..
        } if name == "Gzip"
    ));
    // Nothing ran, so the raw dump was not compressed
    assert!(path.exists());
}

#[test]
fn test_failing_upload_aborts_after_earlier_stages() {
    let builder = ConfigBuilder::new()
        .add_database("db1", "postgresql")
        .with_postprocessing("db1", "Bzip, S3Copy, FileSystemCopy")
        .with_copy_directory("archive")
        .set("S3Copy", "access_key", "AK")
        .set("S3Copy", "secret_key", "wrong")
        .set("S3Copy", "bucket", "nightly");
    let store = MockObjectStore::new().fail_times(1);
    let pipeline = pipeline_for(&builder, &store);

    let err = pipeline
        .run(&BackupTarget::new("db1"), raw_dump(&builder, "x"))
        .unwrap_err();

    match err {
        PipelineError::StageExecution { stage, target, .. } => {
            assert_eq!(stage, "ObjectStoreCopy");
            assert_eq!(target, "db1");
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(builder.work_dir().join("dumpy-raw.bz2").exists());
    assert!(!builder.temp_dir().join("archive/dumpy-raw.bz2").exists());
}

#[test]
fn test_custom_stage_registration() {
    struct Truncate;

    impl Stage for Truncate {
        fn name(&self) -> &str {
            "Truncate"
        }

        fn process(&self, file: DumpFile) -> anyhow::Result<DumpFile> {
            std::fs::write(file.path(), "")?;
            Ok(file)
        }
    }

    let builder = ConfigBuilder::new()
        .add_database("db1", "postgresql")
        .with_postprocessing("db1", "acme.stages.Truncate, PrependDatabaseName");
    let config = Arc::new(builder.build());

    let mut registry = StageRegistry::builtin();
    registry
        .register("acme.stages.Truncate", |_| Ok(Box::new(Truncate) as Box<dyn Stage>))
        .unwrap();
    let services = StageServices::from_settings(dumpy::ConfigLookup::global(config.as_ref()));
    let pipeline = Pipeline::new(config, registry, services);

    let out = pipeline
        .run(&BackupTarget::new("db1"), raw_dump(&builder, "x"))
        .unwrap();

    assert_eq!(out.file_name(), "db1-dumpy-raw");
    assert_eq!(std::fs::read_to_string(out.path()).unwrap(), "");
}

#[test]
fn test_compressor_runs_through_injected_executor() {
    let builder = ConfigBuilder::new()
        .add_database("db1", "postgresql")
        .with_postprocessing("db1", "Bzip")
        .set("Bzip", "path", "bzip2")
        .with_global(|g| g.command_timeout_seconds = 5);
    let config = Arc::new(builder.build());
    let executor = MockExecutor::new().respond_with(MockResponse::Failure {
        stderr: "bzip2: disk full".to_string(),
        exit_code: 1,
    });
    let services = StageServices::from_settings(dumpy::ConfigLookup::global(config.as_ref()))
        .with_executor(Arc::new(executor.clone()));
    let pipeline = Pipeline::new(config, StageRegistry::builtin(), services);

    let err = pipeline
        .run(&BackupTarget::new("db1"), raw_dump(&builder, "x"))
        .unwrap_err();

    assert!(err.to_string().contains("disk full"));
    let calls = executor.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].command.starts_with("bzip2 -f "));
    assert_eq!(calls[0].policy.timeout, Some(Duration::from_secs(5)));
}
