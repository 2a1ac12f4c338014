//! Stage registry and option parsing tests

use dumpy::pipeline::StageRegistry;
use dumpy::stages::s3copy::{normalize_prefix, S3CopyOptions};
use rstest::rstest;
use test_utils::{ConfigBuilder, ResolutionError};

#[rstest]
#[case("Bzip", "dumpy.stages.compress.Compress")]
#[case("Compress", "dumpy.stages.compress.Compress")]
#[case("TimestampRename", "dumpy.stages.timestamp.TimestampRename")]
#[case("PrependDatabaseName", "dumpy.stages.dbname.PrependDatabaseName")]
#[case("FileSystemCopy", "dumpy.stages.fscopy.FileSystemCopy")]
#[case("RotateFiles", "dumpy.stages.rotate.RotateFiles")]
#[case("S3Copy", "dumpy.stages.s3copy.ObjectStoreCopy")]
#[case("ObjectStoreCopy", "dumpy.stages.s3copy.ObjectStoreCopy")]
#[case("dumpy.stages.rotate.RotateFiles", "dumpy.stages.rotate.RotateFiles")]
fn test_builtin_resolution(#[case] token: &str, #[case] reference: &str) {
    let resolved = StageRegistry::builtin().resolve(token).unwrap();
    assert_eq!(resolved.token, token);
    assert_eq!(resolved.reference, reference);
}

#[rstest]
#[case("Frobnicate")]
#[case("bzip")]
fn test_unknown_alias_is_not_a_reference(#[case] token: &str) {
    assert!(matches!(
        StageRegistry::builtin().resolve(token),
        Err(ResolutionError::NotAReference(_))
    ));
}

#[test]
fn test_unknown_namespace() {
    let err = StageRegistry::builtin()
        .resolve("acme.stages.Encrypt")
        .unwrap_err();
    assert!(matches!(
        err,
        ResolutionError::UnknownNamespace { ref namespace, .. } if namespace == "acme.stages"
    ));
}

#[test]
fn test_every_reference_has_an_alias() {
    let registry = StageRegistry::builtin();
    let aliased: Vec<String> = registry.aliases().into_iter().map(|(_, r)| r).collect();

    for reference in registry.references() {
        assert!(aliased.contains(&reference), "{} has no alias", reference);
    }
}

#[rstest]
#[case(None, "")]
#[case(Some(""), "")]
#[case(Some("backups"), "backups/")]
#[case(Some("backups/"), "backups/")]
#[case(Some("a/b"), "a/b/")]
fn test_prefix_normalization(#[case] prefix: Option<&str>, #[case] expected: &str) {
    assert_eq!(normalize_prefix(prefix), expected);
}

#[test]
fn test_s3_options_from_config() {
    let config = ConfigBuilder::new()
        .set("S3Copy", "access_key", "AK")
        .set("S3Copy", "secret_key", "SK")
        .set("S3Copy", "bucket", "nightly")
        .set("S3Copy", "prefix", "backups")
        .set("S3Copy", "endpoint_url", "http://localhost:9000")
        .set("S3Copy", "max_attempts", 4)
        .build();

    let options = S3CopyOptions::from_config(&config).unwrap();

    assert_eq!(options.key_for("db1.bz2"), "backups/db1.bz2");
    assert_eq!(options.endpoint_url.as_deref(), Some("http://localhost:9000"));
    assert_eq!(options.max_attempts, 4);
    assert_eq!(options.connection().region, "us-east-1");
}

#[test]
fn test_s3_options_require_bucket() {
    let config = ConfigBuilder::new()
        .set("S3Copy", "access_key", "AK")
        .set("S3Copy", "secret_key", "SK")
        .build();

    let err = S3CopyOptions::from_config(&config).unwrap_err();
    assert!(err.to_string().contains("bucket"));
}
