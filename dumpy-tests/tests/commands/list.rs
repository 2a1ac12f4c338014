//! Tests for the 'list' command

use test_utils::{ConfigBuilder, ResultAssertions, TestContext};

#[test]
fn test_list_databases_sorted() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::minimal()
            .add_database("warehouse", "postgresql")
            .add_database("analytics", "mysql"),
    );

    assert_eq!(
        ctx.manager().databases(),
        vec!["analytics", "db1", "warehouse"]
    );
}

#[test]
fn test_list_empty_config() {
    let ctx = TestContext::from_builder(ConfigBuilder::new());
    assert!(ctx.manager().databases().is_empty());
}

#[test]
fn test_database_info_shows_stages() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::minimal()
            .add_database("shop", "mysql")
            .with_postprocessing("shop", " Bzip ,TimestampRename,, S3Copy "),
    );
    let manager = ctx.manager();

    let shop = manager.database_info("shop").assert_ok();
    assert_eq!(shop.backup_type.as_deref(), Some("mysql"));
    assert_eq!(shop.stages, vec!["Bzip", "TimestampRename", "S3Copy"]);

    let db1 = manager.database_info("db1").assert_ok();
    assert_eq!(db1.backup_type.as_deref(), Some("postgresql"));
    assert!(db1.stages.is_empty());
}

#[test]
fn test_database_info_for_unknown_database() {
    let ctx = TestContext::with_minimal_config();

    let info = ctx.manager().database_info("nope").assert_ok();

    assert_eq!(info.backup_type, None);
    assert!(info.stages.is_empty());
}
