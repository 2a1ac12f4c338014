//! Test fixtures and fake tools
//!
//! The fake dump tools behave like the real ones as far as dumpy can tell:
//! they print a dump on stdout, which the caller redirects into a file.

use std::fs;
use std::path::{Path, PathBuf};

/// Prints its arguments and a small schema
pub const FAKE_PG_DUMP: &str = r#"#!/bin/sh
echo "-- pg_dump $*"
echo "CREATE TABLE accounts (id integer, name text);"
"#;

pub const FAKE_MYSQLDUMP: &str = r#"#!/bin/sh
echo "-- mysqldump $*"
echo "CREATE TABLE orders (id int);"
"#;

/// Replaces `<file>` with `<file>.bz2` like `bzip2 -f <file>`
pub const FAKE_BZIP2: &str = r#"#!/bin/sh
mv "$2" "$2.bz2"
"#;

/// Dump tool that cannot reach its server
pub const FAILING_DUMP: &str = r#"#!/bin/sh
echo "connection refused" >&2
exit 1
"#;

/// Write an executable script into `dir`
pub fn write_script(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("Failed to write script");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Failed to make script executable");
    }

    path
}

/// Minimal configuration file for a single postgresql database
pub fn minimal_config_toml() -> &'static str {
    r#"
[database.db1]
type = "postgresql"
postprocessing = "Bzip, TimestampRename, FileSystemCopy"

[FileSystemCopy]
directory = "/srv/backups"
"#
}

/// Configuration file with one database of each type
pub fn multi_database_config_toml() -> &'static str {
    r#"
[database.app]
type = "postgresql"
name = "app_production"
user = "backup"
host = "db.internal"
port = 5432
postprocessing = "Bzip, PrependDatabaseName, S3Copy"

[database.shop]
type = "mysql"
user = "root"
password = "s3cret"
postprocessing = "Bzip, RotateFiles"

[RotateFiles]
directory = "/srv/rotate"
number = 5

[S3Copy]
access_key = "AK"
secret_key = "SK"
bucket = "nightly"
prefix = "dumps"
"#
}
