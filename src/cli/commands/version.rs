//! `planroom version`.

use super::print_json;
use crate::error::Result;
use crate::storage::schema::CURRENT_SCHEMA_VERSION;
use serde::Serialize;

#[derive(Serialize)]
struct VersionOutput {
    version: &'static str,
    build: &'static str,
    schema: i32,
}

impl VersionOutput {
    fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            build: if cfg!(debug_assertions) { "dev" } else { "release" },
            schema: CURRENT_SCHEMA_VERSION,
        }
    }
}

/// Print the binary version and the schema version it writes.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(json: bool) -> Result<()> {
    let v = VersionOutput::current();
    if json {
        return print_json(&v);
    }
    println!("planroom version {} ({}, schema {})", v.version, v.build, v.schema);
    Ok(())
}
