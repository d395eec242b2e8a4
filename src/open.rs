//! P1 -- Open: create the destination database, attach the source
//! read-only, fix the destination page size, begin the one top-level
//! transaction every later pass runs inside.

use std::path::Path;

use anyhow::{Context as _, Result};
use rusqlite::Connection;

use crate::context::Context;

/// The single table name this tool reads from / writes to on each side.
/// The CLI takes no table-name argument, so exactly one table of the
/// accepted shape is addressed per invocation.
pub const BLOB_TABLE: &str = "blob";

pub fn open(src_path: &Path, dst_path: &Path, page_size_override: Option<u32>) -> Result<Context> {
    let conn = Connection::open(dst_path).with_context(|| {
        format!(
            "{}: failed to open destination database",
            dst_path.display()
        )
    })?;

    conn.execute(
        "ATTACH DATABASE ?1 AS source",
        [src_path.to_string_lossy().into_owned()],
    )
    .with_context(|| format!("failed to attach source database {}", src_path.display()))?;

    // ATTACH alone grants the attached schema the same read-write access as
    // the main connection; query_only enforces the read-only contract spec.md
    // §5 requires -- any later statement that tries to write through
    // `source.*` fails instead of silently mutating the caller's input file.
    conn.execute_batch("PRAGMA source.query_only = ON")
        .context("failed to mark source database read-only")?;

    let page_size = match page_size_override {
        Some(page_size) => page_size,
        None => conn
            .query_row("PRAGMA source.page_size", [], |row| row.get::<_, u32>(0))
            .context("failed to read source database's page size")?,
    };

    // Must happen before the destination file has any pages written, and
    // is never revisited after this point.
    conn.pragma_update(None, "page_size", page_size)
        .context("failed to set destination page size")?;

    conn.execute_batch("BEGIN")
        .context("failed to start transaction")?;

    Ok(Context {
        page_size,
        src_path: src_path.to_path_buf(),
        dst_path: dst_path.to_path_buf(),
        conn,
    })
}

/// Commits the single top-level transaction and detaches the source.
/// Called once, from the final pass of each binary.
pub fn close(ctx: &Context) -> Result<()> {
    ctx.conn
        .execute_batch("COMMIT")
        .context("failed to commit transaction")?;
    ctx.conn
        .execute_batch("DETACH DATABASE source")
        .context("failed to detach source database")?;
    Ok(())
}
