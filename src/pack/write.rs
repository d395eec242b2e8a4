//! P5 -- Write-out: populate the persistent `splits`/`frags` tables in
//! final-id order.
//!
//! `splits.val` holds the head fragment's bytes (or nil, for a blob that
//! was nil to begin with). `frags.val` holds the tail fragment's bytes,
//! written only for splits that still have two fragments after the undo
//! pass in P3. A source blob that was split into two fragments is read
//! twice -- once per fragment -- rather than cached, matching the
//! reference's documented tradeoff against a later vacuum pass.

use anyhow::{Context as _, Result};
use rusqlite::Connection;

use crate::context::Context;
use crate::open::BLOB_TABLE;
use crate::state::PackState;

pub fn write(ctx: &Context, state: &PackState) -> Result<()> {
    create_output_tables(&ctx.conn)?;

    eprintln!("Writing output splits...");
    write_splits(&ctx.conn, state)?;

    eprintln!("Writing output fragments...");
    write_frags(&ctx.conn, state)?;

    Ok(())
}

fn create_output_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE splits(id INTEGER PRIMARY KEY, val BLOB);
         CREATE TABLE frags(id INTEGER PRIMARY KEY, val BLOB);",
    )
    .context("failed to create output tables")
}

fn write_splits(conn: &Connection, state: &PackState) -> Result<()> {
    let sql = format!("SELECT substr(val, 1, ?1) FROM source.{BLOB_TABLE} WHERE id = ?2");
    let mut read_head = conn
        .prepare(&sql)
        .context("sqlite3_prepare(write_splits read)")?;
    let mut insert = conn
        .prepare("INSERT INTO splits(id, val) VALUES (?1, ?2)")
        .context("sqlite3_prepare(write_splits insert)")?;

    let mut ordered: Vec<&crate::state::Split> = state.splits.iter().collect();
    ordered.sort_by_key(|s| s.final_id.expect("split missing final_id after P4"));

    for split in ordered {
        let final_id = split.final_id.unwrap();
        let head = state.head_fragment(split.split_id);

        let val: Option<Vec<u8>> = match head {
            None => None,
            Some(frag) => {
                let bytes: Vec<u8> = read_head
                    .query_row((frag.size, split.split_id), |row| row.get(0))
                    .context("sqlite3_step(write_splits read)")?;
                Some(bytes)
            }
        };

        insert
            .execute((final_id, val))
            .context("sqlite3_step(write_splits insert)")?;
    }

    Ok(())
}

fn write_frags(conn: &Connection, state: &PackState) -> Result<()> {
    let sql = format!("SELECT substr(val, ?1, ?2) FROM source.{BLOB_TABLE} WHERE id = ?3");
    let mut read_tail = conn
        .prepare(&sql)
        .context("sqlite3_prepare(write_frags read)")?;
    let mut insert = conn
        .prepare("INSERT INTO frags(id, val) VALUES (?1, ?2)")
        .context("sqlite3_prepare(write_frags insert)")?;

    let mut ordered: Vec<&crate::state::Fragment> = state
        .fragments
        .iter()
        .filter(|f| f.offset != 0)
        .collect();
    ordered.sort_by_key(|f| f.final_id.expect("fragment missing final_id after P4"));

    for frag in ordered {
        let split_final_id = state.split(frag.split_id).final_id.unwrap();
        // substr is 1-indexed.
        let bytes: Vec<u8> = read_tail
            .query_row((frag.offset + 1, frag.size, frag.split_id), |row| row.get(0))
            .context("sqlite3_step(write_frags read)")?;
        insert
            .execute((split_final_id, bytes))
            .context("sqlite3_step(write_frags insert)")?;
    }

    Ok(())
}
