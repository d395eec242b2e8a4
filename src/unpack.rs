//! Reconstruction: the inverse of the packer's P5. For every `splits`
//! row, rebuild the original blob from its (optional) `frags` partner
//! and write it back into a single `blob` table.
//!
//! Grounded directly in `blobunpack.c`'s `transfer_data`: a left join of
//! `splits` to `frags` on `frags.id = splits.id`, then a three-way nil
//! rule on the two `val` columns.

use std::path::Path;

use anyhow::{Context as _, Result};
use rusqlite::Connection;

use crate::open::{self, BLOB_TABLE};

pub fn unpack(src_path: &Path, dst_path: &Path, page_size_override: Option<u32>) -> Result<()> {
    let ctx = open::open(src_path, dst_path, page_size_override)?;

    ctx.conn
        .execute_batch(&format!(
            "CREATE TABLE {BLOB_TABLE}(id INTEGER PRIMARY KEY, val BLOB)"
        ))
        .context("failed to create output blob table")?;

    eprintln!("Reconstructing blobs...");
    transfer_data(&ctx.conn)?;

    open::close(&ctx)
}

fn transfer_data(conn: &Connection) -> Result<()> {
    let mut read = conn
        .prepare(
            "SELECT source.splits.id, source.splits.val, source.frags.val
             FROM source.splits
             LEFT JOIN source.frags ON source.frags.id = source.splits.id
             ORDER BY source.splits.id",
        )
        .context("sqlite3_prepare(transfer_data read)")?;
    let mut insert = conn
        .prepare(&format!("INSERT INTO {BLOB_TABLE}(id, val) VALUES (?1, ?2)"))
        .context("sqlite3_prepare(transfer_data insert)")?;

    let rows = read
        .query_map([], |row| {
            let id: i64 = row.get(0)?;
            let head: Option<Vec<u8>> = row.get(1)?;
            let tail: Option<Vec<u8>> = row.get(2)?;
            Ok((id, head, tail))
        })
        .context("sqlite3_step(transfer_data read)")?;

    for row in rows {
        let (id, head, tail) = row.context("sqlite3_step(transfer_data read)")?;
        let val = reconstruct(head, tail);
        insert
            .execute((id, val))
            .context("sqlite3_step(transfer_data insert)")?;
    }

    Ok(())
}

/// head=nil -> nil; tail=nil -> head alone; else concatenated.
fn reconstruct(head: Option<Vec<u8>>, tail: Option<Vec<u8>>) -> Option<Vec<u8>> {
    match (head, tail) {
        (None, _) => None,
        (Some(head), None) => Some(head),
        (Some(mut head), Some(tail)) => {
            head.extend_from_slice(&tail);
            Some(head)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_nil_reconstructs_nil() {
        assert_eq!(reconstruct(None, None), None);
        assert_eq!(reconstruct(None, Some(vec![1, 2])), None);
    }

    #[test]
    fn tail_nil_reconstructs_head_only() {
        assert_eq!(reconstruct(Some(vec![1, 2, 3]), None), Some(vec![1, 2, 3]));
    }

    #[test]
    fn both_present_concatenates() {
        assert_eq!(
            reconstruct(Some(vec![1, 2]), Some(vec![3, 4])),
            Some(vec![1, 2, 3, 4])
        );
    }
}
