//! P2 -- Fragment generation.
//!
//! For every source blob, decide whether splitting it reduces wasted
//! space and, if so, where. Two disjoint subsets of blobs get split:
//!
//! - Subset A: the unsplit cell alone would monopolize more than half a
//!   leaf page's cell space.
//! - Subset B: the unsplit cell has unused space on its last overflow
//!   page that a split could reclaim.
//!
//! The reference implementation computes the total fragment count in a
//! first pass (using rowid `-1`, a conservative 9-byte varint) and then
//! *reuses that count* as the rowid argument for every `blob_space` call
//! in the second pass -- every fragment's eventual final id is bounded
//! above by the total fragment count, so it's a tighter, still-safe
//! stand-in for `-1`. This isn't spelled out in the prose spec, only in
//! the original source, so we follow the original exactly.

use anyhow::{Context as _, Result};
use rusqlite::Connection;

use crate::context::Context;
use crate::cost::blob_space;
use crate::open::BLOB_TABLE;
use crate::state::PackState;

pub fn generate(ctx: &Context) -> Result<PackState> {
    eprintln!("Generating fragments...");

    let page_size = ctx.page_size_i64();
    let half_space = (page_size - 8) / 2;

    let blobs = list_blobs(&ctx.conn)?;
    log::debug!("{} source blobs", blobs.len());

    let mut frag_total: i64 = 0;
    for (_, size) in &blobs {
        if let Some(size) = size {
            let head_space = blob_space(-1, *size, page_size);
            frag_total += if head_space.cell_size > half_space || head_space.unused_space > 0 {
                2
            } else {
                1
            };
        }
    }

    log::debug!("frag_total (conservative rowid placeholder) = {frag_total}");

    let mut state = PackState::new();
    let mut frag_id: i64 = 0;

    for (split_id, size) in blobs {
        state.push_split(split_id);

        let Some(size) = size else {
            continue;
        };

        let head_space = blob_space(frag_total, size, page_size);
        let (mut lo, mut hi) = if head_space.cell_size > half_space {
            // Subset A: balance the two halves; cell sizes land around
            // 1/4 to 1/2 of the page.
            (page_size / 8, page_size * 5 / 8)
        } else if head_space.unused_space > 0 {
            // Subset B: shave exactly one overflow page off the tail;
            // cell sizes land around 1/2 to 9/16 of the page.
            (page_size * 17 / 32, page_size * 19 / 32)
        } else {
            (size, size)
        };

        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            let head = blob_space(frag_total, mid, page_size);
            let tail = blob_space(frag_total, size - mid, page_size);
            if tail.cell_size < head.cell_size {
                hi = mid;
            } else {
                lo = mid;
            }
        }

        let head_size = lo;
        let head_space = blob_space(frag_total, head_size, page_size);
        debug_assert_eq!(head_space.unused_space, 0);
        frag_id += 1;
        state.push_fragment(frag_id, 0, head_size, head_space.cell_size, split_id);

        let tail_size = size - head_size;
        if tail_size > 0 {
            let tail_space = blob_space(frag_total, tail_size, page_size);
            debug_assert_eq!(tail_space.unused_space, 0);
            frag_id += 1;
            state.push_fragment(frag_id, head_size, tail_size, tail_space.cell_size, split_id);
        }
    }

    log::debug!("{} fragments emitted", state.fragments.len());
    Ok(state)
}

fn list_blobs(conn: &Connection) -> Result<Vec<(i64, Option<i64>)>> {
    let sql = format!("SELECT id, length(val) FROM source.{BLOB_TABLE} ORDER BY id");
    let mut stmt = conn.prepare(&sql).context("sqlite3_prepare(list_blobs)")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .context("sqlite3_step(list_blobs)")?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .context("sqlite3_step(list_blobs)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::blob_space;

    // Reproduces the binary search in isolation against the same cost
    // model, checking the spec's convergence and post-condition
    // properties without needing a database.
    fn search(size: i64, page_size: i64, lo: i64, hi: i64) -> (i64, u32) {
        let mut lo = lo;
        let mut hi = hi;
        let mut iterations = 0;
        while hi - lo > 1 {
            iterations += 1;
            let mid = (lo + hi) / 2;
            let head = blob_space(1, mid, page_size);
            let tail = blob_space(1, size - mid, page_size);
            if tail.cell_size < head.cell_size {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        (lo, iterations)
    }

    #[test]
    fn subset_a_binary_search_converges_and_splits_cleanly() {
        let page_size = 4096i64;
        let size = 3000i64;
        let head_space = blob_space(1, size, page_size);
        let half_space = (page_size - 8) / 2;
        assert!(head_space.cell_size > half_space, "expected subset A");

        let (lo, hi) = (page_size / 8, page_size * 5 / 8);
        let max_iters = (((hi - lo) as f64).log2().ceil()) as u32;
        let (head_size, iterations) = search(size, page_size, lo, hi);
        assert!(iterations <= max_iters);

        let head = blob_space(1, head_size, page_size);
        let tail = blob_space(1, size - head_size, page_size);
        assert_eq!(head.unused_space, 0);
        assert_eq!(tail.unused_space, 0);
    }

    #[test]
    fn subset_b_binary_search_converges_and_splits_cleanly() {
        let page_size = 4096i64;
        let size = 10_000_000i64;
        let head_space = blob_space(1, size, page_size);
        let half_space = (page_size - 8) / 2;
        assert!(head_space.cell_size <= half_space);
        assert!(head_space.unused_space > 0, "expected subset B");

        let (lo, hi) = (page_size * 17 / 32, page_size * 19 / 32);
        let max_iters = (((hi - lo) as f64).log2().ceil()) as u32;
        let (head_size, iterations) = search(size, page_size, lo, hi);
        assert!(iterations <= max_iters);

        let head = blob_space(1, head_size, page_size);
        let tail = blob_space(1, size - head_size, page_size);
        assert_eq!(head.unused_space, 0);
        assert_eq!(tail.unused_space, 0);
        assert!(head_size >= lo && head_size <= hi);
    }
}
