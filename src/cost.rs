//! Byte-exact B-tree leaf cell and overflow page arithmetic for a table
//! of the shape `(id INTEGER PRIMARY KEY, val BLOB)`.
//!
//! These formulas mirror the spill rules a table b-tree leaf cell follows:
//! the payload record size, the inline/overflow split point, and the
//! resulting cell size and unused tail on the last overflow page. Every
//! later pass trusts these numbers to be exact -- get them wrong and the
//! whole pack's space accounting silently corrupts.
//!
//! All arithmetic here is `i64`; page sizes top out at 65536 and blob
//! lengths can be arbitrarily large, so there is no value in narrowing
//! intermediates.

/// Number of bytes a varint encoding of `val` occupies.
///
/// Negative values always take the full 9-byte twos-complement form; this
/// is used deliberately as a conservative upper bound when the real rowid
/// isn't known yet (see [`crate::pack::fragments`]).
pub fn varint_size(val: i64) -> i64 {
    if val < 0 {
        return 9;
    }
    if val < 0x80 {
        1
    } else if val < 0x4000 {
        2
    } else if val < 0x20_0000 {
        3
    } else if val < 0x1000_0000 {
        4
    } else if val < 0x8_0000_0000 {
        5
    } else if val < 0x400_0000_0000 {
        6
    } else if val < 0x2_0000_0000_0000 {
        7
    } else if val < 0x100_0000_0000_0000 {
        8
    } else {
        9
    }
}

/// Payload record size for a single row of a table like
/// `create table t (id integer primary key, val blob);`
///
/// 1 byte for the record header size, 1 byte (or more) for the blob
/// column's serial type, plus the blob bytes themselves. `blob_len*2+12`
/// is the blob serial type code (`N>=12, even => (N-12)/2` byte blob).
pub fn rec_size(blob_len: i64) -> i64 {
    2 + varint_size(blob_len * 2 + 12) + blob_len
}

/// Leaf cell size, overflow page count, and unused space on the last
/// overflow page, for a row with the given `rowid` and blob length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Space {
    pub cell_size: i64,
    pub overflow_count: i64,
    pub unused_space: i64,
}

/// Computes [`Space`] for a row of integer key `rowid` and blob length
/// `blob_len`, on a page of size `page_size`.
///
/// `rowid` only affects the answer through its own varint width; callers
/// that don't yet know the real rowid may pass `-1` (worst case, 9 bytes)
/// or any other value known to be an upper bound on the eventual one.
pub fn blob_space(rowid: i64, blob_len: i64, page_size: i64) -> Space {
    let rec = rec_size(blob_len);
    let space = if rec <= page_size - 35 {
        Space {
            cell_size: 2 + varint_size(rec) + varint_size(rowid) + rec,
            overflow_count: 0,
            unused_space: 0,
        }
    } else {
        let m = (page_size - 12) * 32 / 255 - 23;
        let k = m + (rec - m) % (page_size - 4);
        let inline_size = if k <= page_size - 35 { k } else { m };
        let overflow_count = (rec - inline_size + (page_size - 4) - 1) / (page_size - 4);
        Space {
            cell_size: 2 + varint_size(rec) + varint_size(rowid) + inline_size + 4,
            overflow_count,
            unused_space: (page_size - 4) * overflow_count - (rec - inline_size),
        }
    };
    debug_assert!(
        space.cell_size <= i64::from(i32::MAX),
        "cell_size {} overflows the 32-bit width fragments store it in",
        space.cell_size
    );
    space
}
