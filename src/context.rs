//! Threaded state shared by every pass.
//!
//! The reference implementation keeps a single `globals` struct holding
//! the open database handle and configuration, threaded by pointer into
//! each pass function. This generalizes that into an explicitly-passed
//! value instead of a global -- each pass takes `&Context` (or `&mut
//! Context` for passes that still need to execute statements).

use std::path::PathBuf;

use rusqlite::Connection;

pub struct Context {
    pub page_size: u32,
    pub src_path: PathBuf,
    pub dst_path: PathBuf,
    pub conn: Connection,
}

impl Context {
    pub fn page_size_i64(&self) -> i64 {
        i64::from(self.page_size)
    }
}
