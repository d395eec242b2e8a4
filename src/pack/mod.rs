//! The packer: ties P1 through P5 together into one top-level transaction.

mod fill;
mod fragments;
mod order;
mod write;

use std::path::Path;

use anyhow::Result;

use crate::open;

pub fn pack(src_path: &Path, dst_path: &Path, page_size_override: Option<u32>) -> Result<()> {
    let ctx = open::open(src_path, dst_path, page_size_override)?;

    let mut state = fragments::generate(&ctx)?;
    fill::fill_pages(&mut state, ctx.page_size_i64());
    order::order(&mut state);
    write::write(&ctx, &state)?;

    open::close(&ctx)
}
