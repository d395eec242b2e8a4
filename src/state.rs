//! In-memory bookkeeping for splits, fragments, and pages.
//!
//! The reference implementation keeps these as temp tables in the
//! destination database and drives P3/P4 with SQL. Per the Design Notes'
//! explicitly-sanctioned alternative, this repo keeps them as plain Rust
//! structs with `HashMap` id-to-index side tables -- the fields and
//! invariants are unchanged, only the storage is.

use std::collections::HashMap;

/// One surviving input blob. `final_id` is assigned in the ordering pass.
#[derive(Debug, Clone)]
pub struct Split {
    pub split_id: i64,
    pub final_id: Option<i64>,
}

/// A contiguous slice of a blob. Either one fragment per split (the whole
/// blob, `offset == 0`) or two (`[0, h)` and `[h, size)`).
#[derive(Debug, Clone)]
pub struct Fragment {
    pub frag_id: i64,
    pub offset: i64,
    pub size: i64,
    pub cell_size: i64,
    pub split_id: i64,
    pub page_id: Option<i64>,
    pub final_id: Option<i64>,
}

/// A leaf page fragments are packed into. `free_space` becomes `None`
/// once the page is no longer a candidate for further fragments.
#[derive(Debug, Clone)]
pub struct Page {
    pub page_id: i64,
    pub free_space: Option<i64>,
    pub final_id: Option<i64>,
}

/// Everything P2 through P5 operate on, indexed for O(1) lookup by id.
#[derive(Debug, Default)]
pub struct PackState {
    pub splits: Vec<Split>,
    pub fragments: Vec<Fragment>,
    pub pages: Vec<Page>,
    split_index: HashMap<i64, usize>,
    fragment_index: HashMap<i64, usize>,
    page_index: HashMap<i64, usize>,
}

impl PackState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_split(&mut self, split_id: i64) {
        self.split_index.insert(split_id, self.splits.len());
        self.splits.push(Split {
            split_id,
            final_id: None,
        });
    }

    pub fn push_fragment(&mut self, frag_id: i64, offset: i64, size: i64, cell_size: i64, split_id: i64) {
        self.fragment_index.insert(frag_id, self.fragments.len());
        self.fragments.push(Fragment {
            frag_id,
            offset,
            size,
            cell_size,
            split_id,
            page_id: None,
            final_id: None,
        });
    }

    pub fn push_page(&mut self, page_id: i64, free_space: Option<i64>) {
        self.page_index.insert(page_id, self.pages.len());
        self.pages.push(Page {
            page_id,
            free_space,
            final_id: None,
        });
    }

    pub fn split(&self, split_id: i64) -> &Split {
        &self.splits[self.split_index[&split_id]]
    }

    pub fn fragment(&self, frag_id: i64) -> &Fragment {
        &self.fragments[self.fragment_index[&frag_id]]
    }

    pub fn fragment_mut(&mut self, frag_id: i64) -> &mut Fragment {
        let idx = self.fragment_index[&frag_id];
        &mut self.fragments[idx]
    }

    pub fn page_mut(&mut self, page_id: i64) -> &mut Page {
        let idx = self.page_index[&page_id];
        &mut self.pages[idx]
    }

    /// Fragments belonging to `split_id`, in the order they were emitted.
    pub fn fragments_of(&self, split_id: i64) -> Vec<&Fragment> {
        self.fragments
            .iter()
            .filter(|f| f.split_id == split_id)
            .collect()
    }

    /// The `offset == 0` fragment for a split, if the blob wasn't null.
    pub fn head_fragment(&self, split_id: i64) -> Option<&Fragment> {
        self.fragments
            .iter()
            .find(|f| f.split_id == split_id && f.offset == 0)
    }

    /// Drops fragments at the given indices (largest index first to keep
    /// earlier indices valid), rebuilding the id index afterwards.
    pub fn remove_fragments(&mut self, mut indices: Vec<usize>) {
        indices.sort_unstable_by(|a, b| b.cmp(a));
        indices.dedup();
        for idx in indices {
            self.fragments.remove(idx);
        }
        self.fragment_index.clear();
        for (idx, frag) in self.fragments.iter().enumerate() {
            self.fragment_index.insert(frag.frag_id, idx);
        }
    }
}
