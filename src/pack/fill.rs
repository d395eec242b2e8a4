//! P3 -- Page fill: best-fit bin-packing of fragments into leaf-page cell
//! budgets, then the undo-split pass.
//!
//! Fragments are iterated (not pages), each looked up against a
//! `BTreeMap<free_space, page_ids>` bucket for the smallest page whose
//! remaining space still fits the fragment -- `O(f log p)` against `f`
//! fragments and `p <= f` pages, same complexity trade-off the reference
//! implementation calls out for driving the search by fragment rather
//! than by page.

use std::collections::{BTreeMap, BTreeSet};

use crate::state::PackState;

pub fn fill_pages(state: &mut PackState, page_size: i64) {
    eprintln!("Packing fragments into pages...");

    let max_space = page_size - 8;
    let min_size = state
        .fragments
        .iter()
        .map(|f| f.cell_size)
        .min()
        .unwrap_or(0);

    // free_space -> page ids with exactly that much room. Each bucket is a
    // `BTreeSet` so the tie-break among equally-good pages is always the
    // lowest `page_id`, regardless of the order pages were pushed into (or
    // re-pushed into, across several fragments) the bucket.
    let mut by_free_space: BTreeMap<i64, BTreeSet<i64>> = BTreeMap::new();
    let mut next_page_id: i64 = 0;

    let frag_ids: Vec<i64> = state.fragments.iter().map(|f| f.frag_id).collect();
    for frag_id in frag_ids {
        let cell_size = state.fragment(frag_id).cell_size;

        let best_fit = by_free_space
            .range(cell_size..)
            .next()
            .map(|(&free_space, ids)| (free_space, *ids.iter().next().unwrap()));

        let (page_id, free_space) = match best_fit {
            Some((free_space, page_id)) => {
                let ids = by_free_space.get_mut(&free_space).unwrap();
                ids.remove(&page_id);
                if ids.is_empty() {
                    by_free_space.remove(&free_space);
                }
                (page_id, free_space)
            }
            None => {
                next_page_id += 1;
                state.push_page(next_page_id, Some(max_space));
                (next_page_id, max_space)
            }
        };

        let remaining = free_space - cell_size;
        if remaining >= min_size {
            by_free_space.entry(remaining).or_default().insert(page_id);
            state.page_mut(page_id).free_space = Some(remaining);
        } else {
            state.page_mut(page_id).free_space = None;
        }

        state.fragment_mut(frag_id).page_id = Some(page_id);
    }

    log::debug!("{} pages allocated before undo pass", state.pages.len());
    undo_useless_splits(state);
}

/// A split is undone -- its (at most two) fragments merged back into a
/// single whole-blob fragment -- if either:
///
/// a) both fragments ended up on the same page (the split saved nothing), or
/// b) each fragment is the only cell on its own page (the split just
///    moved the same bytes across two otherwise-identical pages).
///
/// `cell_size` is not recomputed for the merged fragment; nothing reads
/// it again after this pass.
fn undo_useless_splits(state: &mut PackState) {
    use std::collections::HashMap;

    let mut frags_per_page: HashMap<i64, i64> = HashMap::new();
    for f in &state.fragments {
        if let Some(page_id) = f.page_id {
            *frags_per_page.entry(page_id).or_insert(0) += 1;
        }
    }

    let mut by_split: HashMap<i64, Vec<usize>> = HashMap::new();
    for (idx, f) in state.fragments.iter().enumerate() {
        by_split.entry(f.split_id).or_default().push(idx);
    }

    let mut to_remove = Vec::new();
    for idxs in by_split.values() {
        if idxs.len() != 2 {
            continue;
        }
        let (i0, i1) = (idxs[0], idxs[1]);
        let (p0, p1) = (state.fragments[i0].page_id, state.fragments[i1].page_id);

        let same_page = p0.is_some() && p0 == p1;
        let each_alone = p0 != p1
            && p0.is_some_and(|p| frags_per_page[&p] == 1)
            && p1.is_some_and(|p| frags_per_page[&p] == 1);

        if !same_page && !each_alone {
            continue;
        }

        let (head_idx, tail_idx) = if state.fragments[i0].offset == 0 {
            (i0, i1)
        } else {
            (i1, i0)
        };
        let full_size = state.fragments[head_idx].size + state.fragments[tail_idx].size;
        state.fragments[head_idx].size = full_size;
        to_remove.push(tail_idx);
    }

    log::debug!("{} splits undone", to_remove.len());
    state.remove_fragments(to_remove);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag_state(sizes: &[(i64, i64)]) -> PackState {
        // sizes: (split_id, cell_size) for single-fragment splits
        let mut state = PackState::new();
        for (i, &(split_id, cell_size)) in sizes.iter().enumerate() {
            state.push_split(split_id);
            state.push_fragment(i as i64 + 1, 0, cell_size, cell_size, split_id);
        }
        state
    }

    #[test]
    fn best_fit_never_overruns_a_page() {
        let mut state = frag_state(&[(1, 100), (2, 200), (3, 50), (4, 300)]);
        fill_pages(&mut state, 512);

        let min_cell_size = state.fragments.iter().map(|f| f.cell_size).min().unwrap();
        for page in &state.pages {
            match page.free_space {
                Some(free_space) => assert!(free_space >= min_cell_size),
                None => {}
            }
        }
    }

    #[test]
    fn undo_merges_fragments_sharing_a_page() {
        let mut state = PackState::new();
        state.push_split(1);
        // Both halves are small enough to share page 1's full budget.
        state.push_fragment(1, 0, 100, 100, 1);
        state.push_fragment(2, 100, 100, 100, 1);
        fill_pages(&mut state, 4096);

        let remaining = state.fragments_of(1);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].size, 200);
        assert_eq!(remaining[0].offset, 0);
    }

    #[test]
    fn undo_merges_fragments_each_alone_on_their_page() {
        // Each fragment is too big to share a page with its sibling, so
        // both end up alone on their own page.
        let mut state = PackState::new();
        state.push_split(1);
        state.push_fragment(1, 0, 2200, 2200, 1);
        state.push_fragment(2, 2200, 2200, 2200, 1);
        fill_pages(&mut state, 4096);

        let remaining = state.fragments_of(1);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].size, 4400);
    }

    #[test]
    fn surviving_split_never_has_both_fragments_on_the_same_page() {
        let mut state = PackState::new();
        for split_id in 0..10 {
            state.push_split(split_id);
            state.push_fragment(split_id * 2 + 1, 0, 300, 300, split_id);
            state.push_fragment(split_id * 2 + 2, 300, 300, 300, split_id);
        }
        fill_pages(&mut state, 4096);

        let mut by_split: std::collections::HashMap<i64, Vec<Option<i64>>> = Default::default();
        for f in &state.fragments {
            by_split.entry(f.split_id).or_default().push(f.page_id);
        }
        for pages in by_split.values() {
            if pages.len() == 2 {
                assert_ne!(pages[0], pages[1]);
            }
        }
    }
}
