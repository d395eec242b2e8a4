//! P4 -- Ordering: assign `final_id` to every split and page so that the
//! head and tail of a split land close together in the final rowid
//! space, and pages are written sequentially.
//!
//! Splits and pages are the two vertex sets of a bipartite graph with
//! fragments as edges. A breadth-first traversal of each connected
//! component hands out final ids in discovery order: seed on an
//! unassigned split, alternate expanding to reachable pages and back to
//! reachable splits until the component is exhausted, then seed the next
//! component. Within a layer, ids are handed out in increasing original-id
//! order, so the whole traversal is deterministic.

use std::collections::{HashMap, VecDeque};

use crate::state::PackState;

pub fn order(state: &mut PackState) {
    eprintln!("Ordering pages...");

    let mut split_to_pages: HashMap<i64, Vec<i64>> = HashMap::new();
    let mut page_to_splits: HashMap<i64, Vec<i64>> = HashMap::new();
    for f in &state.fragments {
        if let Some(page_id) = f.page_id {
            split_to_pages.entry(f.split_id).or_default().push(page_id);
            page_to_splits.entry(page_id).or_default().push(f.split_id);
        }
    }
    for v in split_to_pages.values_mut() {
        v.sort_unstable();
        v.dedup();
    }
    for v in page_to_splits.values_mut() {
        v.sort_unstable();
        v.dedup();
    }

    let mut split_final: HashMap<i64, i64> = HashMap::new();
    let mut page_final: HashMap<i64, i64> = HashMap::new();
    let mut next_split_id: i64 = 1;
    let mut next_page_id: i64 = 1;

    let mut all_split_ids: Vec<i64> = state.splits.iter().map(|s| s.split_id).collect();
    all_split_ids.sort_unstable();

    for &seed in &all_split_ids {
        if split_final.contains_key(&seed) {
            continue;
        }

        let mut split_queue: VecDeque<i64> = VecDeque::new();
        split_final.insert(seed, next_split_id);
        next_split_id += 1;
        split_queue.push_back(seed);

        loop {
            let mut page_frontier: Vec<i64> = Vec::new();
            while let Some(split_id) = split_queue.pop_front() {
                if let Some(pages) = split_to_pages.get(&split_id) {
                    for &page_id in pages {
                        if !page_final.contains_key(&page_id) {
                            page_frontier.push(page_id);
                        }
                    }
                }
            }
            page_frontier.sort_unstable();
            page_frontier.dedup();
            if page_frontier.is_empty() {
                break;
            }
            for &page_id in &page_frontier {
                page_final.entry(page_id).or_insert_with(|| {
                    let id = next_page_id;
                    next_page_id += 1;
                    id
                });
            }

            let mut split_frontier: Vec<i64> = Vec::new();
            for &page_id in &page_frontier {
                if let Some(splits) = page_to_splits.get(&page_id) {
                    for &split_id in splits {
                        if !split_final.contains_key(&split_id) {
                            split_frontier.push(split_id);
                        }
                    }
                }
            }
            split_frontier.sort_unstable();
            split_frontier.dedup();
            if split_frontier.is_empty() {
                break;
            }
            for &split_id in &split_frontier {
                split_final.entry(split_id).or_insert_with(|| {
                    let id = next_split_id;
                    next_split_id += 1;
                    id
                });
                split_queue.push_back(split_id);
            }
        }
    }

    for split in &mut state.splits {
        split.final_id = split_final.get(&split.split_id).copied();
    }
    for page in &mut state.pages {
        page.final_id = page_final.get(&page.page_id).copied();
    }
    log::debug!(
        "{} splits, {} pages assigned final ids",
        split_final.len(),
        page_final.len()
    );

    eprintln!("Ordering fragments...");

    // Fragments are ordered by (final page id, position-within-page),
    // where position-within-page is the fragment's original assignment
    // order -- any deterministic rule suffices, what matters is that rows
    // sharing a leaf page are written contiguously.
    let mut frag_order: Vec<usize> = (0..state.fragments.len()).collect();
    frag_order.sort_by_key(|&idx| {
        let f = &state.fragments[idx];
        let page_final_id = f
            .page_id
            .and_then(|p| page_final.get(&p))
            .copied()
            .unwrap_or(i64::MAX);
        (page_final_id, f.frag_id)
    });
    for (final_id, idx) in frag_order.into_iter().enumerate() {
        state.fragments[idx].final_id = Some(final_id as i64 + 1);
    }
}
