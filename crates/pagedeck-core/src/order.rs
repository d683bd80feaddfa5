//! Client-side page ordering and selection model.
//!
//! Pure functions over an order vector (positions hold original 0-based
//! page indices) and a selection set. The document itself is untouched
//! until the order is committed through [`crate::extract::reorder_pages`].

use std::collections::BTreeSet;

/// Identity order for a document of `page_count` pages.
pub fn initialize_order(page_count: usize) -> Vec<usize> {
    (0..page_count).collect()
}

/// Move the item at `from` so it lands at `to`, shifting the items in
/// between. Out-of-range positions and `from == to` return the order
/// unchanged.
pub fn move_item(order: &[usize], from: usize, to: usize) -> Vec<usize> {
    let mut next = order.to_vec();
    if from == to || from >= next.len() || to >= next.len() {
        return next;
    }
    let item = next.remove(from);
    next.insert(to, item);
    next
}

/// Toggle the page's membership in the selection.
pub fn toggle_selection(selection: &mut BTreeSet<usize>, index: usize) {
    if !selection.insert(index) {
        selection.remove(&index);
    }
}

pub fn reset_order(page_count: usize) -> Vec<usize> {
    initialize_order(page_count)
}

pub fn reset_selection(selection: &mut BTreeSet<usize>) {
    selection.clear();
}
