use std::collections::HashSet;

use super::pieces::{attached, PassageView};
use super::Draft;
use crate::types::{Infons, Passage};

/// Fixed windows of `window` pieces advancing by half a window. The last
/// window always ends at the passage end, so every character is covered.
/// A window edge falling inside an annotation moves outward to the
/// annotation's edge; a window that grows past `window` is `oversized`.
pub(crate) fn chunk(passage: &Passage, infons: Infons, window: usize) -> Vec<Draft> {
    let view = PassageView::new(passage);
    let n = view.len();
    let locked = view.locked_intervals(&passage.annotations);
    let stride = (window / 2).max(1);
    let mut spans: HashSet<(usize, usize)> = HashSet::new();
    let mut out = Vec::new();
    let mut start = 0;
    while start < n {
        let from = snap(start, &locked, |(a, _)| a);
        let to = snap((start + window).min(n), &locked, |(_, b)| b);
        if spans.insert((from, to)) {
            let (text, char_start, char_end) = view.span(from, to);
            out.push(Draft {
                text: text.to_string(),
                offset: char_start,
                annotations: attached(&passage.annotations, char_start, char_end),
                infons: infons.clone(),
                oversized: to - from > window,
                annotation_type: None,
            });
        }
        if to >= n {
            break;
        }
        start += stride;
    }
    out
}

/// Moves a boundary strictly inside a locked interval to one of its edges.
fn snap(i: usize, locked: &[(usize, usize)], edge: fn((usize, usize)) -> usize) -> usize {
    locked.iter().find(|&&(a, b)| a < i && i < b).map_or(i, |&interval| edge(interval))
}
