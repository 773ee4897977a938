use std::collections::HashSet;

use super::pieces::{attached, PassageView};
use super::Draft;
use crate::types::{Annotation, Infons, Passage};

/// Sliding windows whose edges snap outward out of annotation spans. Each
/// window yields one chunk per annotation type it carries, or one plain chunk
/// when it carries none. Identical (text, type) pairs are emitted once.
pub(crate) fn chunk(passage: &Passage, infons: Infons, window: usize) -> Vec<Draft> {
    let view = PassageView::new(passage);
    let n = view.len();
    let locked = view.locked_intervals(&passage.annotations);
    let stride = (window / 2).max(1);

    let mut seen: HashSet<(String, Option<String>)> = HashSet::new();
    let mut out = Vec::new();
    let mut start = 0;
    while start < n {
        let from = snap_back(start, &locked);
        let to = snap_forward((start + window).min(n), &locked);
        let (text, char_start, char_end) = view.span(from, to);
        let oversized = to - from > window;
        let annotations = attached(&passage.annotations, char_start, char_end);

        if annotations.is_empty() {
            if seen.insert((text.to_string(), None)) {
                out.push(Draft {
                    text: text.to_string(),
                    offset: char_start,
                    annotations,
                    infons: infons.clone(),
                    oversized,
                    annotation_type: None,
                });
            }
        } else {
            for (kind, group) in by_type(annotations) {
                if !seen.insert((text.to_string(), Some(kind.clone()))) {
                    continue;
                }
                out.push(Draft {
                    text: text.to_string(),
                    offset: char_start,
                    annotations: group,
                    infons: infons.clone(),
                    oversized,
                    annotation_type: Some(kind),
                });
            }
        }

        if to >= n {
            break;
        }
        start += stride;
    }
    out
}

fn snap_back(i: usize, locked: &[(usize, usize)]) -> usize {
    locked.iter().find(|&&(a, b)| a < i && i < b).map_or(i, |&(a, _)| a)
}

fn snap_forward(i: usize, locked: &[(usize, usize)]) -> usize {
    locked.iter().find(|&&(a, b)| a < i && i < b).map_or(i, |&(_, b)| b)
}

/// Groups annotations by type, types in order of first occurrence.
fn by_type(annotations: Vec<Annotation>) -> Vec<(String, Vec<Annotation>)> {
    let mut groups: Vec<(String, Vec<Annotation>)> = Vec::new();
    for annotation in annotations {
        match groups.iter_mut().find(|(kind, _)| *kind == annotation.entity_type) {
            Some((_, group)) => group.push(annotation),
            None => groups.push((annotation.entity_type.clone(), vec![annotation])),
        }
    }
    groups
}
