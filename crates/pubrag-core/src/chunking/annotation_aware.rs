use super::pieces::{attached, PassageView};
use super::Draft;
use crate::types::{Infons, Passage};

/// Greedy packing of units into chunks of at most `window` pieces. A unit is
/// a single piece or the run of pieces an annotation covers, so chunk
/// boundaries never fall inside an annotation. A unit larger than the window
/// becomes its own oversized chunk.
pub(crate) fn chunk(passage: &Passage, infons: Infons, window: usize) -> Vec<Draft> {
    let view = PassageView::new(passage);
    let units = units(view.len(), &view.locked_intervals(&passage.annotations));

    let mut out = Vec::new();
    let mut flush = |from: usize, to: usize| {
        let (text, start, end) = view.span(from, to);
        out.push(Draft {
            text: text.to_string(),
            offset: start,
            annotations: attached(&passage.annotations, start, end),
            infons: infons.clone(),
            oversized: to - from > window,
            annotation_type: None,
        });
    };

    let mut current: Option<(usize, usize)> = None;
    for (a, b) in units {
        current = match current {
            Some((from, to)) if (to - from) + (b - a) > window => {
                flush(from, to);
                Some((a, b))
            }
            Some((from, _)) => Some((from, b)),
            None => Some((a, b)),
        };
    }
    if let Some((from, to)) = current {
        flush(from, to);
    }
    out
}

fn units(n: usize, locked: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut locked = locked.iter().peekable();
    let mut i = 0;
    while i < n {
        match locked.peek() {
            Some(&&(a, b)) if a == i => {
                out.push((a, b));
                i = b;
                locked.next();
            }
            _ => {
                out.push((i, i + 1));
                i += 1;
            }
        }
    }
    out
}
