use crate::types::{Annotation, Passage};

#[derive(Debug, Clone, Copy)]
pub(crate) struct Piece {
    byte_start: usize,
    byte_end: usize,
    /// Document-absolute character offset.
    pub start: usize,
    pub len: usize,
}

impl Piece {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// A passage split into alternating word and whitespace pieces.
pub(crate) struct PassageView<'a> {
    text: &'a str,
    pub pieces: Vec<Piece>,
}

impl<'a> PassageView<'a> {
    pub fn new(passage: &'a Passage) -> Self {
        let text = passage.text.as_str();
        let mut pieces: Vec<Piece> = Vec::new();
        let mut chars = passage.offset;
        let mut current: Option<(bool, Piece)> = None;
        for (byte, c) in text.char_indices() {
            let ws = c.is_whitespace();
            match current.as_mut() {
                Some((kind, piece)) if *kind == ws => {
                    piece.byte_end = byte + c.len_utf8();
                    piece.len += 1;
                }
                _ => {
                    if let Some((_, done)) = current.take() {
                        pieces.push(done);
                    }
                    current = Some((
                        ws,
                        Piece { byte_start: byte, byte_end: byte + c.len_utf8(), start: chars, len: 1 },
                    ));
                }
            }
            chars += 1;
        }
        if let Some((_, done)) = current {
            pieces.push(done);
        }
        Self { text, pieces }
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    /// Text and character range of pieces `[from, to)`.
    pub fn span(&self, from: usize, to: usize) -> (&'a str, usize, usize) {
        let first = self.pieces[from];
        let last = self.pieces[to - 1];
        (&self.text[first.byte_start..last.byte_end], first.start, last.end())
    }

    /// Merged piece-index intervals `[a, b)` that must not be split because
    /// an annotation spans them.
    pub fn locked_intervals(&self, annotations: &[Annotation]) -> Vec<(usize, usize)> {
        let mut intervals: Vec<(usize, usize)> = annotations
            .iter()
            .filter(|a| a.length > 0)
            .filter_map(|a| {
                let first = self.pieces.iter().position(|p| p.end() > a.offset)?;
                let last = self.pieces.iter().rposition(|p| p.start < a.end())?;
                (first <= last).then_some((first, last + 1))
            })
            .collect();
        intervals.sort_unstable();
        let mut merged: Vec<(usize, usize)> = Vec::with_capacity(intervals.len());
        for (a, b) in intervals {
            match merged.last_mut() {
                Some(prev) if a < prev.1 => prev.1 = prev.1.max(b),
                _ => merged.push((a, b)),
            }
        }
        merged
    }
}

/// Annotations overlapping `[start, end)`, copied by value.
pub(crate) fn attached(annotations: &[Annotation], start: usize, end: usize) -> Vec<Annotation> {
    annotations.iter().filter(|a| a.intersects(start, end)).cloned().collect()
}
