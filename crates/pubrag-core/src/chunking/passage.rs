use super::Draft;
use crate::types::{Infons, Passage};

pub(crate) fn chunk(passage: &Passage, infons: Infons) -> Vec<Draft> {
    if passage.text.is_empty() {
        return Vec::new();
    }
    vec![Draft {
        text: passage.text.clone(),
        offset: passage.offset,
        annotations: passage.annotations.clone(),
        infons,
        oversized: false,
        annotation_type: None,
    }]
}
