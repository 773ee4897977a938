//! Vector index backends for chunk embeddings: LanceDB on disk and an
//! in-memory map, both behind [`pubrag_core::VectorIndex`].

use std::collections::HashMap;

use pubrag_core::DistinctValue;

pub mod convert;
pub mod lance;
pub mod memory;
pub mod schema;
pub mod sql;
pub mod table;

pub use lance::LanceIndex;
pub use memory::MemoryIndex;

/// Most frequent first, ties by value.
pub(crate) fn sorted_distinct(counts: HashMap<String, usize>) -> Vec<DistinctValue> {
    let mut values: Vec<DistinctValue> =
        counts.into_iter().map(|(value, count)| DistinctValue { value, count }).collect();
    values.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    values
}
