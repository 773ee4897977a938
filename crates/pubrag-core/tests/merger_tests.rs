use pubrag_core::merger::merge;
use pubrag_core::{Annotation, MergeStrategy};

fn tobacco() -> Annotation {
    Annotation::new("tobacco", "Species", "NCBI Taxonomy", "4097", 0, 7)
}

const BLOCK: &str = "Text - tobacco\nType - Species\nNCBI Taxonomy - 4097";

#[test]
fn append_dedups_identical_annotations() {
    let text = "tobacco smoke exposure";
    let merged = merge(text, &[tobacco(), tobacco()], MergeStrategy::Append);
    assert_eq!(merged.matches(BLOCK).count(), 1);
    assert_eq!(merged, format!("{text}\n\nAnnotations:\n{BLOCK}"));
}

#[test]
fn duplicates_merge_like_the_deduplicated_list() {
    let gene = Annotation::new("TP53", "Gene", "NCBI Gene", "7157", 20, 4);
    let text = "tobacco exposure and TP53 status";
    for strategy in [MergeStrategy::Append, MergeStrategy::Prepend, MergeStrategy::Inline, MergeStrategy::FullText] {
        let with_dups = merge(text, &[tobacco(), gene.clone(), tobacco(), gene.clone()], strategy);
        let distinct = merge(text, &[tobacco(), gene.clone()], strategy);
        assert_eq!(with_dups, distinct, "{strategy}");
    }
}

#[test]
fn append_without_annotations_is_identity() {
    assert_eq!(merge("plain", &[], MergeStrategy::Append), "plain");
    assert_eq!(merge("plain", &[tobacco()], MergeStrategy::FullText), "plain");
}

#[test]
fn prepend_layout() {
    assert_eq!(merge("body", &[], MergeStrategy::Prepend), "Chunk Text:\nbody");
    assert_eq!(
        merge("body", &[tobacco()], MergeStrategy::Prepend),
        format!("Annotations:\n{BLOCK}\nChunk Text:\nbody")
    );
}

#[test]
fn inline_marks_whole_words_once() {
    let merged = merge("tobacco and tobaccos", &[tobacco()], MergeStrategy::Inline);
    assert_eq!(
        merged,
        "tobacco << Type-Species, NCBI Taxonomy-4097 >> and tobaccos"
    );
}

#[test]
fn inline_prefers_longest_match_and_never_rescans_markup() {
    let short = Annotation::new("BRCA", "Gene", "NCBI Gene", "1", 0, 4);
    let long = Annotation::new("BRCA1 gene", "Gene", "NCBI Gene", "672", 0, 10);
    // "Gene" inside the inserted marker must not be touched.
    let gene_word = Annotation::new("Gene", "Other", "Identifier", "x", 0, 4);
    let merged = merge(
        "BRCA1 gene and BRCA loci",
        &[short, long, gene_word],
        MergeStrategy::Inline,
    );
    assert_eq!(
        merged,
        "BRCA1 gene << Type-Gene, NCBI Gene-672 >> and BRCA << Type-Gene, NCBI Gene-1 >> loci"
    );
}

#[test]
fn merge_chunk_carries_strategy() {
    let chunk = pubrag_core::Chunk {
        sequence: 1,
        text: "tobacco leaves".into(),
        offset: 0,
        annotations: vec![tobacco()],
        infons: Default::default(),
        strategy: Default::default(),
        oversized: false,
        annotation_type: None,
    };
    let merged = MergeStrategy::FullText.merge_chunk(chunk);
    assert_eq!(merged.merged_text, "tobacco leaves");
    assert_eq!(merged.merger, MergeStrategy::FullText);
    assert_eq!("full_text".parse::<MergeStrategy>().unwrap(), MergeStrategy::FullText);
    assert!("nope".parse::<MergeStrategy>().is_err());
}
