use pubrag_text::KeywordMatcher;

fn matcher() -> KeywordMatcher {
    KeywordMatcher::build([
        ("c1", "BRCA1 mutations increase the risk of breast cancer"),
        ("c2", "Tobacco smoke exposure and lung cancer in mice"),
        ("c3", "Gene expression profiling of HeLa cells"),
        ("c4", "Soluble IL-6 receptor signalling in human cells"),
    ])
    .expect("matcher")
}

#[test]
fn bare_terms_are_conjunctive() {
    let m = matcher();
    let hits = m.matching("cancer").unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.contains("c1") && hits.contains("c2"));

    let both = m.matching("lung cancer").unwrap();
    assert_eq!(both.into_iter().collect::<Vec<_>>(), vec!["c2".to_string()]);
}

#[test]
fn query_syntax_and_case_folding() {
    let m = matcher();
    let either = m.matching("brca1 OR hela").unwrap();
    assert_eq!(either.len(), 2);
    assert!(either.contains("c1") && either.contains("c3"));
    assert!(m.matching("\"breast cancer\"").unwrap().contains("c1"));
    assert!(m.matching("zebrafish").unwrap().is_empty());
}

#[test]
fn free_text_with_query_punctuation_still_matches() {
    let m = matcher();
    let only_c4 = vec!["c4".to_string()];
    for query in ["IL-6 receptor: signalling", "cells (human", "receptor:", "title:(("] {
        let hits = m.matching(query).unwrap_or_else(|e| panic!("{query}: {e}"));
        if query == "title:((" {
            assert!(hits.is_empty(), "no candidate mentions 'title'");
        } else {
            assert_eq!(hits.into_iter().collect::<Vec<_>>(), only_c4, "{query}");
        }
    }
}
