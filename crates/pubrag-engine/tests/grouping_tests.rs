use pubrag_core::{ChunkPayload, GroupingMode, SearchResult};
use pubrag_engine::{candidate_limit, fuzzy_score, group_by_article};

fn hit(article: &str, n: u32, score: f32) -> SearchResult {
    let chunk_id = format!("{article}-{n}");
    SearchResult {
        chunk_id: chunk_id.clone(),
        score,
        payload: ChunkPayload { chunk_id, article_id: article.into(), ..Default::default() },
    }
}

/// Index order for five articles with three chunks each, best first.
fn ranked() -> Vec<SearchResult> {
    vec![
        hit("A", 1, 0.99),
        hit("B", 1, 0.98),
        hit("C", 1, 0.97),
        hit("D", 1, 0.96),
        hit("A", 2, 0.95),
        hit("D", 2, 0.94),
        hit("D", 3, 0.93),
        hit("B", 2, 0.90),
        hit("B", 3, 0.85),
        hit("E", 1, 0.80),
        hit("C", 2, 0.50),
        hit("A", 3, 0.45),
    ]
}

fn ids(results: &[pubrag_core::ArticleResults]) -> Vec<(String, Vec<String>)> {
    results
        .iter()
        .map(|a| (a.article_id.clone(), a.chunks.iter().map(|c| c.chunk_id.clone()).collect()))
        .collect()
}

#[test]
fn early_exit_stops_at_the_last_admitted_article() {
    let grouped = group_by_article(ranked(), 2, 3, GroupingMode::EarlyExit);
    assert_eq!(
        ids(&grouped),
        vec![
            ("A".into(), vec!["A-1".into()]),
            ("B".into(), vec!["B-1".into()]),
            ("C".into(), vec!["C-1".into()]),
        ]
    );
}

#[test]
fn global_sort_fills_admitted_articles() {
    let grouped = group_by_article(ranked(), 2, 3, GroupingMode::GlobalSort);
    assert_eq!(
        ids(&grouped),
        vec![
            ("A".into(), vec!["A-1".into(), "A-2".into()]),
            ("B".into(), vec!["B-1".into(), "B-2".into()]),
            ("C".into(), vec!["C-1".into(), "C-2".into()]),
        ]
    );
}

#[test]
fn global_sort_ranks_unordered_candidates() {
    let mut shuffled = ranked();
    shuffled.reverse();
    let grouped = group_by_article(shuffled, 2, 3, GroupingMode::GlobalSort);
    assert_eq!(grouped[0].article_id, "A");
    assert_eq!(grouped[0].chunks[0].chunk_id, "A-1");

    // Early exit keeps arrival order for admission, but chunks are still ranked.
    let mut shuffled = ranked();
    shuffled.reverse();
    let grouped = group_by_article(shuffled, 2, 3, GroupingMode::EarlyExit);
    assert_eq!(grouped.iter().map(|a| a.article_id.as_str()).collect::<Vec<_>>(), ["A", "C", "E"]);
    for article in &grouped {
        assert!(article.chunks.windows(2).all(|w| w[0].score >= w[1].score));
    }
}

#[test]
fn caps_hold_for_both_modes() {
    for mode in [GroupingMode::EarlyExit, GroupingMode::GlobalSort] {
        let grouped = group_by_article(ranked(), 2, 3, mode);
        assert!(grouped.len() <= 3);
        assert!(grouped.iter().all(|a| !a.chunks.is_empty() && a.chunks.len() <= 2));
    }
    assert!(group_by_article(Vec::new(), 2, 3, GroupingMode::GlobalSort).is_empty());
    assert_eq!(group_by_article(ranked(), 5, 10, GroupingMode::GlobalSort).len(), 5, "fewer articles is fine");
}

#[test]
fn oversample_covers_every_requested_article() {
    assert_eq!(candidate_limit(2, 3), 12);
    assert_eq!(candidate_limit(5, 1), 10);
}

#[test]
fn fuzzy_scores() {
    assert!((fuzzy_score("Breast Cancer", "BRCA1 and breast cancer risk") - 100.0).abs() < f64::EPSILON);
    assert!(fuzzy_score("Jon Smith", "John Smith") >= 70.0);
    assert!(fuzzy_score("tobacco smoke", "Gene expression in HeLa cells") < 70.0);
}
