use pubrag_core::{ArticleResults, GroupingMode, SearchResult};

/// Cap results at `top_k` chunks per article and `top_n` articles.
///
/// `EarlyExit` walks candidates in the order the index returned them and
/// stops as soon as the `top_n`-th article is admitted, so later chunks of
/// already admitted articles are dropped. `GlobalSort` ranks every candidate
/// first and keeps filling admitted articles up to `top_k`.
pub fn group_by_article(
    mut candidates: Vec<SearchResult>,
    top_k: usize,
    top_n: usize,
    mode: GroupingMode,
) -> Vec<ArticleResults> {
    if top_k == 0 || top_n == 0 {
        return Vec::new();
    }
    if mode == GroupingMode::GlobalSort {
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.chunk_id.cmp(&b.chunk_id)));
    }

    let mut groups: Vec<ArticleResults> = Vec::new();
    for candidate in candidates {
        let article_id = candidate.payload.article_id.clone();
        match groups.iter_mut().find(|g| g.article_id == article_id) {
            Some(group) => {
                if group.chunks.len() < top_k {
                    group.chunks.push(candidate);
                }
            }
            None if groups.len() < top_n => {
                groups.push(ArticleResults { article_id, chunks: vec![candidate] });
            }
            None => {}
        }
        if mode == GroupingMode::EarlyExit && groups.len() >= top_n {
            break;
        }
    }

    for group in &mut groups {
        group.chunks.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.chunk_id.cmp(&b.chunk_id)));
    }
    groups
}
