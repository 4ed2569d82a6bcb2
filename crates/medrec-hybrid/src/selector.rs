use medrec_core::types::{RecordIndex, ScoredIndex};

/// Every index except `query`, by descending score. Ties keep index order.
///
/// The query is removed by identity, not by assuming it sorts first: identical
/// rows tie at the maximum and may precede it.
pub fn rank(scores: &[f64], query: RecordIndex) -> Vec<ScoredIndex> {
    let mut ranked: Vec<ScoredIndex> = scores
        .iter()
        .enumerate()
        .filter(|&(index, _)| index != query)
        .map(|(index, &score)| ScoredIndex { index, score })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

/// At most `top_n` entries of `rank` whose index passes `keep`. Fewer when the
/// corpus is smaller; never padded.
pub fn select<F>(scores: &[f64], query: RecordIndex, top_n: usize, keep: F) -> Vec<ScoredIndex>
where
    F: Fn(RecordIndex) -> bool,
{
    rank(scores, query).into_iter().filter(|s| keep(s.index)).take(top_n).collect()
}
