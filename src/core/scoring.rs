use crate::models::Asset;

/// Points for having the largest file among the candidates.
pub const SIZE_WEIGHT: u32 = 2;
/// Points for having the largest pixel area; always outweighs size.
pub const AREA_WEIGHT: u32 = 8;

/// Picks the copy to keep among several copies stored in the same location.
pub struct QualityScorer;

impl QualityScorer {
    /// Score every candidate, in input order. Ties on a maximum all earn its points.
    pub fn score_copies(candidates: &[&Asset]) -> Vec<u32> {
        let max_size = candidates.iter().map(|a| a.quality.size).max().unwrap_or(0);
        let max_area = candidates.iter().map(|a| a.quality.area()).max().unwrap_or(0);

        candidates
            .iter()
            .map(|asset| {
                let mut score = 0;
                if asset.quality.size == max_size {
                    score += SIZE_WEIGHT;
                }
                if asset.quality.area() == max_area {
                    score += AREA_WEIGHT;
                }
                score
            })
            .collect()
    }

    /// The keeper among `candidates`; `None` only when there are no candidates.
    ///
    /// Among the top scorers a visible copy wins, otherwise the first in input order.
    pub fn best_copy<'a>(candidates: &[&'a Asset]) -> Option<&'a Asset> {
        let scores = Self::score_copies(candidates);
        let top = scores.iter().copied().max()?;

        let mut top_scorers = candidates
            .iter()
            .zip(&scores)
            .filter(|(_, score)| **score == top)
            .map(|(asset, _)| *asset);

        let first = top_scorers.next()?;
        if first.is_visible() {
            return Some(first);
        }
        Some(top_scorers.find(|asset| asset.is_visible()).unwrap_or(first))
    }
}
