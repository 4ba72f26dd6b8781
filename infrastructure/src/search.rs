use domain::models::ScoredChunk;

pub struct SearchEngine;

impl SearchEngine {
    /// Cosine similarity; zero when either vector has no magnitude.
    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot_product / (norm_a * norm_b)
    }

    /// Best `top_k` candidates by descending score. Ties keep candidate order.
    pub fn top_k(mut candidates: Vec<ScoredChunk>, top_k: usize) -> Vec<ScoredChunk> {
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates.truncate(top_k);
        candidates
    }
}
