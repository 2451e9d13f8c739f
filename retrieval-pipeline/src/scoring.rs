pub fn clamp_unit(value: f32) -> f32 {
    value.max(0.0).min(1.0)
}

/// Cosine similarity clamped to [0, 1]. The chunk index ranks candidates with
/// `DIST COSINE`; this recomputes the score for the returned rows so the
/// threshold filter and the citations work from the same number. Degenerate
/// input (zero-length, mismatched lengths, zero norm) scores 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }

    clamp_unit(dot / denom)
}
