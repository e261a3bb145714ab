//! Cosine primitives over plain `f32` slices. Every function returns a new
//! value; inputs are never scaled in place.

/// Cosine similarity in `[-1, 1]`.
///
/// Empty vectors, vectors of different lengths and zero-norm vectors all yield
/// `0.0`. A length mismatch is not compared on the shared prefix.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() { return 0.0; }
    let (mut dot, mut norm_a, mut norm_b) = (0f64, 0f64, 0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 { return 0.0; }
    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

/// `1 - cosine_similarity`; degenerate inputs map to `1.0`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 { 1.0 - cosine_similarity(a, b) }

pub fn norm(v: &[f32]) -> f32 { v.iter().map(|x| x * x).sum::<f32>().sqrt() }

/// Unit-length copy of `v`. A zero vector comes back unchanged so it stays
/// recognisable downstream (its similarity to anything remains 0).
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let n = norm(v);
    if n == 0.0 { return v.to_vec(); }
    v.iter().map(|x| x / n).collect()
}

/// Element-wise average. The dimension is taken from the first vector;
/// an empty input gives an empty result.
pub fn mean_vector<V: AsRef<[f32]>>(vectors: &[V]) -> Vec<f32> {
    let Some(first) = vectors.first() else { return Vec::new(); };
    let mut acc = vec![0f32; first.as_ref().len()];
    for v in vectors {
        for (slot, x) in acc.iter_mut().zip(v.as_ref()) { *slot += *x; }
    }
    let count = vectors.len() as f32;
    acc.into_iter().map(|x| x / count).collect()
}
