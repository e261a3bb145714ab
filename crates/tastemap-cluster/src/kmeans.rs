use rand::Rng;
use tastemap_schema::{Cluster, UserEmbedding};
use tracing::debug;

use crate::seed::rng_for_key;
use crate::vector::{cosine_distance, mean_vector, normalize};

pub const MIN_CLUSTERS: usize = 2;
pub const MAX_CLUSTERS: usize = 6;
pub const DEFAULT_CLUSTERS: usize = 3;
pub const REFINEMENT_ITERATIONS: usize = 8;

/// Clamp a user-requested cluster count to `[MIN_CLUSTERS, min(MAX_CLUSTERS, max(MIN_CLUSTERS, member_count))]`.
pub fn clamp_cluster_count(requested: usize, member_count: usize) -> usize {
    let upper = MAX_CLUSTERS.min(member_count.max(MIN_CLUSTERS));
    requested.max(MIN_CLUSTERS).min(upper)
}

/// Seeded k-means++ over cosine distance, followed by a capacity-bounded
/// assignment so cluster sizes differ by at most one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalancedKMeans { pub iterations: usize }

impl Default for BalancedKMeans {
    fn default() -> Self { Self { iterations: REFINEMENT_ITERATIONS } }
}

/// Shorthand for `BalancedKMeans::default().cluster(..)`.
pub fn cluster(seed_key: &str, members: &[UserEmbedding], k: usize) -> Vec<Cluster> {
    BalancedKMeans::default().cluster(seed_key, members, k)
}

impl BalancedKMeans {
    /// Always returns exactly `k` clusters (none for `k == 0`). Identical
    /// `seed_key`, members and `k` give an identical partition.
    pub fn cluster(&self, seed_key: &str, members: &[UserEmbedding], k: usize) -> Vec<Cluster> {
        let mut rng = rng_for_key(seed_key);
        self.cluster_with_rng(&mut rng, members, k)
    }

    pub fn cluster_with_rng<R: Rng + ?Sized>(&self, rng: &mut R, members: &[UserEmbedding], k: usize) -> Vec<Cluster> {
        if k == 0 { return Vec::new(); }
        if members.is_empty() { return (0..k).map(Cluster::empty).collect(); }

        let vectors: Vec<Vec<f32>> = members.iter().map(|m| normalize(&m.vector)).collect();
        let effective_k = k.min(members.len());
        let centroids = self.fit(rng, &vectors, effective_k);
        let groups = assign_balanced(&vectors, &centroids);

        let mut out: Vec<Cluster> = groups.into_iter().zip(centroids).enumerate().map(|(cluster_index, (rows, centroid))| {
            let mut picked: Vec<UserEmbedding> = rows.into_iter().map(|row| members[row].clone()).collect();
            picked.sort_by(|a, b| a.display_name.cmp(&b.display_name));
            Cluster { cluster_index, members: picked, centroid }
        }).collect();
        out.extend((effective_k..k).map(Cluster::empty));

        debug!(k, effective_k, members = members.len(), sizes = ?out.iter().map(Cluster::len).collect::<Vec<_>>(), "clustered");
        out
    }

    /// Seeded initialisation plus Lloyd refinement. Returns `k` centroids.
    pub fn fit<R: Rng + ?Sized>(&self, rng: &mut R, vectors: &[Vec<f32>], k: usize) -> Vec<Vec<f32>> {
        let mut centroids = seed_centroids(rng, vectors, k);
        for _ in 0..self.iterations {
            let groups = assign_nearest(vectors, &centroids);
            for (centroid, rows) in centroids.iter_mut().zip(&groups) {
                // an emptied cluster keeps its previous centroid
                if rows.is_empty() { continue; }
                let picked: Vec<&[f32]> = rows.iter().map(|&row| vectors[row].as_slice()).collect();
                *centroid = normalize(&mean_vector(&picked));
            }
        }
        centroids
    }
}

/// Index and distance of the closest centroid; ties go to the lower index.
fn nearest(v: &[f32], centroids: &[Vec<f32>]) -> (usize, f32) {
    let mut best = (0, cosine_distance(v, &centroids[0]));
    for (i, c) in centroids.iter().enumerate().skip(1) {
        let d = cosine_distance(v, c);
        if d < best.1 { best = (i, d); }
    }
    best
}

/// k-means++: first centroid uniform, each next one drawn with probability
/// proportional to its distance from the nearest centroid chosen so far.
fn seed_centroids<R: Rng + ?Sized>(rng: &mut R, vectors: &[Vec<f32>], k: usize) -> Vec<Vec<f32>> {
    if vectors.is_empty() || k == 0 { return Vec::new(); }
    let mut centroids = Vec::with_capacity(k);
    centroids.push(vectors[rng.gen_range(0..vectors.len())].clone());
    while centroids.len() < k {
        let distances: Vec<f32> = vectors.iter().map(|v| nearest(v, &centroids).1).collect();
        let total: f32 = distances.iter().sum();
        let target = rng.gen::<f32>() * total;
        centroids.push(vectors[pick_weighted(&distances, target)].clone());
    }
    centroids
}

/// First index whose running weight reaches `target`. Float drift can leave
/// the total just under it; that falls back to index 0.
fn pick_weighted(weights: &[f32], target: f32) -> usize {
    let mut cumulative = 0f32;
    for (i, w) in weights.iter().enumerate() {
        cumulative += w;
        if cumulative >= target { return i; }
    }
    0
}

fn assign_nearest(vectors: &[Vec<f32>], centroids: &[Vec<f32>]) -> Vec<Vec<usize>> {
    let mut groups = vec![Vec::new(); centroids.len()];
    for (row, v) in vectors.iter().enumerate() { groups[nearest(v, centroids).0].push(row); }
    groups
}

struct Preference { row: usize, ranked: Vec<usize>, margin: f32 }

/// Capacity of cluster `i` out of `k` for `total` rows: the first `total % k`
/// clusters take one extra.
pub fn capacities(total: usize, k: usize) -> Vec<usize> {
    if k == 0 { return Vec::new(); }
    let (base, remainder) = (total / k, total % k);
    (0..k).map(|i| base + usize::from(i < remainder)).collect()
}

/// Greedy balanced assignment. Rows with the widest gap between their first
/// and second choice are placed first, each into its best centroid that still
/// has room; a row with every preferred cluster full goes to the least filled
/// one (lowest index on ties).
fn assign_balanced(vectors: &[Vec<f32>], centroids: &[Vec<f32>]) -> Vec<Vec<usize>> {
    let k = centroids.len();
    let caps = capacities(vectors.len(), k);
    let mut prefs: Vec<Preference> = vectors.iter().enumerate().map(|(row, v)| {
        let mut scored: Vec<(usize, f32)> = centroids.iter().enumerate().map(|(i, c)| (i, cosine_distance(v, c))).collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        let margin = if scored.len() > 1 { scored[1].1 - scored[0].1 } else { 1.0 };
        Preference { row, ranked: scored.into_iter().map(|(i, _)| i).collect(), margin }
    }).collect();
    prefs.sort_by(|a, b| b.margin.total_cmp(&a.margin));

    let mut assigned: Vec<Vec<usize>> = vec![Vec::new(); k];
    for pref in prefs {
        let slot = pref.ranked.iter().copied().find(|&c| assigned[c].len() < caps[c])
            .unwrap_or_else(|| (0..k).min_by_key(|&c| assigned[c].len()).unwrap_or(0));
        assigned[slot].push(pref.row);
    }
    assigned
}
