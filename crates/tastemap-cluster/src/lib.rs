//! Client-side taste-map numerics: cosine primitives, the radial similarity
//! layout, and seeded balanced k-means over member embeddings.
//!
//! Everything here is pure and synchronous. Degenerate input (empty or
//! mismatched vectors, empty member lists, `k` above the member count) produces
//! fallback values rather than errors.

pub mod kmeans;
pub mod layout;
pub mod seed;
pub mod vector;

pub use kmeans::{clamp_cluster_count, cluster, BalancedKMeans, DEFAULT_CLUSTERS, MAX_CLUSTERS, MIN_CLUSTERS};
pub use layout::{compute_node_positions, node_visual_size, similarity_to_pixel_distance, ColorTier, ForceLayout, LayoutBounds};
pub use vector::{cosine_distance, cosine_similarity, mean_vector, normalize};
