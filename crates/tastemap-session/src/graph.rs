use serde::Serialize;
use tastemap_cluster::{compute_node_positions, node_visual_size, ColorTier};
use tastemap_schema::{GraphNodePosition, GroupEmbeddings, RelationshipGraph};

use crate::config::{LayoutMode, SessionConfig};

/// Focal node at the canvas center, everyone else placed by similarity.
pub fn build_relationship_graph(group_id: &str, focal_user_id: &str, embeddings: &GroupEmbeddings, config: &SessionConfig) -> RelationshipGraph {
    let focal = &embeddings.current_user_embedding;
    let others = &embeddings.other_user_embeddings;
    let other_nodes = match &config.layout {
        LayoutMode::Radial => compute_node_positions(&focal.vector, others, config.center, config.max_distance),
        LayoutMode::Force(force) => force.layout(&focal.vector, others, config.center, config.max_distance),
    };
    RelationshipGraph {
        group_id: group_id.to_string(),
        focal_user_id: focal_user_id.to_string(),
        focal_node: GraphNodePosition { user_id: focal_user_id.to_string(), x: config.center.x, y: config.center.y, distance_from_focal: 0.0, similarity_to_focal: 1.0 },
        other_nodes,
        embeddings: embeddings.all_members(),
    }
}

/// Presentation hints for one node.
#[derive(Debug, Clone, Serialize)]
pub struct NodeStyle {
    pub user_id: String,
    pub size: f32,
    pub tier: ColorTier,
    pub color: &'static str,
}

impl NodeStyle {
    pub fn for_node(node: &GraphNodePosition) -> Self {
        // negative cosine would shrink the node below the minimum size
        let similarity = node.similarity_to_focal.clamp(0.0, 1.0);
        let tier = ColorTier::for_similarity(similarity);
        Self { user_id: node.user_id.clone(), size: node_visual_size(similarity), tier, color: tier.hex() }
    }
}
