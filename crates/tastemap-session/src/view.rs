use serde::Serialize;
use tastemap_schema::{RelationshipGraph, UserEmbedding};

use crate::controller::{default_cluster_label, ClusterSession};
use crate::graph::NodeStyle;

#[derive(Debug, Clone, Serialize)]
pub struct ClusterView {
    pub index: usize,
    pub label: String,
    pub members: Vec<UserEmbedding>,
}

/// What the rendering layer receives: positions, styling hints and the partition.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub group_id: String,
    pub focal_user_id: String,
    pub cluster_count: usize,
    pub seed: u64,
    pub graph: RelationshipGraph,
    pub styles: Vec<NodeStyle>,
    pub clusters: Vec<ClusterView>,
}

impl SessionView {
    pub fn new(session: ClusterSession, labels: &[String]) -> Self {
        let styles = session.graph.other_nodes.iter().map(NodeStyle::for_node).collect();
        let clusters = session.clusters.into_iter().map(|c| ClusterView {
            index: c.cluster_index,
            label: labels.get(c.cluster_index).cloned().unwrap_or_else(|| default_cluster_label(c.cluster_index)),
            members: c.members,
        }).collect();
        Self { group_id: session.group_id, focal_user_id: session.focal_user_id, cluster_count: session.cluster_count, seed: session.seed, graph: session.graph, styles, clusters }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::controller::{ClusterSessionController, Collaborators};
    use crate::testing::FakeBackend;
    use std::sync::Arc;

    #[tokio::test]
    async fn view_carries_labels_and_styles() {
        let ctl = ClusterSessionController::new(SessionConfig::default(), Collaborators::shared(Arc::new(FakeBackend::with_members(7))));
        let session = ctl.load("g1", "u0").await.unwrap();
        ctl.rename_cluster(0, "Early birds").await.unwrap();
        let view = SessionView::new(session, &ctl.cluster_labels().await);
        assert_eq!(view.styles.len(), 6);
        assert_eq!(view.clusters[0].label, "Early birds");
        assert_eq!(view.clusters[2].label, "Subgroup 3");
        let json = serde_json::to_value(&view).unwrap();
        assert!(json["graph"]["otherNodes"].is_array());
        assert!(json["styles"][0]["color"].is_string());
    }
}
