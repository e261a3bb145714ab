use serde::{Deserialize, Serialize};

/// Activity label used when the platform omits one.
pub const DEFAULT_ACTIVITY_STATUS: &str = "active";
/// Icon used for a materialized subgroup when neither caller nor parent provides one.
pub const DEFAULT_GROUP_ICON: &str = "users";

pub type EmbeddingVector = Vec<f32>;

fn default_activity() -> String { DEFAULT_ACTIVITY_STATUS.to_string() }
fn default_true() -> bool { true }

/// One member's taste vector plus the profile fields a renderer needs.
/// Field names follow the platform's camelCase embedding payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEmbedding {
    pub user_id: String,
    #[serde(rename = "userName")]
    pub display_name: String,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(rename = "embeddingVector")]
    pub vector: EmbeddingVector,
    #[serde(default = "default_activity")]
    pub activity_status: String,
}

impl UserEmbedding {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>, vector: EmbeddingVector) -> Self {
        Self { user_id: user_id.into(), display_name: display_name.into(), profile_image_url: None, vector, activity_status: default_activity() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point { pub x: f32, pub y: f32 }

impl Point {
    pub const fn new(x: f32, y: f32) -> Self { Self { x, y } }
    pub fn distance_to(&self, other: &Point) -> f32 { ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt() }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNodePosition {
    pub user_id: String,
    pub x: f32,
    pub y: f32,
    pub distance_from_focal: f32,
    pub similarity_to_focal: f32,
}

impl GraphNodePosition {
    pub fn point(&self) -> Point { Point::new(self.x, self.y) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub cluster_index: usize,
    pub members: Vec<UserEmbedding>,
    pub centroid: EmbeddingVector,
}

impl Cluster {
    pub fn empty(cluster_index: usize) -> Self { Self { cluster_index, members: Vec::new(), centroid: Vec::new() } }
    pub fn len(&self) -> usize { self.members.len() }
    pub fn is_empty(&self) -> bool { self.members.is_empty() }
    pub fn member_ids(&self) -> impl Iterator<Item = &str> { self.members.iter().map(|m| m.user_id.as_str()) }
}

/// Radial graph around the focal user. `embeddings` keeps the focal user first,
/// then every other member in provider order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipGraph {
    pub group_id: String,
    pub focal_user_id: String,
    pub focal_node: GraphNodePosition,
    pub other_nodes: Vec<GraphNodePosition>,
    pub embeddings: Vec<UserEmbedding>,
}

impl RelationshipGraph {
    pub fn embedding(&self, user_id: &str) -> Option<&UserEmbedding> { self.embeddings.iter().find(|e| e.user_id == user_id) }
    pub fn node(&self, user_id: &str) -> Option<&GraphNodePosition> {
        if self.focal_node.user_id == user_id { return Some(&self.focal_node); }
        self.other_nodes.iter().find(|n| n.user_id == user_id)
    }
}

/// `GET /api/groups/{group_id}/embeddings?current_user_id=...` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupEmbeddings {
    pub group_id: String,
    pub current_user_id: String,
    pub current_user_embedding: UserEmbedding,
    #[serde(default)]
    pub other_user_embeddings: Vec<UserEmbedding>,
}

impl GroupEmbeddings {
    /// Focal user first, then the others in payload order.
    pub fn all_members(&self) -> Vec<UserEmbedding> {
        std::iter::once(self.current_user_embedding.clone()).chain(self.other_user_embeddings.iter().cloned()).collect()
    }
}

/// `GET /api/groups/{group_id}/detail` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon_type: Option<String>,
    #[serde(default)]
    pub member_count: u32,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default)]
    pub created_by_user_id: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub region: Option<String>,
}

/// `POST /api/groups` request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGroup {
    pub name: String,
    pub creator_id: String,
    pub description: Option<String>,
    pub icon_type: String,
    pub tags: Vec<String>,
    pub region: Option<String>,
    pub image_url: Option<String>,
    pub is_public: bool,
}

/// `POST /api/groups` response body; only the id is load-bearing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedGroup {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub creator_id: String,
    #[serde(default)]
    pub member_ids: Vec<String>,
}

/// `POST /api/groups/{group_id}/members` request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddMember { pub user_id: String }
