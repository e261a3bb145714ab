use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tastemap_cluster::{clamp_cluster_count, seed::seed_for_key, BalancedKMeans, MAX_CLUSTERS, MIN_CLUSTERS};
use tastemap_schema::{Cluster, Group, NewGroup, RelationshipGraph, UserEmbedding, DEFAULT_GROUP_ICON};
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn, Instrument};

use crate::backend::{EmbeddingProvider, GroupService, MembershipService};
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::graph::build_relationship_graph;

/// The external services a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub embeddings: Arc<dyn EmbeddingProvider>,
    pub groups: Arc<dyn GroupService>,
    pub members: Arc<dyn MembershipService>,
}

impl Collaborators {
    /// One backend serving all three roles.
    pub fn shared<B: EmbeddingProvider + GroupService + MembershipService + 'static>(backend: Arc<B>) -> Self {
        Self { embeddings: backend.clone(), groups: backend.clone(), members: backend }
    }
}

/// Snapshot of a loaded group: graph, partition, and what produced it.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterSession {
    pub group_id: String,
    pub focal_user_id: String,
    pub cluster_count: usize,
    pub seed: u64,
    pub clusters: Vec<Cluster>,
    pub graph: RelationshipGraph,
    pub group: Group,
    /// The set that was clustered (focal user first when included).
    #[serde(skip)]
    pub members: Vec<UserEmbedding>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaterializeRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon_type: Option<String>,
    pub creator_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterializedGroup {
    pub group_id: String,
    pub added: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug)]
struct State {
    requested_count: usize,
    session: Option<ClusterSession>,
    labels: BTreeMap<usize, String>,
}

pub fn default_cluster_label(index: usize) -> String { format!("Subgroup {}", index + 1) }

fn non_blank(s: Option<&str>) -> Option<String> { s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string) }

/// Owns one group's clustering session for one viewing user.
///
/// Writes are last-write-wins. After [`teardown`](Self::teardown) every
/// in-flight `load` resolves to [`SessionError::Cancelled`] without touching
/// the stored state.
pub struct ClusterSessionController {
    config: SessionConfig,
    deps: Collaborators,
    algo: BalancedKMeans,
    state: RwLock<State>,
    torn_down: watch::Sender<bool>,
}

impl ClusterSessionController {
    pub fn new(config: SessionConfig, deps: Collaborators) -> Self {
        let requested_count = config.default_cluster_count.clamp(MIN_CLUSTERS, MAX_CLUSTERS);
        let (torn_down, _) = watch::channel(false);
        Self { config, deps, algo: BalancedKMeans::default(), state: RwLock::new(State { requested_count, session: None, labels: BTreeMap::new() }), torn_down }
    }

    pub fn is_torn_down(&self) -> bool { *self.torn_down.borrow() }

    /// Fetch group detail and embeddings, then lay out and cluster. Nothing is
    /// stored unless both fetches succeed.
    pub async fn load(&self, group_id: &str, focal_user_id: &str) -> Result<ClusterSession> {
        let span = tracing::info_span!("load", %group_id, %focal_user_id);
        async move {
            counter!("session_loads_total", 1);
            let mut cancelled = self.torn_down.subscribe();
            if *cancelled.borrow() { return Err(SessionError::Cancelled); }

            let fetch = async {
                tokio::try_join!(
                    async { self.deps.groups.group_detail(group_id).await.map_err(|e| SessionError::fetch("group detail", e)) },
                    async { self.deps.embeddings.group_embeddings(group_id, focal_user_id).await.map_err(|e| SessionError::fetch("embeddings", e)) },
                )
            };
            let (group, embeddings) = tokio::select! {
                fetched = fetch => fetched.map_err(|e| { counter!("session_load_failures_total", 1); warn!(error = %e, "load failed"); e })?,
                _ = async { let _ = cancelled.wait_for(|down| *down).await; } => { debug!("torn down mid-fetch"); return Err(SessionError::Cancelled); }
            };

            let members = if self.config.include_focal { embeddings.all_members() } else { embeddings.other_user_embeddings.clone() };
            let graph = build_relationship_graph(group_id, focal_user_id, &embeddings, &self.config);

            let mut state = self.state.write().await;
            if self.is_torn_down() { return Err(SessionError::Cancelled); }
            let cluster_count = clamp_cluster_count(state.requested_count, members.len());
            let clusters = self.run_clustering(group_id, &members, cluster_count);
            let session = ClusterSession { group_id: group_id.to_string(), focal_user_id: focal_user_id.to_string(), cluster_count, seed: seed_for_key(group_id), clusters, graph, group, members };
            info!(members = session.members.len(), cluster_count, "session loaded");
            state.session = Some(session.clone());
            Ok(session)
        }.instrument(span).await
    }

    fn run_clustering(&self, group_id: &str, members: &[UserEmbedding], k: usize) -> Vec<Cluster> {
        let started = Instant::now();
        let clusters = self.algo.cluster(group_id, members, k);
        counter!("cluster_runs_total", 1);
        histogram!("cluster_members", members.len() as f64);
        histogram!("cluster_run_seconds", started.elapsed().as_secs_f64());
        clusters
    }

    /// Re-cluster from scratch with `count` clamped to `[2, 6]` and to the
    /// member count. Returns the current partition; an unchanged count or an
    /// unloaded session leaves it as is.
    pub async fn set_cluster_count(&self, count: usize) -> Vec<Cluster> {
        let mut state = self.state.write().await;
        state.requested_count = count.clamp(MIN_CLUSTERS, MAX_CLUSTERS);
        let requested = state.requested_count;
        let Some(session) = state.session.as_mut() else { return Vec::new(); };
        let effective = clamp_cluster_count(requested, session.members.len());
        if effective == session.cluster_count { return session.clusters.clone(); }
        let span = tracing::info_span!("set_cluster_count", group_id = %session.group_id, from = session.cluster_count, to = effective);
        session.clusters = span.in_scope(|| self.run_clustering(&session.group_id, &session.members, effective));
        session.cluster_count = effective;
        session.clusters.clone()
    }

    pub async fn cluster_count(&self) -> usize {
        let state = self.state.read().await;
        state.session.as_ref().map(|s| s.cluster_count).unwrap_or(state.requested_count)
    }

    pub async fn snapshot(&self) -> Option<ClusterSession> { self.state.read().await.session.clone() }

    /// Custom display name for a cluster index; a blank name restores the default.
    pub async fn rename_cluster(&self, index: usize, name: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(session) = &state.session {
            if index >= session.clusters.len() { return Err(SessionError::ClusterOutOfRange { index, count: session.clusters.len() }); }
        }
        match non_blank(Some(name)) {
            Some(name) => { state.labels.insert(index, name); }
            None => { state.labels.remove(&index); }
        }
        Ok(())
    }

    pub async fn cluster_label(&self, index: usize) -> String {
        self.state.read().await.labels.get(&index).cloned().unwrap_or_else(|| default_cluster_label(index))
    }

    pub async fn cluster_labels(&self) -> Vec<String> {
        let state = self.state.read().await;
        let count = state.session.as_ref().map(|s| s.clusters.len()).unwrap_or(0);
        (0..count).map(|i| state.labels.get(&i).cloned().unwrap_or_else(|| default_cluster_label(i))).collect()
    }

    /// Create a new group from one cluster, then add its members best-effort.
    ///
    /// Succeeds as soon as the group exists; individual add failures are logged
    /// and listed in the result but never fail the call.
    pub async fn materialize_cluster_as_group(&self, index: usize, request: MaterializeRequest) -> Result<MaterializedGroup> {
        if request.name.trim().is_empty() { return Err(SessionError::InvalidName); }
        let (cluster, parent) = {
            let state = self.state.read().await;
            let session = state.session.as_ref().ok_or(SessionError::NotLoaded)?;
            let cluster = session.clusters.get(index).cloned().ok_or(SessionError::ClusterOutOfRange { index, count: session.clusters.len() })?;
            (cluster, session.group.clone())
        };
        let span = tracing::info_span!("materialize", parent_group = %parent.id, cluster = index);
        async move {
            counter!("materialize_total", 1);
            let new_group = NewGroup {
                name: request.name.clone(),
                creator_id: request.creator_id.clone(),
                description: non_blank(request.description.as_deref())
                    .or_else(|| non_blank(parent.description.as_deref()))
                    .or_else(|| Some(default_cluster_label(index))),
                icon_type: non_blank(request.icon_type.as_deref()).or_else(|| non_blank(parent.icon_type.as_deref())).unwrap_or_else(|| DEFAULT_GROUP_ICON.to_string()),
                tags: parent.tags.clone(),
                region: non_blank(parent.region.as_deref()),
                image_url: non_blank(parent.profile_image_url.as_deref()),
                is_public: parent.is_public,
            };
            let created = self.deps.groups.create_group(&new_group).await?;

            let mut seen = HashSet::new();
            let targets: Vec<&str> = cluster.member_ids()
                .filter(|id| !id.trim().is_empty() && *id != request.creator_id)
                .filter(|id| seen.insert(*id))
                .collect();
            let outcomes = join_all(targets.iter().map(|user_id| {
                let created_id = created.id.as_str();
                async move { (*user_id, self.deps.members.add_member(created_id, user_id).await) }
            })).await;

            let (mut added, mut failed) = (Vec::new(), Vec::new());
            for (user_id, outcome) in outcomes {
                match outcome {
                    Ok(()) => added.push(user_id.to_string()),
                    Err(e) => {
                        counter!("materialize_member_add_failures_total", 1);
                        warn!(group_id = %created.id, %user_id, error = %e, "member add failed, continuing");
                        failed.push(user_id.to_string());
                    }
                }
            }
            info!(group_id = %created.id, added = added.len(), failed = failed.len(), "cluster materialized");
            Ok(MaterializedGroup { group_id: created.id.clone(), added, failed })
        }.instrument(span).await
    }

    /// End the session: pending loads are abandoned and the partition dropped.
    pub async fn teardown(&self) {
        self.torn_down.send_replace(true);
        self.state.write().await.session = None;
    }
}
