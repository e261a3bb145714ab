use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::config::SessionConfig;
use crate::controller::{ClusterSession, ClusterSessionController, Collaborators};
use crate::error::Result;

type SessionKey = (String, String);

/// Live sessions keyed by `(group_id, user_id)`.
pub struct SessionTable {
    config: SessionConfig,
    deps: Collaborators,
    inner: RwLock<HashMap<SessionKey, Arc<ClusterSessionController>>>,
}

impl SessionTable {
    pub fn new(config: SessionConfig, deps: Collaborators) -> Self { Self { config, deps, inner: RwLock::new(HashMap::new()) } }

    fn key(group_id: &str, user_id: &str) -> SessionKey { (group_id.to_string(), user_id.to_string()) }

    /// Existing controller for the pair, or a fresh one.
    pub async fn open(&self, group_id: &str, user_id: &str) -> Arc<ClusterSessionController> {
        let mut map = self.inner.write().await;
        map.entry(Self::key(group_id, user_id))
            .or_insert_with(|| Arc::new(ClusterSessionController::new(self.config.clone(), self.deps.clone())))
            .clone()
    }

    /// Open the pair's controller and load it. A controller left without a
    /// partition by a failed load is evicted; an earlier good session survives
    /// a failed reload.
    pub async fn load(&self, group_id: &str, user_id: &str) -> Result<(Arc<ClusterSessionController>, ClusterSession)> {
        let ctl = self.open(group_id, user_id).await;
        match ctl.load(group_id, user_id).await {
            Ok(session) => Ok((ctl, session)),
            Err(e) => {
                if ctl.snapshot().await.is_none() {
                    let mut map = self.inner.write().await;
                    let key = Self::key(group_id, user_id);
                    if map.get(&key).is_some_and(|current| Arc::ptr_eq(current, &ctl)) {
                        map.remove(&key);
                        debug!(%group_id, %user_id, "evicted session after failed load");
                    }
                }
                Err(e)
            }
        }
    }

    pub async fn get(&self, group_id: &str, user_id: &str) -> Option<Arc<ClusterSessionController>> {
        self.inner.read().await.get(&Self::key(group_id, user_id)).cloned()
    }

    /// Remove and tear down; returns whether a session existed.
    pub async fn close(&self, group_id: &str, user_id: &str) -> bool {
        let removed = self.inner.write().await.remove(&Self::key(group_id, user_id));
        match removed {
            Some(ctl) => { ctl.teardown().await; true }
            None => false,
        }
    }

    pub async fn len(&self) -> usize { self.inner.read().await.len() }

    pub async fn is_empty(&self) -> bool { self.inner.read().await.is_empty() }
}
