//! In-memory collaborators for controller and registry tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tastemap_schema::{CreatedGroup, Group, GroupEmbeddings, NewGroup, UserEmbedding};

use crate::backend::{EmbeddingProvider, GroupService, MembershipService};
use crate::error::{Result, SessionError};

#[derive(Default)]
pub struct FakeBackend {
    members: Vec<UserEmbedding>,
    delay: Mutex<Duration>,
    fail_embeddings: AtomicBool,
    fail_detail: AtomicBool,
    fail_create: AtomicBool,
    failing_adds: Mutex<HashSet<String>>,
    created: Mutex<Vec<NewGroup>>,
    added: Mutex<Vec<(String, String)>>,
    next_id: AtomicUsize,
}

impl FakeBackend {
    /// `u0` is the focal user; everyone sits on a circle in the first two dims.
    pub fn with_members(n: usize) -> Self {
        let members = (0..n).map(|i| {
            let theta = i as f32 * 0.7;
            UserEmbedding::new(format!("u{i}"), format!("user-{i:02}"), vec![theta.cos(), theta.sin(), (i % 3) as f32 * 0.1])
        }).collect();
        Self { members, ..Self::default() }
    }

    pub fn set_delay(&self, d: Duration) { *self.delay.lock().unwrap() = d; }
    pub fn fail_embeddings(&self) { self.fail_embeddings.store(true, Ordering::SeqCst); }
    pub fn fail_detail(&self) { self.fail_detail.store(true, Ordering::SeqCst); }
    pub fn fail_create(&self) { self.fail_create.store(true, Ordering::SeqCst); }
    pub fn fail_add_for(&self, user_id: &str) { self.failing_adds.lock().unwrap().insert(user_id.to_string()); }
    pub fn created(&self) -> Vec<NewGroup> { self.created.lock().unwrap().clone() }
    pub fn added(&self) -> Vec<(String, String)> { self.added.lock().unwrap().clone() }

    async fn pause(&self) {
        let d = *self.delay.lock().unwrap();
        if !d.is_zero() { tokio::time::sleep(d).await; }
    }
}

fn unavailable(what: &str) -> SessionError { SessionError::Status { status: 503, url: format!("fake://{what}") } }

#[async_trait]
impl EmbeddingProvider for FakeBackend {
    async fn group_embeddings(&self, group_id: &str, focal_user_id: &str) -> Result<GroupEmbeddings> {
        self.pause().await;
        if self.fail_embeddings.load(Ordering::SeqCst) { return Err(unavailable("embeddings")); }
        let focal = self.members.iter().find(|m| m.user_id == focal_user_id).cloned().ok_or_else(|| unavailable("focal"))?;
        let others = self.members.iter().filter(|m| m.user_id != focal_user_id).cloned().collect();
        Ok(GroupEmbeddings { group_id: group_id.to_string(), current_user_id: focal_user_id.to_string(), current_user_embedding: focal, other_user_embeddings: others })
    }
}

#[async_trait]
impl GroupService for FakeBackend {
    async fn group_detail(&self, group_id: &str) -> Result<Group> {
        self.pause().await;
        if self.fail_detail.load(Ordering::SeqCst) { return Err(unavailable("detail")); }
        Ok(Group {
            id: group_id.to_string(), name: "Weekend hikers".into(), description: Some("  ".into()), icon_type: Some("mountain".into()),
            member_count: self.members.len() as u32, is_public: false, created_by_user_id: Some("u0".into()), profile_image_url: None,
            tags: vec!["hiking".into()], region: Some("Seoul".into()),
        })
    }

    async fn create_group(&self, group: &NewGroup) -> Result<CreatedGroup> {
        if self.fail_create.load(Ordering::SeqCst) { return Err(unavailable("create")); }
        self.created.lock().unwrap().push(group.clone());
        let id = format!("new-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        Ok(CreatedGroup { id, name: group.name.clone(), creator_id: group.creator_id.clone(), member_ids: vec![group.creator_id.clone()] })
    }
}

#[async_trait]
impl MembershipService for FakeBackend {
    async fn add_member(&self, group_id: &str, user_id: &str) -> Result<()> {
        if self.failing_adds.lock().unwrap().contains(user_id) { return Err(unavailable("members")); }
        self.added.lock().unwrap().push((group_id.to_string(), user_id.to_string()));
        Ok(())
    }
}
