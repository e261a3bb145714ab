//! Session orchestration for the group taste map: fetches a group's member
//! embeddings, lays them out around the viewing user, clusters them into
//! balanced subgroups, and can turn a subgroup into a real group.

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod graph;
pub mod registry;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{EmbeddingProvider, GroupService, HttpBackend, MembershipService};
pub use config::{LayoutMode, ServerConfig, SessionConfig};
pub use controller::{ClusterSession, ClusterSessionController, Collaborators, MaterializeRequest, MaterializedGroup};
pub use error::{Result, SessionError};
pub use registry::SessionTable;
pub use view::SessionView;
