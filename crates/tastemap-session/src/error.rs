use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Upstream collaborator failed; `message` is shown to the user in place of the graph.
    #[error("failed to retrieve {what}: {message}")]
    Fetch { what: &'static str, message: String },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned status {status}")]
    Status { status: u16, url: String },
    #[error("no cluster session loaded")]
    NotLoaded,
    #[error("cluster {index} out of range (cluster count {count})")]
    ClusterOutOfRange { index: usize, count: usize },
    #[error("group name must not be blank")]
    InvalidName,
    #[error("session was torn down")]
    Cancelled,
}

impl SessionError {
    pub fn fetch(what: &'static str, cause: impl std::fmt::Display) -> Self { SessionError::Fetch { what, message: cause.to_string() } }
}

pub type Result<T> = std::result::Result<T, SessionError>;
