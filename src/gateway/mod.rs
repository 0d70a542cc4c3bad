//! Access to the remote persistence service.
//!
//! The [`api`] module holds the request/response contract shared by every
//! transport. [`SyncGateway`] is the synchronous interface the native client
//! drives; the browser build talks to the same endpoints through `fetch`.

pub mod api;
#[cfg(not(target_arch = "wasm32"))]
mod http;

#[cfg(not(target_arch = "wasm32"))]
pub use http::HttpGateway;

use thiserror::Error;

use crate::model::{Annotation, Image, ImageId, Project, ProjectId};
use crate::state::Generation;

/// Errors that can occur while talking to the persistence service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The service could not be reached or the request timed out
    #[error("Network error: {0}")]
    Network(String),

    /// The service answered with a non-success status
    #[error("Server returned {status}: {message}")]
    Remote {
        /// HTTP status code
        status: u16,
        /// Message extracted from the response body
        message: String,
    },

    /// The response arrived after navigation made it irrelevant
    #[error(
        "Discarded stale response to '{operation}' (issued at generation {issued}, now {current})"
    )]
    StaleResponse {
        /// Operation the response answers
        operation: &'static str,
        /// Generation the request was issued under
        issued: Generation,
        /// Generation at the time the response arrived
        current: Generation,
    },

    /// A success response whose body could not be parsed
    #[error("Malformed response: {0}")]
    Decode(String),
}

impl SyncError {
    /// Create a network error from any displayable cause.
    pub fn network(cause: impl std::fmt::Display) -> Self {
        Self::Network(cause.to_string())
    }

    /// Create a remote error.
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    /// Whether this error means the response was simply discarded.
    pub fn is_stale(&self) -> bool {
        matches!(self, SyncError::StaleResponse { .. })
    }
}

/// Blocking interface to the persistence service.
pub trait SyncGateway {
    /// Fetch all projects.
    fn list_projects(&self) -> Result<Vec<Project>, SyncError>;

    /// Fetch the images of one project.
    fn list_images(&self, project_id: ProjectId) -> Result<Vec<Image>, SyncError>;

    /// Persist the full annotation set of one image in a single request.
    fn save_annotations(
        &self,
        image_id: ImageId,
        annotations: &[Annotation],
    ) -> Result<(), SyncError>;
}
