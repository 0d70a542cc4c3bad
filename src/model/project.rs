//! Projects and images as listed by the persistence service.

use serde::{Deserialize, Serialize};

/// Identifier of a project on the service.
pub type ProjectId = u64;

/// Identifier of an image on the service.
pub type ImageId = u64;

/// A project grouping a set of images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Service-assigned identifier
    pub id: ProjectId,
    /// Display name
    pub name: String,
    /// Optional free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Project {
    /// Create a project without a description.
    pub fn new(id: ProjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
        }
    }
}

/// An image belonging to the currently selected project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Service-assigned identifier
    pub id: ImageId,
    /// Display name
    pub name: String,
    /// Where the image content can be loaded from
    pub url: String,
}

impl Image {
    /// Create a new image record.
    pub fn new(id: ImageId, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            url: url.into(),
        }
    }
}
