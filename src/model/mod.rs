//! Data models for the labelling client.

mod annotation;
mod project;

pub use annotation::{Annotation, AnnotationId};
pub use project::{Image, ImageId, Project, ProjectId};
