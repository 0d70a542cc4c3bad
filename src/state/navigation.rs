//! Three-level selection state: no selection, a project, or an image.
//!
//! Every transition bumps a generation counter. Asynchronous work is tagged
//! with a [`Ticket`] carrying the generation it was issued under, so results
//! that arrive after the user has moved on can be recognised and dropped.

use thiserror::Error;

use crate::gateway::SyncError;
use crate::model::{Image, ImageId, Project, ProjectId};

/// Monotonic counter of navigation transitions.
pub type Generation = u64;

/// Tag attached to in-flight work so its result can be matched to the state
/// that requested it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    generation: Generation,
    sequence: u64,
}

impl Ticket {
    /// Navigation generation the work was issued under.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Unique, increasing number of this ticket.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Load state of the image surface the widget attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    /// Image content is still loading; the widget must not be bound yet.
    Loading,
    /// Image content has loaded and a widget is bound to it.
    Ready,
}

/// Current selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// Nothing selected; the project list is shown.
    #[default]
    NoneSelected,
    /// A project is selected; its image list is shown.
    ProjectSelected {
        /// The selected project
        project_id: ProjectId,
    },
    /// An image is open for annotation.
    ImageSelected {
        /// Project the image belongs to
        project_id: ProjectId,
        /// The open image
        image: Image,
        /// Whether the image surface is ready for the widget
        surface: SurfaceState,
    },
}

impl Selection {
    /// Short state name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Selection::NoneSelected => "NoneSelected",
            Selection::ProjectSelected { .. } => "ProjectSelected",
            Selection::ImageSelected { .. } => "ImageSelected",
        }
    }

    /// The selected project, if any.
    pub fn project_id(&self) -> Option<ProjectId> {
        match self {
            Selection::NoneSelected => None,
            Selection::ProjectSelected { project_id }
            | Selection::ImageSelected { project_id, .. } => Some(*project_id),
        }
    }

    /// The open image, if any.
    pub fn image(&self) -> Option<&Image> {
        match self {
            Selection::ImageSelected { image, .. } => Some(image),
            _ => None,
        }
    }
}

/// Errors from navigation requests that are not valid in the current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    /// The requested transition does not start from the current state
    #[error("Cannot {action} while in {from}")]
    InvalidTransition {
        /// Requested action
        action: &'static str,
        /// State the request was made in
        from: &'static str,
    },

    /// A surface-ready signal did not match the open image
    #[error("Surface for image {image_id} is not the one being shown")]
    SurfaceMismatch {
        /// Image the signal referred to
        image_id: ImageId,
    },
}

/// Outcome of [`Navigation::back`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackOutcome {
    /// Closed an image and returned to the image list.
    LeftImage {
        /// The image that was closed
        image: Image,
        /// Whether a widget had been bound to it
        was_bound: bool,
    },
    /// Left a project and returned to the project list.
    LeftProject {
        /// The project that was left
        project_id: ProjectId,
    },
}

/// Selection state plus the lists it drives.
#[derive(Debug, Clone, Default)]
pub struct Navigation {
    selection: Selection,
    projects: Vec<Project>,
    images: Vec<Image>,
    generation: Generation,
    next_sequence: u64,
}

impl Navigation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Issue a ticket for work started under the current generation.
    pub fn issue_ticket(&mut self) -> Ticket {
        self.next_sequence += 1;
        Ticket {
            generation: self.generation,
            sequence: self.next_sequence,
        }
    }

    fn advance(&mut self, selection: Selection) {
        log::debug!(
            "Navigation: {} -> {} (generation {})",
            self.selection.name(),
            selection.name(),
            self.generation + 1
        );
        self.selection = selection;
        self.generation += 1;
    }

    fn invalid(&self, action: &'static str) -> NavigationError {
        NavigationError::InvalidTransition {
            action,
            from: self.selection.name(),
        }
    }

    /// Select a project from the project list.
    ///
    /// Returns the ticket for the image-list fetch the caller must issue.
    pub fn select_project(&mut self, project_id: ProjectId) -> Result<Ticket, NavigationError> {
        if !matches!(self.selection, Selection::NoneSelected) {
            return Err(self.invalid("select a project"));
        }
        self.advance(Selection::ProjectSelected { project_id });
        Ok(self.issue_ticket())
    }

    /// Open an image from the image list.
    ///
    /// The surface starts out loading. Returns the ticket the surface-ready
    /// signal must carry.
    pub fn select_image(&mut self, image: Image) -> Result<Ticket, NavigationError> {
        let Selection::ProjectSelected { project_id } = self.selection else {
            return Err(self.invalid("select an image"));
        };
        self.advance(Selection::ImageSelected {
            project_id,
            image,
            surface: SurfaceState::Loading,
        });
        Ok(self.issue_ticket())
    }

    /// Go up one level.
    pub fn back(&mut self) -> Result<BackOutcome, NavigationError> {
        match self.selection.clone() {
            Selection::NoneSelected => Err(self.invalid("go back")),
            Selection::ProjectSelected { project_id } => {
                self.advance(Selection::NoneSelected);
                self.images.clear();
                Ok(BackOutcome::LeftProject { project_id })
            }
            Selection::ImageSelected {
                project_id,
                image,
                surface,
            } => {
                self.advance(Selection::ProjectSelected { project_id });
                Ok(BackOutcome::LeftImage {
                    image,
                    was_bound: surface == SurfaceState::Ready,
                })
            }
        }
    }

    /// Record that the open image's surface finished loading.
    ///
    /// Returns the image to bind the widget to, or `None` if the surface was
    /// already marked ready for this visit. Signals for another image, or
    /// carrying a ticket from an earlier visit, are rejected.
    pub fn surface_ready(
        &mut self,
        image_id: ImageId,
        ticket: Ticket,
    ) -> Result<Option<Image>, NavigationError> {
        if ticket.generation != self.generation {
            return Err(NavigationError::SurfaceMismatch { image_id });
        }
        let from = self.selection.name();
        match &mut self.selection {
            Selection::ImageSelected { image, surface, .. } if image.id == image_id => {
                if *surface == SurfaceState::Ready {
                    return Ok(None);
                }
                *surface = SurfaceState::Ready;
                Ok(Some(image.clone()))
            }
            Selection::ImageSelected { .. } => Err(NavigationError::SurfaceMismatch { image_id }),
            _ => Err(NavigationError::InvalidTransition {
                action: "bind a surface",
                from,
            }),
        }
    }

    /// Whether a widget is currently bound to a ready surface.
    pub fn is_surface_ready(&self) -> bool {
        matches!(
            self.selection,
            Selection::ImageSelected {
                surface: SurfaceState::Ready,
                ..
            }
        )
    }

    /// Replace the project list.
    pub fn set_projects(&mut self, projects: Vec<Project>) {
        self.projects = projects;
    }

    /// Replace the image list with the answer to an image-list fetch.
    ///
    /// The result is only applied if it was issued under the current
    /// generation for the project that is still selected.
    pub fn set_images(
        &mut self,
        project_id: ProjectId,
        ticket: Ticket,
        images: Vec<Image>,
    ) -> Result<(), SyncError> {
        self.check_images_ticket(project_id, ticket)?;
        self.images = images;
        Ok(())
    }

    /// Check that an image-list response still matches the current state.
    pub fn check_images_ticket(
        &self,
        project_id: ProjectId,
        ticket: Ticket,
    ) -> Result<(), SyncError> {
        let current_project = match self.selection {
            Selection::ProjectSelected { project_id } => Some(project_id),
            _ => None,
        };
        if ticket.generation != self.generation || current_project != Some(project_id) {
            return Err(SyncError::StaleResponse {
                operation: "list images",
                issued: ticket.generation,
                current: self.generation,
            });
        }
        Ok(())
    }
}
