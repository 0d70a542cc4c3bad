//! The navigation/annotation state machine.
//!
//! [`Session::update`] consumes one [`Message`] at a time, mutates the
//! selection and annotation buffer, and returns the [`Effect`]s the driver
//! must run. It performs no I/O itself.

use crate::gateway::SyncError;
use crate::message::{Effect, Message, Notice};
use crate::model::{Annotation, Image, ImageId, Project, ProjectId};
use crate::state::{AnnotationBuffer, BackOutcome, Navigation, NavigationError, Selection, Ticket};
use crate::widget::WidgetEvent;


/// Selection, lists and unsaved annotations of one client session.
#[derive(Debug, Default)]
pub struct Session {
    navigation: Navigation,
    buffer: AnnotationBuffer,
    /// Most recent project-list request; older answers are discarded.
    projects_request: Option<Ticket>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn navigation(&self) -> &Navigation {
        &self.navigation
    }

    pub fn selection(&self) -> &Selection {
        self.navigation.selection()
    }

    pub fn projects(&self) -> &[Project] {
        self.navigation.projects()
    }

    pub fn images(&self) -> &[Image] {
        self.navigation.images()
    }

    pub fn buffer(&self) -> &AnnotationBuffer {
        &self.buffer
    }

    /// Current unsaved annotations, in insertion order.
    pub fn snapshot(&self) -> Vec<Annotation> {
        self.buffer.snapshot()
    }

    /// Handle one message and return the effects to run.
    ///
    /// Requests that are invalid in the current state are logged and ignored.
    pub fn update(&mut self, message: Message) -> Vec<Effect> {
        let result = match message {
            Message::LoadProjects => Ok(self.load_projects()),
            Message::SelectProject(project_id) => self.select_project(project_id),
            Message::SelectImage(image) => self.select_image(image),
            Message::Back => self.back(),
            Message::SurfaceReady { image_id, ticket } => self.surface_ready(image_id, ticket),
            Message::Widget(event) => Ok(self.widget_event(event)),
            Message::Save => self.save(),
            Message::ProjectsLoaded { ticket, result } => Ok(self.projects_loaded(ticket, result)),
            Message::ImagesLoaded {
                ticket,
                project_id,
                result,
            } => Ok(self.images_loaded(ticket, project_id, result)),
            Message::SaveFinished {
                ticket,
                image_id,
                count,
                result,
            } => Ok(self.save_finished(ticket, image_id, count, result)),
        };

        result.unwrap_or_else(|e| {
            log::warn!("Ignored request: {}", e);
            Vec::new()
        })
    }

    /// Start (or restart) loading the project list.
    pub fn load_projects(&mut self) -> Vec<Effect> {
        let ticket = self.navigation.issue_ticket();
        self.projects_request = Some(ticket);
        vec![Effect::FetchProjects { ticket }]
    }

    /// Open a project and request its images.
    pub fn select_project(&mut self, project_id: ProjectId) -> Result<Vec<Effect>, NavigationError> {
        let ticket = self.navigation.select_project(project_id)?;
        log::info!("Selected project {}", project_id);
        Ok(vec![Effect::FetchImages { ticket, project_id }])
    }

    /// Open an image. The widget is bound once its surface reports ready.
    pub fn select_image(&mut self, image: Image) -> Result<Vec<Effect>, NavigationError> {
        let ticket = self.navigation.select_image(image.clone())?;
        self.buffer.reset();
        log::info!("Selected image {} ({})", image.id, image.name);
        Ok(vec![Effect::ShowImage { ticket, image }])
    }

    /// Go up one level, dropping unsaved annotations when leaving an image.
    pub fn back(&mut self) -> Result<Vec<Effect>, NavigationError> {
        match self.navigation.back()? {
            BackOutcome::LeftImage { image, was_bound } => {
                if !self.buffer.is_empty() {
                    log::info!(
                        "Leaving image {} with {} unsaved annotations",
                        image.id,
                        self.buffer.len()
                    );
                }
                self.buffer.reset();
                log::debug!("Closed image {} (widget bound: {})", image.id, was_bound);
                Ok(vec![Effect::UnbindWidget])
            }
            BackOutcome::LeftProject { project_id } => {
                log::debug!("Closed project {}", project_id);
                Ok(Vec::new())
            }
        }
    }

    /// The image surface has loaded; bind a fresh widget to it.
    ///
    /// Repeated signals for a surface that is already bound change nothing.
    pub fn surface_ready(
        &mut self,
        image_id: ImageId,
        ticket: Ticket,
    ) -> Result<Vec<Effect>, NavigationError> {
        let Some(image) = self.navigation.surface_ready(image_id, ticket)? else {
            log::debug!("Surface for image {} already bound", image_id);
            return Ok(Vec::new());
        };
        self.buffer.reset();
        Ok(vec![Effect::BindWidget { image }])
    }

    /// Reconcile a widget event into the buffer.
    pub fn widget_event(&mut self, event: WidgetEvent) -> Vec<Effect> {
        if !self.navigation.is_surface_ready() {
            log::warn!("Dropped widget event with no bound image: {:?}", event);
            return Vec::new();
        }
        match event {
            WidgetEvent::Created(annotation) => self.buffer.on_widget_create(annotation),
            WidgetEvent::Deleted(id) => {
                if self.buffer.on_widget_delete(&id).is_none() {
                    log::debug!("Delete of unknown annotation {} ignored", id);
                }
            }
        }
        Vec::new()
    }

    /// Submit the current buffer for the open image.
    pub fn save(&mut self) -> Result<Vec<Effect>, NavigationError> {
        let Some(image_id) = self.navigation.selection().image().map(|i| i.id) else {
            return Err(NavigationError::InvalidTransition {
                action: "save annotations",
                from: self.navigation.selection().name(),
            });
        };
        let ticket = self.navigation.issue_ticket();
        let annotations = self.buffer.snapshot();
        log::info!(
            "Saving {} annotations for image {}",
            annotations.len(),
            image_id
        );
        Ok(vec![Effect::SaveAnnotations {
            ticket,
            image_id,
            annotations,
        }])
    }

    fn projects_loaded(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<Project>, SyncError>,
    ) -> Vec<Effect> {
        if self.projects_request != Some(ticket) {
            let err = SyncError::StaleResponse {
                operation: "list projects",
                issued: ticket.generation(),
                current: self.navigation.generation(),
            };
            log::warn!("{}", err);
            return Vec::new();
        }
        self.projects_request = None;

        match result {
            Ok(projects) => {
                log::info!("Loaded {} projects", projects.len());
                self.navigation.set_projects(projects);
                Vec::new()
            }
            Err(e) => {
                log::error!("Failed to load projects: {}", e);
                self.navigation.set_projects(Vec::new());
                vec![Effect::Notify(Notice::error(format!(
                    "Could not load projects: {}",
                    e
                )))]
            }
        }
    }

    fn images_loaded(
        &mut self,
        ticket: Ticket,
        project_id: ProjectId,
        result: Result<Vec<Image>, SyncError>,
    ) -> Vec<Effect> {
        let outcome = match result {
            Ok(images) => {
                let count = images.len();
                self.navigation
                    .set_images(project_id, ticket, images)
                    .map(|()| count)
            }
            Err(e) => self
                .navigation
                .check_images_ticket(project_id, ticket)
                .and(Err(e)),
        };

        match outcome {
            Ok(count) => {
                log::info!("Loaded {} images for project {}", count, project_id);
                Vec::new()
            }
            Err(e) if e.is_stale() => {
                log::warn!("{}", e);
                Vec::new()
            }
            Err(e) => {
                log::error!("Failed to load images for project {}: {}", project_id, e);
                vec![Effect::Notify(Notice::error(format!(
                    "Could not load images: {}",
                    e
                )))]
            }
        }
    }

    fn save_finished(
        &mut self,
        ticket: Ticket,
        image_id: ImageId,
        count: usize,
        result: Result<(), SyncError>,
    ) -> Vec<Effect> {
        if ticket.generation() != self.navigation.generation() {
            log::debug!(
                "Save for image {} finished after navigating away",
                image_id
            );
        }

        match result {
            Ok(()) => {
                log::info!("Saved {} annotations for image {}", count, image_id);
                vec![Effect::Notify(Notice::info("Annotations saved!"))]
            }
            Err(e) => {
                log::error!("Failed to save annotations for image {}: {}", image_id, e);
                vec![Effect::Notify(Notice::error(format!(
                    "Could not save annotations: {}. Your annotations are kept; save again to retry.",
                    e
                )))]
            }
        }
    }
}
