//! Inputs to and outputs from the session state machine.
//!
//! All user actions, network responses and widget callbacks are represented
//! as [`Message`]s in the Elm architecture style. Handling a message returns
//! [`Effect`]s that the driver executes.

use crate::gateway::SyncError;
use crate::model::{Annotation, Image, ImageId, Project, ProjectId};
use crate::state::Ticket;
use crate::widget::WidgetEvent;

/// Messages that can be sent to update session state.
#[derive(Debug, Clone)]
pub enum Message {
    // Navigation
    /// (Re)load the project list
    LoadProjects,
    /// Open a project from the project list
    SelectProject(ProjectId),
    /// Open an image from the image list
    SelectImage(Image),
    /// Go up one level
    Back,

    // Annotation
    /// The shown image finished loading and can host the widget
    SurfaceReady {
        /// Image whose surface loaded
        image_id: ImageId,
        /// Ticket from the `ShowImage` effect
        ticket: Ticket,
    },
    /// Event forwarded from the live widget subscription
    Widget(WidgetEvent),
    /// Persist the current annotations
    Save,

    // Responses
    /// Answer to `FetchProjects`
    ProjectsLoaded {
        ticket: Ticket,
        result: Result<Vec<Project>, SyncError>,
    },
    /// Answer to `FetchImages`
    ImagesLoaded {
        ticket: Ticket,
        project_id: ProjectId,
        result: Result<Vec<Image>, SyncError>,
    },
    /// Answer to `SaveAnnotations`
    SaveFinished {
        ticket: Ticket,
        image_id: ImageId,
        count: usize,
        result: Result<(), SyncError>,
    },
}

/// Side effects requested by the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Request the project list
    FetchProjects { ticket: Ticket },
    /// Request the image list of a project
    FetchImages { ticket: Ticket, project_id: ProjectId },
    /// Display an image and report `SurfaceReady` once it has loaded
    ShowImage { ticket: Ticket, image: Image },
    /// Tear down any live widget and attach a new one to the image surface
    BindWidget { image: Image },
    /// Tear down the live widget
    UnbindWidget,
    /// Submit an annotation snapshot
    SaveAnnotations {
        ticket: Ticket,
        image_id: ImageId,
        annotations: Vec<Annotation>,
    },
    /// Show a notification to the user
    Notify(Notice),
}

/// Severity of a user-visible notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A user-visible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.level {
            NoticeLevel::Info => write!(f, "{}", self.text),
            NoticeLevel::Error => write!(f, "Error: {}", self.text),
        }
    }
}
