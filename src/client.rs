//! Synchronous driver that runs session effects.
//!
//! The client feeds messages into the [`Session`], executes the resulting
//! effects against a [`SyncGateway`], a [`SurfaceLoader`] and the widget
//! lifecycle, and loops until no follow-up messages remain. Responses are
//! delivered back to the session as messages, exactly as an asynchronous
//! driver would deliver them.

use std::collections::VecDeque;

use crate::gateway::SyncGateway;
use crate::message::{Effect, Message, Notice, NoticeLevel};
use crate::model::{Image, ImageId};
use crate::session::Session;
use crate::widget::{WidgetFactory, WidgetLifecycle};

/// Loads image content into something a widget can attach to.
pub trait SurfaceLoader {
    type Surface;

    /// Load `image`, returning its surface once it is ready for interaction.
    fn load(&mut self, image: &Image) -> Result<Self::Surface, String>;
}

/// Runs a [`Session`] against concrete collaborators.
pub struct Client<G, L, F>
where
    G: SyncGateway,
    L: SurfaceLoader,
    F: WidgetFactory<Surface = L::Surface>,
{
    session: Session,
    gateway: G,
    loader: L,
    widgets: WidgetLifecycle<F>,
    surface: Option<(ImageId, L::Surface)>,
    queue: VecDeque<Message>,
    notices: Vec<Notice>,
}

impl<G, L, F> Client<G, L, F>
where
    G: SyncGateway,
    L: SurfaceLoader,
    F: WidgetFactory<Surface = L::Surface>,
{
    pub fn new(gateway: G, loader: L, factory: F) -> Self {
        Self {
            session: Session::new(),
            gateway,
            loader,
            widgets: WidgetLifecycle::new(factory),
            surface: None,
            queue: VecDeque::new(),
            notices: Vec::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn widgets(&self) -> &WidgetLifecycle<F> {
        &self.widgets
    }

    /// Load the project list.
    pub fn start(&mut self) {
        self.dispatch(Message::LoadProjects);
    }

    /// Handle `message` and everything it triggers.
    pub fn dispatch(&mut self, message: Message) {
        self.queue.push_back(message);
        self.run();
    }

    /// Deliver pending widget events to the session.
    pub fn pump(&mut self) {
        self.run();
    }

    /// Take notifications produced since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn run(&mut self) {
        loop {
            self.queue
                .extend(self.widgets.drain().into_iter().map(Message::Widget));
            let Some(message) = self.queue.pop_front() else {
                break;
            };
            for effect in self.session.update(message) {
                self.execute(effect);
            }
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::FetchProjects { ticket } => {
                let result = self.gateway.list_projects();
                self.queue
                    .push_back(Message::ProjectsLoaded { ticket, result });
            }
            Effect::FetchImages { ticket, project_id } => {
                let result = self.gateway.list_images(project_id);
                self.queue.push_back(Message::ImagesLoaded {
                    ticket,
                    project_id,
                    result,
                });
            }
            Effect::ShowImage { ticket, image } => match self.loader.load(&image) {
                Ok(surface) => {
                    self.surface = Some((image.id, surface));
                    self.queue.push_back(Message::SurfaceReady {
                        image_id: image.id,
                        ticket,
                    });
                }
                Err(e) => {
                    log::error!("Failed to load image {}: {}", image.url, e);
                    self.notify(Notice::error(format!("Could not load image: {}", e)));
                }
            },
            Effect::BindWidget { image } => {
                let bound = match &self.surface {
                    Some((id, surface)) if *id == image.id => Some(self.widgets.bind(surface)),
                    _ => None,
                };
                match bound {
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        log::error!("{}", e);
                        self.notify(Notice::error(e.to_string()));
                    }
                    None => log::warn!("No loaded surface for image {}", image.id),
                }
            }
            Effect::UnbindWidget => {
                self.widgets.unbind();
                self.surface = None;
            }
            Effect::SaveAnnotations {
                ticket,
                image_id,
                annotations,
            } => {
                let result = self.gateway.save_annotations(image_id, &annotations);
                self.queue.push_back(Message::SaveFinished {
                    ticket,
                    image_id,
                    count: annotations.len(),
                    result,
                });
            }
            Effect::Notify(notice) => self.notify(notice),
        }
    }

    fn notify(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => log::info!("{}", notice),
            NoticeLevel::Error => log::warn!("{}", notice),
        }
        self.notices.push(notice);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::gateway::SyncError;
    use crate::model::{Annotation, Project, ProjectId};
    use crate::state::Selection;
    use crate::widget::tests::RecordingFactory;

    /// In-memory service with canned responses.
    #[derive(Default)]
    struct MockGateway {
        projects: Vec<Project>,
        images: Vec<(ProjectId, Image)>,
        fail_save: bool,
        saved: RefCell<Vec<(ImageId, Vec<Annotation>)>>,
    }

    impl SyncGateway for MockGateway {
        fn list_projects(&self) -> Result<Vec<Project>, SyncError> {
            Ok(self.projects.clone())
        }

        fn list_images(&self, project_id: ProjectId) -> Result<Vec<Image>, SyncError> {
            Ok(self
                .images
                .iter()
                .filter(|(p, _)| *p == project_id)
                .map(|(_, i)| i.clone())
                .collect())
        }

        fn save_annotations(
            &self,
            image_id: ImageId,
            annotations: &[Annotation],
        ) -> Result<(), SyncError> {
            if self.fail_save {
                return Err(SyncError::network("connection reset"));
            }
            self.saved
                .borrow_mut()
                .push((image_id, annotations.to_vec()));
            Ok(())
        }
    }

    /// Surfaces are just the image URL.
    struct UrlLoader;

    impl SurfaceLoader for UrlLoader {
        type Surface = String;

        fn load(&mut self, image: &Image) -> Result<String, String> {
            if image.url.is_empty() {
                return Err("empty url".to_string());
            }
            Ok(image.url.clone())
        }
    }

    fn gateway() -> MockGateway {
        MockGateway {
            projects: vec![Project::new(1, "P1")],
            images: vec![
                (1, Image::new(10, "img", "u")),
                (1, Image::new(11, "other", "v")),
            ],
            ..Default::default()
        }
    }

    fn client(
        gateway: MockGateway,
        factory: RecordingFactory,
    ) -> Client<MockGateway, UrlLoader, RecordingFactory> {
        let mut client = Client::new(gateway, UrlLoader, factory);
        client.start();
        client
    }

    #[test]
    fn test_end_to_end_annotate_and_save() {
        let factory = RecordingFactory::default();
        let mut client = client(gateway(), factory.clone());
        assert_eq!(client.session().projects(), &[Project::new(1, "P1")]);

        client.dispatch(Message::SelectProject(1));
        assert_eq!(client.session().images().len(), 2);

        client.dispatch(Message::SelectImage(Image::new(10, "img", "u")));
        assert!(client.widgets().is_bound());
        assert_eq!(*factory.log.borrow(), ["create u"]);

        factory.last_sink().created(Annotation::new("a1"));
        client.pump();
        assert_eq!(client.session().snapshot(), vec![Annotation::new("a1")]);

        client.dispatch(Message::Save);
        assert_eq!(
            *client.gateway().saved.borrow(),
            vec![(10, vec![Annotation::new("a1")])]
        );
        assert_eq!(client.session().snapshot(), vec![Annotation::new("a1")]);
        let notices = client.take_notices();
        assert_eq!(notices, vec![Notice::info("Annotations saved!")]);
    }

    #[test]
    fn test_switching_images_recreates_widget() {
        let factory = RecordingFactory::default();
        let mut client = client(gateway(), factory.clone());
        client.dispatch(Message::SelectProject(1));
        client.dispatch(Message::SelectImage(Image::new(10, "img", "u")));
        factory.last_sink().created(Annotation::new("a1"));
        client.pump();

        client.dispatch(Message::Back);
        assert!(!client.widgets().is_bound());
        client.dispatch(Message::SelectImage(Image::new(11, "other", "v")));

        assert_eq!(
            *factory.log.borrow(),
            ["create u", "destroy u", "create v"]
        );
        assert_eq!(factory.max_live.get(), 1);
        assert!(client.session().snapshot().is_empty());
    }

    #[test]
    fn test_failed_save_keeps_buffer_and_notifies() {
        let factory = RecordingFactory::default();
        let mut client = client(
            MockGateway {
                fail_save: true,
                ..gateway()
            },
            factory.clone(),
        );
        client.dispatch(Message::SelectProject(1));
        client.dispatch(Message::SelectImage(Image::new(10, "img", "u")));
        factory.last_sink().created(Annotation::new("a1"));
        client.pump();

        client.dispatch(Message::Save);
        let notices = client.take_notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].is_error());
        assert_eq!(client.session().snapshot(), vec![Annotation::new("a1")]);
    }

    #[test]
    fn test_image_load_failure_keeps_widget_unbound() {
        let factory = RecordingFactory::default();
        let mut client = client(gateway(), factory.clone());
        client.dispatch(Message::SelectProject(1));
        client.dispatch(Message::SelectImage(Image::new(12, "broken", "")));

        assert!(!client.widgets().is_bound());
        assert!(client.take_notices()[0].is_error());
        assert!(matches!(
            client.session().selection(),
            Selection::ImageSelected { .. }
        ));

        // Back out still works.
        client.dispatch(Message::Back);
        assert_eq!(
            client.session().selection(),
            &Selection::ProjectSelected { project_id: 1 }
        );
    }

    #[test]
    fn test_widget_construction_failure_is_reported() {
        let factory = RecordingFactory::default();
        factory.fail.set(true);
        let mut client = client(gateway(), factory);
        client.dispatch(Message::SelectProject(1));
        client.dispatch(Message::SelectImage(Image::new(10, "img", "u")));

        assert!(!client.widgets().is_bound());
        let notices = client.take_notices();
        assert!(notices[0].text.contains("Failed to create annotation widget"));
    }
}
