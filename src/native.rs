//! Headless terminal client for native builds.
//!
//! Drives the same session as the browser build, but reads commands from a
//! line-based shell. The "widget" here is the shell itself: `draw` and
//! `erase` emit creation and deletion events through the live instance.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use clap::{Parser, Subcommand};
use serde_json::Value;

use crate::client::{Client, SurfaceLoader};
use crate::config::AppConfig;
use crate::constants::APP_TITLE;
use crate::gateway::{HttpGateway, SyncError};
use crate::message::Message;
use crate::model::{Annotation, AnnotationId, Image, ImageId, ProjectId};
use crate::session::Session;
use crate::state::{Selection, SurfaceState};
use crate::widget::{AnnotationWidget, WidgetError, WidgetFactory, WidgetSink};

/// Image "surfaces" are ready as soon as they are shown.
pub struct HeadlessLoader;

impl SurfaceLoader for HeadlessLoader {
    type Surface = Image;

    fn load(&mut self, image: &Image) -> Result<Image, String> {
        if image.url.trim().is_empty() {
            return Err(format!("image {} has no url", image.id));
        }
        Ok(image.clone())
    }
}

type LiveSink = Rc<RefCell<Option<WidgetSink>>>;

/// Creates shell-driven widgets and exposes the live one through a handle.
#[derive(Default)]
pub struct ConsoleWidgetFactory {
    live: LiveSink,
}

impl ConsoleWidgetFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that reaches whichever instance is live at the time of use.
    pub fn handle(&self) -> WidgetHandle {
        WidgetHandle {
            live: Rc::clone(&self.live),
        }
    }
}

/// A widget bound to an image in the terminal.
pub struct ConsoleWidget {
    image_id: ImageId,
    live: LiveSink,
}

impl AnnotationWidget for ConsoleWidget {
    fn destroy(&mut self) {
        log::debug!("Console widget for image {} destroyed", self.image_id);
        self.live.borrow_mut().take();
    }
}

impl WidgetFactory for ConsoleWidgetFactory {
    type Surface = Image;
    type Widget = ConsoleWidget;

    fn create(&mut self, surface: &Image, sink: WidgetSink) -> Result<ConsoleWidget, WidgetError> {
        *self.live.borrow_mut() = Some(sink);
        Ok(ConsoleWidget {
            image_id: surface.id,
            live: Rc::clone(&self.live),
        })
    }
}

/// User actions on the live console widget.
#[derive(Clone)]
pub struct WidgetHandle {
    live: LiveSink,
}

impl WidgetHandle {
    /// Report a drawn region. Returns `false` if no widget is bound.
    pub fn draw(&self, annotation: Annotation) -> bool {
        self.live
            .borrow()
            .as_ref()
            .is_some_and(|sink| sink.created(annotation))
    }

    /// Report a removed region. Returns `false` if no widget is bound.
    pub fn erase(&self, id: AnnotationId) -> bool {
        self.live
            .borrow()
            .as_ref()
            .is_some_and(|sink| sink.deleted(id))
    }
}

/// A shell command.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Return to the project list
    #[command(alias = "ls")]
    Projects,
    /// Open a project
    Open {
        /// Project id
        id: ProjectId,
    },
    /// Open an image of the current project
    Image {
        /// Image id
        id: ImageId,
    },
    /// Add a region to the open image
    Draw {
        /// Annotation id
        id: AnnotationId,
        /// Optional JSON object with the annotation body
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        payload: Vec<String>,
    },
    /// Remove a region from the open image
    Erase {
        /// Annotation id
        id: AnnotationId,
    },
    /// Show the current view
    Show,
    /// Save annotations of the open image
    Save,
    /// Go up one level
    Back,
    /// Reload the project list
    Reload,
    /// Exit the shell
    #[command(alias = "exit")]
    Quit,
}

/// One line of shell input.
#[derive(Debug, Parser)]
#[command(
    name = "labelweb",
    no_binary_name = true,
    disable_help_flag = true,
    disable_version_flag = true,
    help_template = "commands:\n{subcommands}"
)]
struct ShellLine {
    #[command(subcommand)]
    command: Command,
}

/// Parse one input line. `help` is reported as a [`clap::Error`] that
/// renders the command list.
pub fn parse_command(line: &str) -> Result<Command, clap::Error> {
    ShellLine::try_parse_from(line.split_whitespace()).map(|parsed| parsed.command)
}

/// Build the annotation for `draw <id> [json]`.
///
/// The payload words are rejoined and must form a JSON object; an `id` field
/// in it is ignored in favour of `id`.
pub fn draw_annotation(id: &str, payload: &[String]) -> Result<Annotation, String> {
    let mut annotation = Annotation::new(id);
    if payload.is_empty() {
        return Ok(annotation);
    }
    match serde_json::from_str::<Value>(&payload.join(" ")) {
        Ok(Value::Object(fields)) => annotation.data = fields,
        Ok(_) => return Err("payload must be a JSON object".to_string()),
        Err(e) => return Err(format!("invalid payload: {}", e)),
    }
    annotation.data.remove("id");
    Ok(annotation)
}

/// Describe the current view of a session.
pub fn render(session: &Session) -> String {
    let mut out = String::new();
    match session.selection() {
        Selection::NoneSelected => {
            let _ = writeln!(out, "Projects");
            if session.projects().is_empty() {
                let _ = writeln!(out, "  (none)");
            }
            for project in session.projects() {
                let _ = writeln!(out, "  [{}] {}", project.id, project.name);
            }
        }
        Selection::ProjectSelected { project_id } => {
            let _ = writeln!(out, "Images of project {}", project_id);
            if session.images().is_empty() {
                let _ = writeln!(out, "  (none)");
            }
            for image in session.images() {
                let _ = writeln!(out, "  [{}] {}", image.id, image.name);
            }
        }
        Selection::ImageSelected { image, surface, .. } => {
            let _ = writeln!(out, "Annotate Image: {} ({})", image.name, image.url);
            if *surface == SurfaceState::Loading {
                let _ = writeln!(out, "  loading...");
            }
            for annotation in session.buffer().as_slice() {
                let _ = writeln!(out, "  - {}", annotation.id);
            }
            let _ = writeln!(out, "  {} unsaved annotations", session.buffer().len());
        }
    }
    out
}

/// Run the interactive shell against the configured service.
pub fn run_shell(config: &AppConfig) -> Result<(), SyncError> {
    let gateway = HttpGateway::from_config(config)?;
    log::info!("Using persistence service at {}", gateway.base_url());

    let factory = ConsoleWidgetFactory::new();
    let widget = factory.handle();
    let mut client = Client::new(gateway, HeadlessLoader, factory);

    println!("{}", APP_TITLE);
    client.start();
    flush_notices(&mut client);
    print!("{}", render(client.session()));

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        if let Err(e) = io::stdout().flush() {
            log::warn!("Failed to flush stdout: {}", e);
        }
        let Some(Ok(line)) = lines.next() else {
            break;
        };

        if line.trim().is_empty() {
            continue;
        }
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e.to_string().trim_end());
                continue;
            }
        };

        match command {
            Command::Quit => break,
            Command::Show => {}
            Command::Projects => return_to_projects(&mut client),
            Command::Reload => client.dispatch(Message::LoadProjects),
            Command::Open { id } => client.dispatch(Message::SelectProject(id)),
            Command::Image { id } => {
                let image = client
                    .session()
                    .images()
                    .iter()
                    .find(|i| i.id == id)
                    .cloned();
                match image {
                    Some(image) => client.dispatch(Message::SelectImage(image)),
                    None => println!("no image {} in the current list", id),
                }
            }
            Command::Draw { id, payload } => match draw_annotation(&id, &payload) {
                Ok(annotation) => {
                    if widget.draw(annotation) {
                        client.pump();
                    } else {
                        println!("no image is open for annotation");
                    }
                }
                Err(e) => {
                    println!("{}", e);
                    continue;
                }
            },
            Command::Erase { id } => {
                if widget.erase(id) {
                    client.pump();
                } else {
                    println!("no image is open for annotation");
                }
            }
            Command::Save => client.dispatch(Message::Save),
            Command::Back => client.dispatch(Message::Back),
        }

        flush_notices(&mut client);
        print!("{}", render(client.session()));
    }

    Ok(())
}

/// Go back up to the project list from wherever the session is.
fn return_to_projects<G, L, F>(client: &mut Client<G, L, F>)
where
    G: crate::gateway::SyncGateway,
    L: SurfaceLoader,
    F: WidgetFactory<Surface = L::Surface>,
{
    while *client.session().selection() != Selection::NoneSelected {
        client.dispatch(Message::Back);
    }
}

fn flush_notices<G, L, F>(client: &mut Client<G, L, F>)
where
    G: crate::gateway::SyncGateway,
    L: SurfaceLoader,
    F: WidgetFactory<Surface = L::Surface>,
{
    for notice in client.take_notices() {
        println!("{}", notice);
    }
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;
    use serde_json::json;

    use super::*;
    use crate::widget::WidgetLifecycle;

    #[test]
    fn test_parse_navigation_commands() {
        assert_eq!(parse_command("open 3").unwrap(), Command::Open { id: 3 });
        assert_eq!(parse_command("  image 10 ").unwrap(), Command::Image { id: 10 });
        assert_eq!(parse_command("back").unwrap(), Command::Back);
        assert_eq!(parse_command("ls").unwrap(), Command::Projects);
        assert_eq!(parse_command("exit").unwrap(), Command::Quit);
        assert!(parse_command("open").is_err());
        assert!(parse_command("open x").is_err());
        assert!(parse_command("fly").is_err());
    }

    #[test]
    fn test_help_lists_commands() {
        let err = parse_command("help").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        let text = err.to_string();
        assert!(text.contains("draw"));
        assert!(text.contains("Return to the project list"));
    }

    #[test]
    fn test_parse_draw_with_payload() {
        let command = parse_command(r#"draw a1 {"id":"ignored", "target": "xywh=pixel:1,2,3,4"}"#);
        let Ok(Command::Draw { id, payload }) = command else {
            panic!("expected draw, got {:?}", command);
        };
        assert_eq!(id, "a1");
        let expected = Annotation::new("a1").with_field("target", json!("xywh=pixel:1,2,3,4"));
        assert_eq!(draw_annotation(&id, &payload), Ok(expected));

        assert_eq!(
            parse_command("draw a2").unwrap(),
            Command::Draw {
                id: "a2".to_string(),
                payload: Vec::new()
            }
        );
        assert_eq!(draw_annotation("a2", &[]), Ok(Annotation::new("a2")));
        assert!(draw_annotation("a3", &["[1,2]".to_string()]).is_err());
        assert!(parse_command("draw").is_err());
    }

    #[test]
    fn test_handle_reaches_only_live_widget() {
        let factory = ConsoleWidgetFactory::new();
        let handle = factory.handle();
        let mut lifecycle = WidgetLifecycle::new(factory);

        assert!(!handle.draw(Annotation::new("x")));

        lifecycle.bind(&Image::new(1, "img", "u")).unwrap();
        assert!(handle.draw(Annotation::new("a1")));
        assert!(handle.erase("a1".to_string()));
        assert_eq!(lifecycle.drain().len(), 2);

        lifecycle.unbind();
        assert!(!handle.draw(Annotation::new("a2")));
        assert!(lifecycle.drain().is_empty());
    }

    struct FixedGateway;

    impl crate::gateway::SyncGateway for FixedGateway {
        fn list_projects(&self) -> Result<Vec<crate::model::Project>, SyncError> {
            Ok(vec![crate::model::Project::new(1, "P1")])
        }

        fn list_images(&self, _project_id: ProjectId) -> Result<Vec<Image>, SyncError> {
            Ok(vec![Image::new(10, "img", "u")])
        }

        fn save_annotations(&self, _image_id: ImageId, _: &[Annotation]) -> Result<(), SyncError> {
            Ok(())
        }
    }

    #[test]
    fn test_projects_command_returns_to_project_list() {
        let factory = ConsoleWidgetFactory::new();
        let handle = factory.handle();
        let mut client = Client::new(FixedGateway, HeadlessLoader, factory);
        client.start();
        client.dispatch(Message::SelectProject(1));
        client.dispatch(Message::SelectImage(Image::new(10, "img", "u")));
        assert!(handle.draw(Annotation::new("a1")));

        return_to_projects(&mut client);
        assert_eq!(client.session().selection(), &Selection::NoneSelected);
        assert!(!client.widgets().is_bound());
        assert!(render(client.session()).contains("[1] P1"));

        // Already at the top: nothing to do.
        return_to_projects(&mut client);
        assert_eq!(client.session().selection(), &Selection::NoneSelected);
    }

    #[test]
    fn test_render_lists_projects() {
        let session = Session::new();
        assert!(render(&session).contains("(none)"));
    }

    #[test]
    fn test_loader_rejects_missing_url() {
        let mut loader = HeadlessLoader;
        assert!(loader.load(&Image::new(1, "img", " ")).is_err());
        assert!(loader.load(&Image::new(1, "img", "u")).is_ok());
    }
}
