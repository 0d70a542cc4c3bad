//! Browser entry point and event loop.
//!
//! Messages from DOM events and finished requests are handled one at a time
//! on the JS event loop. Requests run as `spawn_local` futures and re-enter
//! through [`Runtime::dispatch`] when they complete.

mod annotorious;
mod fetch;
mod view;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Element, Event, HtmlImageElement};

use crate::config::AppConfig;
use crate::constants::ROOT_ELEMENT_ID;
use crate::logging;
use crate::message::{Effect, Message, Notice, NoticeLevel};
use crate::model::ImageId;
use crate::session::Session;
use crate::state::Ticket;
use crate::widget::WidgetLifecycle;

use annotorious::AnnotoriousFactory;
use fetch::FetchGateway;
use view::{ACTION_ATTR, ID_ATTR, View};

/// The image element currently shown, with the ticket it was shown under.
struct ShownImage {
    image_id: ImageId,
    ticket: Ticket,
    element: HtmlImageElement,
}

struct Runtime {
    session: RefCell<Session>,
    widgets: RefCell<WidgetLifecycle<AnnotoriousFactory>>,
    gateway: FetchGateway,
    view: View,
    shown: RefCell<Option<ShownImage>>,
}

impl Runtime {
    fn new(config: &AppConfig, view: View) -> Rc<Self> {
        Rc::new_cyclic(|weak: &Weak<Runtime>| {
            let weak = weak.clone();
            // Widget callbacks fire from Annotorious; drain on the next tick.
            let factory = AnnotoriousFactory::new(move || {
                if let Some(runtime) = weak.upgrade() {
                    wasm_bindgen_futures::spawn_local(async move { runtime.pump() });
                }
            });
            Runtime {
                session: RefCell::new(Session::new()),
                widgets: RefCell::new(WidgetLifecycle::new(factory)),
                gateway: FetchGateway::new(&config.base_url),
                view,
                shown: RefCell::new(None),
            }
        })
    }

    fn dispatch(self: &Rc<Self>, message: Message) {
        self.run(VecDeque::from([message]));
    }

    fn pump(self: &Rc<Self>) {
        self.run(VecDeque::new());
    }

    fn run(self: &Rc<Self>, mut queue: VecDeque<Message>) {
        loop {
            let events = self.widgets.borrow_mut().drain();
            queue.extend(events.into_iter().map(Message::Widget));
            let Some(message) = queue.pop_front() else {
                break;
            };
            let effects = self.session.borrow_mut().update(message);
            for effect in effects {
                self.execute(effect, &mut queue);
            }
        }
        self.view.render(&self.session.borrow());
    }

    fn execute(self: &Rc<Self>, effect: Effect, queue: &mut VecDeque<Message>) {
        match effect {
            Effect::FetchProjects { ticket } => {
                let runtime = Rc::clone(self);
                let gateway = self.gateway.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    let result = gateway.list_projects().await;
                    runtime.dispatch(Message::ProjectsLoaded { ticket, result });
                });
            }
            Effect::FetchImages { ticket, project_id } => {
                let runtime = Rc::clone(self);
                let gateway = self.gateway.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    let result = gateway.list_images(project_id).await;
                    runtime.dispatch(Message::ImagesLoaded {
                        ticket,
                        project_id,
                        result,
                    });
                });
            }
            Effect::ShowImage { ticket, image } => match self.view.show_image(&image) {
                Ok(element) => {
                    // Cached images may already be complete and never fire `load`.
                    if element.complete() && element.natural_width() > 0 {
                        queue.push_back(Message::SurfaceReady {
                            image_id: image.id,
                            ticket,
                        });
                    }
                    *self.shown.borrow_mut() = Some(ShownImage {
                        image_id: image.id,
                        ticket,
                        element,
                    });
                }
                Err(e) => {
                    log::error!("Failed to show image {}: {:?}", image.url, e);
                    self.notify(Notice::error("Could not show image"));
                }
            },
            Effect::BindWidget { image } => {
                let element = self
                    .shown
                    .borrow()
                    .as_ref()
                    .filter(|shown| shown.image_id == image.id)
                    .map(|shown| shown.element.clone());
                let Some(element) = element else {
                    log::warn!("No image element for image {}", image.id);
                    return;
                };
                let bound = self.widgets.borrow_mut().bind(&element);
                if let Err(e) = bound {
                    log::error!("{}", e);
                    self.notify(Notice::error(e.to_string()));
                }
            }
            Effect::UnbindWidget => {
                self.widgets.borrow_mut().unbind();
                self.shown.borrow_mut().take();
                self.view.clear_image();
            }
            Effect::SaveAnnotations {
                ticket,
                image_id,
                annotations,
            } => {
                let runtime = Rc::clone(self);
                let gateway = self.gateway.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    let result = gateway.save_annotations(image_id, &annotations).await;
                    runtime.dispatch(Message::SaveFinished {
                        ticket,
                        image_id,
                        count: annotations.len(),
                        result,
                    });
                });
            }
            Effect::Notify(notice) => self.notify(notice),
        }
    }

    fn notify(&self, notice: Notice) {
        self.view.show_notice(&notice);
        match notice.level {
            NoticeLevel::Info => {
                log::info!("{}", notice);
                let shown = web_sys::window()
                    .ok_or_else(|| JsValue::from_str("No window"))
                    .and_then(|window| window.alert_with_message(&notice.text));
                if let Err(e) = shown {
                    log::warn!("Failed to show alert: {:?}", e);
                }
            }
            NoticeLevel::Error => log::warn!("{}", notice),
        }
    }

    /// Map a click inside the root container to a message.
    fn on_click(self: &Rc<Self>, event: &Event) {
        let Some(target) = event.target().and_then(|t| t.dyn_into::<Element>().ok()) else {
            return;
        };
        let Ok(Some(element)) = target.closest(&format!("[{}]", ACTION_ATTR)) else {
            return;
        };
        let action = element.get_attribute(ACTION_ATTR).unwrap_or_default();
        let id = element
            .get_attribute(ID_ATTR)
            .and_then(|id| id.parse::<u64>().ok());

        let message = match (action.as_str(), id) {
            ("project", Some(project_id)) => Message::SelectProject(project_id),
            ("image", Some(image_id)) => {
                let image = self
                    .session
                    .borrow()
                    .images()
                    .iter()
                    .find(|image| image.id == image_id)
                    .cloned();
                match image {
                    Some(image) => Message::SelectImage(image),
                    None => return,
                }
            }
            ("back", _) => Message::Back,
            ("save", _) => Message::Save,
            _ => {
                log::debug!("Unhandled action '{}'", action);
                return;
            }
        };
        self.view.clear_notice();
        self.dispatch(message);
    }

    /// Handle `load` and `error` of the shown image element.
    fn on_image_event(self: &Rc<Self>, event: &Event) {
        let Some(target) = event
            .target()
            .and_then(|t| t.dyn_into::<HtmlImageElement>().ok())
        else {
            return;
        };
        let shown = self.shown.borrow().as_ref().and_then(|shown| {
            (shown.element == target).then_some((shown.image_id, shown.ticket))
        });
        let Some((image_id, ticket)) = shown else {
            return;
        };

        if event.type_() == "load" {
            self.dispatch(Message::SurfaceReady { image_id, ticket });
        } else {
            log::error!("Failed to load image {}", target.src());
            self.notify(Notice::error("Could not load image"));
        }
    }
}

fn mount() -> Result<(), JsValue> {
    let config = AppConfig::load_or_init();
    logging::init(config.log_level);
    log::info!("Starting with service at {}", config.base_url);

    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("No document"))?;
    let view = View::mount(document, ROOT_ELEMENT_ID)?;
    let root = view.root()?;
    let runtime = Runtime::new(&config, view);

    let on_click = {
        let runtime = Rc::clone(&runtime);
        Closure::wrap(Box::new(move |event: Event| runtime.on_click(&event)) as Box<dyn FnMut(Event)>)
    };
    root.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())?;
    on_click.forget();

    // `load` and `error` do not bubble, so listen in the capture phase.
    let on_image = {
        let runtime = Rc::clone(&runtime);
        Closure::wrap(
            Box::new(move |event: Event| runtime.on_image_event(&event)) as Box<dyn FnMut(Event)>
        )
    };
    for kind in ["load", "error"] {
        root.add_event_listener_with_callback_and_bool(
            kind,
            on_image.as_ref().unchecked_ref(),
            true,
        )?;
    }
    on_image.forget();

    runtime.dispatch(Message::LoadProjects);
    Ok(())
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    mount().inspect_err(|e| web_sys::console::error_1(e))
}
