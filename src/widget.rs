//! Lifecycle of the interactive annotation widget.
//!
//! At most one widget instance is live at a time. Each instance gets a
//! [`WidgetSink`] tied to its own subscription; events are queued with the
//! subscription id and only events from the live subscription are handed
//! out by [`WidgetLifecycle::drain`]. Unbinding closes the sink, so an
//! instance cannot deliver events after it has been destroyed.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use thiserror::Error;

use crate::model::{Annotation, AnnotationId};

/// Events the widget reports about user edits.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    /// The user drew a new region
    Created(Annotation),
    /// The user removed a region
    Deleted(AnnotationId),
}

/// Handle identifying one bound widget instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: u64,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Errors that can occur while binding a widget.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WidgetError {
    /// The image surface has not finished loading
    #[error("Image surface is not ready for annotation")]
    SurfaceNotReady,

    /// The widget could not be constructed
    #[error("Failed to create annotation widget: {0}")]
    Construction(String),
}

type EventQueue = Rc<RefCell<VecDeque<(u64, WidgetEvent)>>>;

/// Channel a widget instance uses to report events.
#[derive(Debug, Clone)]
pub struct WidgetSink {
    subscription: u64,
    queue: EventQueue,
    open: Rc<Cell<bool>>,
}

impl WidgetSink {
    /// Queue an event. Returns `false` if the instance has been destroyed.
    pub fn emit(&self, event: WidgetEvent) -> bool {
        if !self.open.get() {
            log::warn!(
                "Widget: dropped event from destroyed subscription {}",
                self.subscription
            );
            return false;
        }
        self.queue.borrow_mut().push_back((self.subscription, event));
        true
    }

    pub fn created(&self, annotation: Annotation) -> bool {
        self.emit(WidgetEvent::Created(annotation))
    }

    pub fn deleted(&self, id: impl Into<AnnotationId>) -> bool {
        self.emit(WidgetEvent::Deleted(id.into()))
    }

    /// Whether the owning instance is still live.
    pub fn is_open(&self) -> bool {
        self.open.get()
    }
}

/// A live widget instance.
pub trait AnnotationWidget {
    /// Tear down the instance and release its event handlers.
    fn destroy(&mut self);
}

/// Constructs widget instances on a surface.
pub trait WidgetFactory {
    /// What the widget attaches to (an image element in the browser).
    type Surface;
    /// The widget type produced.
    type Widget: AnnotationWidget;

    /// Whether `surface` has loaded and can host a widget.
    fn is_surface_ready(&self, _surface: &Self::Surface) -> bool {
        true
    }

    /// Create a widget attached to `surface` that reports through `sink`.
    fn create(
        &mut self,
        surface: &Self::Surface,
        sink: WidgetSink,
    ) -> Result<Self::Widget, WidgetError>;
}

struct Binding<W> {
    widget: W,
    subscription: Subscription,
    open: Rc<Cell<bool>>,
}

/// Owns zero or one live widget instance.
pub struct WidgetLifecycle<F: WidgetFactory> {
    factory: F,
    binding: Option<Binding<F::Widget>>,
    queue: EventQueue,
    next_subscription: u64,
}

impl<F: WidgetFactory> WidgetLifecycle<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            binding: None,
            queue: Rc::new(RefCell::new(VecDeque::new())),
            next_subscription: 0,
        }
    }

    /// Destroy any live instance, then attach a new one to `surface`.
    pub fn bind(&mut self, surface: &F::Surface) -> Result<Subscription, WidgetError> {
        self.unbind();

        if !self.factory.is_surface_ready(surface) {
            log::warn!("Widget: refusing to bind to a surface that has not loaded");
            return Err(WidgetError::SurfaceNotReady);
        }

        self.next_subscription += 1;
        let subscription = Subscription {
            id: self.next_subscription,
        };
        let open = Rc::new(Cell::new(true));
        let sink = WidgetSink {
            subscription: subscription.id,
            queue: Rc::clone(&self.queue),
            open: Rc::clone(&open),
        };

        let widget = self.factory.create(surface, sink).inspect_err(|_| {
            open.set(false);
        })?;

        log::debug!("Widget: bound subscription {}", subscription.id);
        self.binding = Some(Binding {
            widget,
            subscription,
            open,
        });
        Ok(subscription)
    }

    /// Destroy the live instance, if any.
    ///
    /// Returns the subscription that was invalidated.
    pub fn unbind(&mut self) -> Option<Subscription> {
        let mut binding = self.binding.take()?;
        binding.open.set(false);
        binding.widget.destroy();

        let id = binding.subscription.id;
        self.queue.borrow_mut().retain(|(sub, _)| *sub != id);
        log::debug!("Widget: destroyed subscription {}", id);
        Some(binding.subscription)
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Subscription of the live instance.
    pub fn subscription(&self) -> Option<Subscription> {
        self.binding.as_ref().map(|b| b.subscription)
    }

    /// Take queued events from the live instance, in emission order.
    pub fn drain(&mut self) -> Vec<WidgetEvent> {
        let live = self.subscription().map(|s| s.id);
        let queued: Vec<_> = self.queue.borrow_mut().drain(..).collect();
        queued
            .into_iter()
            .filter_map(|(sub, event)| {
                if Some(sub) == live {
                    Some(event)
                } else {
                    log::warn!("Widget: discarded event from subscription {}", sub);
                    None
                }
            })
            .collect()
    }
}

impl<F: WidgetFactory> Drop for WidgetLifecycle<F> {
    fn drop(&mut self) {
        self.unbind();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Factory that records construction and teardown order.
    #[derive(Default, Clone)]
    pub(crate) struct RecordingFactory {
        pub log: Rc<RefCell<Vec<String>>>,
        pub live: Rc<Cell<usize>>,
        pub max_live: Rc<Cell<usize>>,
        pub sinks: Rc<RefCell<Vec<WidgetSink>>>,
        pub fail: Rc<Cell<bool>>,
        pub not_ready: bool,
    }

    impl RecordingFactory {
        /// Sink of the most recently created instance.
        pub fn last_sink(&self) -> WidgetSink {
            self.sinks.borrow().last().cloned().unwrap()
        }
    }

    pub(crate) struct RecordingWidget {
        name: String,
        log: Rc<RefCell<Vec<String>>>,
        live: Rc<Cell<usize>>,
    }

    impl AnnotationWidget for RecordingWidget {
        fn destroy(&mut self) {
            self.live.set(self.live.get() - 1);
            self.log.borrow_mut().push(format!("destroy {}", self.name));
        }
    }

    impl WidgetFactory for RecordingFactory {
        type Surface = String;
        type Widget = RecordingWidget;

        fn is_surface_ready(&self, _surface: &String) -> bool {
            !self.not_ready
        }

        fn create(&mut self, surface: &String, sink: WidgetSink) -> Result<RecordingWidget, WidgetError> {
            if self.fail.get() {
                return Err(WidgetError::Construction("boom".to_string()));
            }
            self.live.set(self.live.get() + 1);
            self.max_live.set(self.max_live.get().max(self.live.get()));
            self.log.borrow_mut().push(format!("create {}", surface));
            self.sinks.borrow_mut().push(sink);
            Ok(RecordingWidget {
                name: surface.clone(),
                log: Rc::clone(&self.log),
                live: Rc::clone(&self.live),
            })
        }
    }

    #[test]
    fn test_rebind_tears_down_first() {
        let factory = RecordingFactory::default();
        let mut lifecycle = WidgetLifecycle::new(factory.clone());

        let first = lifecycle.bind(&"a".to_string()).unwrap();
        let second = lifecycle.bind(&"b".to_string()).unwrap();

        assert_ne!(first, second);
        assert_eq!(*factory.log.borrow(), ["create a", "destroy a", "create b"]);
        assert_eq!(factory.max_live.get(), 1);
        assert_eq!(lifecycle.subscription(), Some(second));
    }

    #[test]
    fn test_unbind_without_instance_is_noop() {
        let factory = RecordingFactory::default();
        let mut lifecycle = WidgetLifecycle::new(factory.clone());
        assert!(lifecycle.unbind().is_none());
        assert!(factory.log.borrow().is_empty());
    }

    #[test]
    fn test_events_flow_from_live_instance() {
        let factory = RecordingFactory::default();
        let mut lifecycle = WidgetLifecycle::new(factory.clone());
        lifecycle.bind(&"a".to_string()).unwrap();

        let sink = factory.last_sink();
        sink.created(Annotation::new("x"));
        sink.deleted("x");

        assert_eq!(
            lifecycle.drain(),
            vec![
                WidgetEvent::Created(Annotation::new("x")),
                WidgetEvent::Deleted("x".to_string())
            ]
        );
        assert!(lifecycle.drain().is_empty());
    }

    #[test]
    fn test_destroyed_instance_cannot_deliver() {
        let factory = RecordingFactory::default();
        let mut lifecycle = WidgetLifecycle::new(factory.clone());
        lifecycle.bind(&"a".to_string()).unwrap();
        let old_sink = factory.last_sink();

        // Queued but not yet drained when the instance is replaced.
        old_sink.created(Annotation::new("early"));
        lifecycle.bind(&"b".to_string()).unwrap();

        assert!(!old_sink.is_open());
        assert!(!old_sink.created(Annotation::new("late")));
        factory.last_sink().created(Annotation::new("fresh"));

        assert_eq!(
            lifecycle.drain(),
            vec![WidgetEvent::Created(Annotation::new("fresh"))]
        );
    }

    #[test]
    fn test_bind_rejects_unready_surface() {
        let factory = RecordingFactory {
            not_ready: true,
            ..Default::default()
        };
        let mut lifecycle = WidgetLifecycle::new(factory.clone());
        assert_eq!(
            lifecycle.bind(&"a".to_string()),
            Err(WidgetError::SurfaceNotReady)
        );
        assert!(!lifecycle.is_bound());
        assert!(factory.log.borrow().is_empty());
    }

    #[test]
    fn test_construction_failure_leaves_nothing_bound() {
        let factory = RecordingFactory::default();
        let mut lifecycle = WidgetLifecycle::new(factory.clone());
        lifecycle.bind(&"a".to_string()).unwrap();

        factory.fail.set(true);
        assert!(matches!(
            lifecycle.bind(&"b".to_string()),
            Err(WidgetError::Construction(_))
        ));
        assert!(!lifecycle.is_bound());
        assert_eq!(*factory.log.borrow(), ["create a", "destroy a"]);
    }

    #[test]
    fn test_drop_destroys_live_instance() {
        let factory = RecordingFactory::default();
        {
            let mut lifecycle = WidgetLifecycle::new(factory.clone());
            lifecycle.bind(&"a".to_string()).unwrap();
        }
        assert_eq!(factory.live.get(), 0);
    }
}
