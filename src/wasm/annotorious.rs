//! Binding to the Annotorious image annotation widget.
//!
//! Expects the Annotorious UMD bundle to be loaded, exposing the global
//! `Annotorious.init`.

// Imported JS bindings expand to unsafe glue.
#![allow(unsafe_code)]

use std::rc::Rc;

use js_sys::{Function, Object, Reflect};
use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::HtmlImageElement;

use crate::model::Annotation;
use crate::widget::{AnnotationWidget, WidgetError, WidgetFactory, WidgetSink};

#[wasm_bindgen]
extern "C" {
    /// A live Annotorious instance.
    type AnnotoriousInstance;

    #[wasm_bindgen(js_namespace = Annotorious, js_name = init, catch)]
    fn init(config: &JsValue) -> Result<AnnotoriousInstance, JsValue>;

    #[wasm_bindgen(method)]
    fn on(this: &AnnotoriousInstance, event: &str, handler: &Function);

    #[wasm_bindgen(method)]
    fn destroy(this: &AnnotoriousInstance);
}

/// Convert a W3C annotation object from the widget into our model.
fn to_annotation(value: &JsValue) -> Option<Annotation> {
    let json = js_sys::JSON::stringify(value).ok()?.as_string()?;
    let parsed: Value = serde_json::from_str(&json).ok()?;
    Annotation::from_value(parsed)
}

/// Creates Annotorious instances on `<img>` elements.
pub struct AnnotoriousFactory {
    /// Called after each forwarded event so the driver can drain the queue.
    on_event: Rc<dyn Fn()>,
}

impl AnnotoriousFactory {
    pub fn new(on_event: impl Fn() + 'static) -> Self {
        Self {
            on_event: Rc::new(on_event),
        }
    }
}

/// A bound Annotorious instance and its event handlers.
pub struct AnnotoriousWidget {
    instance: AnnotoriousInstance,
    _on_create: Closure<dyn FnMut(JsValue)>,
    _on_delete: Closure<dyn FnMut(JsValue)>,
}

impl AnnotationWidget for AnnotoriousWidget {
    fn destroy(&mut self) {
        self.instance.destroy();
    }
}

impl WidgetFactory for AnnotoriousFactory {
    type Surface = HtmlImageElement;
    type Widget = AnnotoriousWidget;

    fn is_surface_ready(&self, surface: &HtmlImageElement) -> bool {
        surface.complete() && surface.natural_width() > 0
    }

    fn create(
        &mut self,
        surface: &HtmlImageElement,
        sink: WidgetSink,
    ) -> Result<AnnotoriousWidget, WidgetError> {
        let config = Object::new();
        Reflect::set(&config, &"image".into(), surface)
            .map_err(|e| WidgetError::Construction(format!("{:?}", e)))?;
        let instance =
            init(&config).map_err(|e| WidgetError::Construction(format!("{:?}", e)))?;

        let create_sink = sink.clone();
        let create_notify = Rc::clone(&self.on_event);
        let on_create = Closure::wrap(Box::new(move |value: JsValue| {
            match to_annotation(&value) {
                Some(annotation) => {
                    if create_sink.created(annotation) {
                        create_notify();
                    }
                }
                None => log::warn!("Ignored createAnnotation without a string id"),
            }
        }) as Box<dyn FnMut(JsValue)>);

        let delete_notify = Rc::clone(&self.on_event);
        let on_delete = Closure::wrap(Box::new(move |value: JsValue| {
            let id = Reflect::get(&value, &"id".into())
                .ok()
                .and_then(|id| id.as_string());
            match id {
                Some(id) => {
                    if sink.deleted(id) {
                        delete_notify();
                    }
                }
                None => log::warn!("Ignored deleteAnnotation without a string id"),
            }
        }) as Box<dyn FnMut(JsValue)>);

        instance.on("createAnnotation", on_create.as_ref().unchecked_ref());
        instance.on("deleteAnnotation", on_delete.as_ref().unchecked_ref());

        Ok(AnnotoriousWidget {
            instance,
            _on_create: on_create,
            _on_delete: on_delete,
        })
    }
}
