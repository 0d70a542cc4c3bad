//! DOM rendering for the browser build.
//!
//! The root container holds three fixed sections. The list section is
//! re-rendered from the session after every update. The annotation section
//! owns the `<img>` the widget binds to and is only rebuilt when a different
//! image is shown, so re-renders never detach a bound widget.

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlImageElement};

use crate::constants::APP_TITLE;
use crate::message::Notice;
use crate::model::Image;
use crate::session::Session;
use crate::state::{Selection, SurfaceState};

/// Attribute naming the action of a clickable element.
pub const ACTION_ATTR: &str = "data-action";
/// Attribute carrying the id an action refers to.
pub const ID_ATTR: &str = "data-id";

/// Escape text for inclusion in HTML content or attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn button(action: &str, id: Option<u64>, label: &str) -> String {
    match id {
        Some(id) => format!(
            r#"<button {}="{}" {}="{}">{}</button>"#,
            ACTION_ATTR,
            action,
            ID_ATTR,
            id,
            escape(label)
        ),
        None => format!(
            r#"<button {}="{}">{}</button>"#,
            ACTION_ATTR,
            action,
            escape(label)
        ),
    }
}

/// HTML for the list section in the current state.
pub fn list_html(session: &Session) -> String {
    match session.selection() {
        Selection::NoneSelected => {
            let mut html = String::from("<h2>Projects</h2><ul>");
            for project in session.projects() {
                html.push_str("<li>");
                html.push_str(&button("project", Some(project.id), &project.name));
                if let Some(description) = &project.description {
                    html.push_str(&format!(" <span>{}</span>", escape(description)));
                }
                html.push_str("</li>");
            }
            html.push_str("</ul>");
            html
        }
        Selection::ProjectSelected { .. } => {
            let mut html = String::from("<h2>Images</h2>");
            html.push_str(&button("back", None, "Back to projects"));
            html.push_str("<ul>");
            for image in session.images() {
                html.push_str("<li>");
                html.push_str(&button("image", Some(image.id), &image.name));
                html.push_str("</li>");
            }
            html.push_str("</ul>");
            html
        }
        Selection::ImageSelected { .. } => String::new(),
    }
}

/// Handles to the rendered sections.
pub struct View {
    document: Document,
    list: Element,
    annotate: Element,
    status: Element,
    notice: Element,
}

impl View {
    /// Build the layout inside the element with id `root_id`, or in `<body>`
    /// if there is no such element.
    pub fn mount(document: Document, root_id: &str) -> Result<Self, JsValue> {
        let root = match document.get_element_by_id(root_id) {
            Some(root) => root,
            None => {
                let body = document
                    .body()
                    .ok_or_else(|| JsValue::from_str("Document has no body"))?;
                let root = document.create_element("div")?;
                root.set_id(root_id);
                body.append_child(&root)?;
                root
            }
        };
        root.set_inner_html(&format!("<h1>{}</h1>", escape(APP_TITLE)));

        let notice = document.create_element("div")?;
        notice.set_class_name("notice");
        let list = document.create_element("div")?;
        let annotate = document.create_element("div")?;
        let status = document.create_element("p")?;
        root.append_child(&notice)?;
        root.append_child(&list)?;
        root.append_child(&annotate)?;
        root.append_child(&status)?;

        Ok(Self {
            document,
            list,
            annotate,
            status,
            notice,
        })
    }

    /// Container that receives delegated click and load listeners.
    pub fn root(&self) -> Result<Element, JsValue> {
        self.list
            .parent_element()
            .ok_or_else(|| JsValue::from_str("View is not mounted"))
    }

    /// Refresh everything derived from the session.
    pub fn render(&self, session: &Session) {
        self.list.set_inner_html(&list_html(session));

        let status = match session.selection() {
            Selection::ImageSelected {
                surface: SurfaceState::Loading,
                ..
            } => "Loading image...".to_string(),
            Selection::ImageSelected { .. } => {
                format!("{} unsaved annotations", session.buffer().len())
            }
            _ => String::new(),
        };
        self.status.set_text_content(Some(&status));
    }

    /// Replace the annotation section with `image`, returning its element.
    pub fn show_image(&self, image: &Image) -> Result<HtmlImageElement, JsValue> {
        self.annotate.set_inner_html(&format!(
            "<h2>Annotate Image: {}</h2>{}{}<div></div>",
            escape(&image.name),
            button("back", None, "Back to images"),
            button("save", None, "Save Annotations"),
        ));

        let img: HtmlImageElement = self.document.create_element("img")?.dyn_into()?;
        img.set_alt(&image.name);
        img.set_src(&image.url);
        img.set_attribute(ID_ATTR, &image.id.to_string())?;
        self.annotate.append_child(&img)?;
        Ok(img)
    }

    /// Remove the annotation section's content.
    pub fn clear_image(&self) {
        self.annotate.set_inner_html("");
    }

    /// Show a notification. Errors stay visible until the next one.
    pub fn show_notice(&self, notice: &Notice) {
        self.notice.set_text_content(Some(&notice.text));
        self.notice
            .set_class_name(if notice.is_error() { "notice error" } else { "notice info" });
    }

    pub fn clear_notice(&self) {
        self.notice.set_text_content(None);
        self.notice.set_class_name("notice");
    }
}
