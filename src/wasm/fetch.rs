//! Browser transport for the persistence service using `fetch`.

use std::rc::Rc;

use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};
use web_time::Instant;

use crate::gateway::SyncError;
use crate::gateway::api::{self, Endpoint};
use crate::model::{Annotation, Image, ImageId, Project, ProjectId};

fn js_network(e: JsValue) -> SyncError {
    SyncError::Network(format!("{:?}", e))
}

/// Async gateway built on `window.fetch`. Cheap to clone into futures.
#[derive(Clone)]
pub struct FetchGateway {
    base_url: Rc<str>,
}

impl FetchGateway {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: Rc::from(base_url),
        }
    }

    async fn send(&self, endpoint: Endpoint, body: Option<String>) -> Result<(u16, String), SyncError> {
        let url = endpoint.url(&self.base_url);
        let start = Instant::now();

        let init = RequestInit::new();
        init.set_method(endpoint.method().as_str());
        init.set_mode(RequestMode::Cors);
        let has_body = body.is_some();
        if let Some(body) = body {
            init.set_body(&JsValue::from_str(&body));
        }

        let request = Request::new_with_str_and_init(&url, &init).map_err(js_network)?;
        if has_body {
            request
                .headers()
                .set("Content-Type", "application/json")
                .map_err(js_network)?;
        }

        let window =
            web_sys::window().ok_or_else(|| SyncError::Network("No window object".to_string()))?;
        let response: Response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(js_network)?
            .dyn_into()
            .map_err(js_network)?;

        let status = response.status();
        let text = JsFuture::from(response.text().map_err(js_network)?)
            .await
            .map_err(js_network)?
            .as_string()
            .unwrap_or_default();

        log::debug!(
            "{} {} -> {} in {:.1}ms",
            endpoint.method().as_str(),
            url,
            status,
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok((status, text))
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>, SyncError> {
        let (status, body) = self.send(Endpoint::ListProjects, None).await?;
        api::decode_projects(status, &body)
    }

    pub async fn list_images(&self, project_id: ProjectId) -> Result<Vec<Image>, SyncError> {
        let (status, body) = self.send(Endpoint::ListImages(project_id), None).await?;
        api::decode_images(status, &body)
    }

    pub async fn save_annotations(
        &self,
        image_id: ImageId,
        annotations: &[Annotation],
    ) -> Result<(), SyncError> {
        let payload = api::encode_save(image_id, annotations)?;
        let (status, body) = self.send(Endpoint::SaveAnnotations, Some(payload)).await?;
        api::decode_save(status, &body)
    }
}
