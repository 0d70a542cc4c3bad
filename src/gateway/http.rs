//! Blocking HTTP transport for native builds.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use web_time::Instant;

use super::api::{self, Endpoint, Method};
use super::{SyncError, SyncGateway};
use crate::config::AppConfig;
use crate::model::{Annotation, Image, ImageId, Project, ProjectId};

/// [`SyncGateway`] backed by a blocking `reqwest` client.
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    /// Build a gateway for the service at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SyncError::network)?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Build a gateway from the application configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, SyncError> {
        Self::new(config.base_url.clone(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn send(&self, endpoint: Endpoint, body: Option<String>) -> Result<(u16, String), SyncError> {
        let url = endpoint.url(&self.base_url);
        let start = Instant::now();

        let request = match endpoint.method() {
            Method::Get => self.client.get(&url),
            Method::Post => self
                .client
                .post(&url)
                .header("Content-Type", "application/json")
                .body(body.unwrap_or_default()),
        };

        let response: Response = request.send().map_err(|e| {
            log::error!("{} {} failed: {}", endpoint.method().as_str(), url, e);
            SyncError::network(e)
        })?;
        let status = response.status().as_u16();
        let text = response.text().map_err(SyncError::network)?;

        log::debug!(
            "{} {} -> {} in {:.1}ms",
            endpoint.method().as_str(),
            url,
            status,
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok((status, text))
    }
}

impl SyncGateway for HttpGateway {
    fn list_projects(&self) -> Result<Vec<Project>, SyncError> {
        let (status, body) = self.send(Endpoint::ListProjects, None)?;
        api::decode_projects(status, &body)
    }

    fn list_images(&self, project_id: ProjectId) -> Result<Vec<Image>, SyncError> {
        let (status, body) = self.send(Endpoint::ListImages(project_id), None)?;
        api::decode_images(status, &body)
    }

    fn save_annotations(
        &self,
        image_id: ImageId,
        annotations: &[Annotation],
    ) -> Result<(), SyncError> {
        let payload = api::encode_save(image_id, annotations)?;
        let (status, body) = self.send(Endpoint::SaveAnnotations, Some(payload))?;
        api::decode_save(status, &body)
    }
}
